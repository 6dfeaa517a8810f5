use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// User Models
// ============================================================================

/// UserRole decides access to the admin endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s)
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nickname: String,
    pub birthday: Option<NaiveDate>,
    /// Object key of the profile image
    pub profile_image: Option<String>,
    pub invite_code: String,
    pub cup_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Token kind carried in the `typ` claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// UserClaims represents JWT token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,     // Subject (user ID)
    pub email: String,
    pub role: UserRole,
    pub typ: TokenType,
    pub jti: String,     // Token ID, the refresh token store key
    pub exp: i64,        // Expiration time (Unix timestamp)
    pub iat: i64,        // Issued at (Unix timestamp)
}

impl UserClaims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

// ============================================================================
// Couple Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Couple {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    /// The day the couple started dating
    pub start_date: NaiveDate,
    pub thumbnail: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Couple {
    /// Days together, counting the start date as day one
    pub fn days_together(&self, today: NaiveDate) -> i64 {
        (today - self.start_date).num_days() + 1
    }
}

// ============================================================================
// Album Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Album {
    pub id: Uuid,
    pub cup_id: Uuid,
    pub title: String,
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlbumPhoto {
    pub id: Uuid,
    pub album_id: Uuid,
    pub object_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// Ordering for album listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlbumSort {
    #[default]
    Newest,
    Oldest,
    Title,
}

impl AlbumSort {
    /// ORDER BY clause; never built from user input directly
    pub fn order_by(&self) -> &'static str {
        match self {
            AlbumSort::Newest => "created_at DESC, id DESC",
            AlbumSort::Oldest => "created_at ASC, id ASC",
            AlbumSort::Title => "title ASC, created_at DESC, id ASC",
        }
    }
}

// ============================================================================
// Calendar Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub cup_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Inquiry Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Inquiry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub contents: String,
    pub answered: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InquiryImage {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub object_key: String,
    pub created_at: DateTime<Utc>,
}

/// An admin's answer to an inquiry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Solution {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub admin_id: Uuid,
    pub contents: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Date Place Models
// ============================================================================

/// A place from the tourism open-data API, also stored as a snapshot when liked
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DatePlace {
    pub content_id: String,
    pub content_type_id: String,
    pub title: String,
    pub address: Option<String>,
    pub area_code: Option<String>,
    pub sigungu_code: Option<String>,
    pub map_x: Option<f64>,
    pub map_y: Option<f64>,
    pub image_url: Option<String>,
    pub tel: Option<String>,
}

/// Detail view of a place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatePlaceDetail {
    #[serde(flatten)]
    pub place: DatePlace,
    pub homepage: Option<String>,
    pub overview: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn couple(start: NaiveDate) -> Couple {
        Couple {
            id: Uuid::new_v4(),
            user1_id: Uuid::new_v4(),
            user2_id: Uuid::new_v4(),
            start_date: start,
            thumbnail: None,
            deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_role_round_trip_text() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!(UserRole::User.to_string(), "user");
        assert!(UserRole::try_from("root".to_string()).is_err());
    }

    #[test]
    fn test_days_together_counts_first_day() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        let c = couple(start);
        assert_eq!(c.days_together(start), 1);
        let hundredth = NaiveDate::from_ymd_opt(2024, 4, 9).expect("valid date");
        assert_eq!(c.days_together(hundredth), 100);
    }

    #[test]
    fn test_album_sort_deserialize() {
        let sort: AlbumSort = serde_json::from_str("\"title\"").expect("valid sort");
        assert_eq!(sort, AlbumSort::Title);
        assert_eq!(AlbumSort::default().order_by(), "created_at DESC, id DESC");
    }

    #[test]
    fn test_every_album_sort_ends_with_id_tiebreaker() {
        for sort in [AlbumSort::Newest, AlbumSort::Oldest, AlbumSort::Title] {
            let order = sort.order_by();
            assert!(
                order.ends_with("id DESC") || order.ends_with("id ASC"),
                "{:?} has no stable order: {}",
                sort,
                order
            );
        }
        assert_eq!(AlbumSort::Title.order_by(), "title ASC, created_at DESC, id ASC");
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            nickname: "a".to_string(),
            birthday: None,
            profile_image: None,
            invite_code: "ABCD2345".to_string(),
            cup_id: None,
            role: UserRole::User,
            deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).expect("serializable");
        assert!(!json.contains("secret"));
    }
}
