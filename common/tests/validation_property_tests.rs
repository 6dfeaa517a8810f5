// Property-based tests for input validation and pagination

use chrono::NaiveDate;
use common::errors::{AppError, ValidationError};
use common::pagination::{PageQuery, Paginated, MAX_PAGE_SIZE};
use common::validation::{
    generate_invite_code, normalize_email, normalize_invite_code, optional_text, required_text,
    validate_date_range, validate_password, INVITE_CODE_LENGTH, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
use proptest::prelude::*;

// Normalized emails are lowercase, trimmed and stable under re-normalization
#[test]
fn property_email_normalization_is_idempotent() {
    proptest!(|(
        local in "[A-Za-z0-9._]{1,16}",
        domain in "[A-Za-z]{2,12}",
        tld in "[A-Za-z]{2,4}",
        padding in " {0,3}",
    )| {
        let raw = format!("{}{}@{}.{}{}", padding, local, domain, tld, padding);
        let normalized = normalize_email(&raw).unwrap();

        prop_assert_eq!(&normalized, &normalized.to_lowercase());
        prop_assert_eq!(normalized.trim(), normalized.as_str());
        prop_assert_eq!(normalize_email(&normalized).unwrap(), normalized);
    });
}

#[test]
fn property_email_without_at_is_rejected() {
    proptest!(|(raw in "[A-Za-z0-9.]{1,30}")| {
        prop_assert!(normalize_email(&raw).is_err());
    });
}

// Password length bounds are inclusive
#[test]
fn property_password_length_bounds() {
    proptest!(|(len in 0usize..100)| {
        let password = "p".repeat(len);
        let accepted = validate_password(&password).is_ok();
        prop_assert_eq!(
            accepted,
            (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len)
        );
    });
}

// Generated invite codes always pass validation, in any letter case
#[test]
fn property_generated_invite_codes_round_trip() {
    proptest!(|(lowercase in any::<bool>())| {
        let code = generate_invite_code();
        prop_assert_eq!(code.len(), INVITE_CODE_LENGTH);

        let presented = if lowercase { code.to_lowercase() } else { code.clone() };
        prop_assert_eq!(normalize_invite_code(&presented).unwrap(), code);
    });
}

#[test]
fn property_ambiguous_characters_never_valid() {
    proptest!(|(prefix in "[A-HJ-NP-Z2-9]{7}", bad in "[01IO]")| {
        let code = format!("{}{}", prefix, bad);
        prop_assert!(normalize_invite_code(&code).is_err());
    });
}

// Required text is trimmed, and over-long input maps to 400
#[test]
fn property_required_text_limits() {
    proptest!(|(body in "[가-힣a-z ]{0,30}", max in 1usize..20)| {
        match required_text("title", &body, max) {
            Ok(text) => {
                prop_assert_eq!(text.as_str(), body.trim());
                prop_assert!(!text.is_empty());
                prop_assert!(text.chars().count() <= max);
            }
            Err(err) => {
                let trimmed = body.trim();
                prop_assert!(trimmed.is_empty() || trimmed.chars().count() > max);
                prop_assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
            }
        }
    });
}

#[test]
fn property_blank_optional_text_is_unset() {
    proptest!(|(blank in " {0,10}")| {
        prop_assert_eq!(optional_text("description", Some(&blank), 5).unwrap(), None);
    });
}

#[test]
fn property_date_range_ordering() {
    proptest!(|(start_offset in 0i64..3650, end_offset in 0i64..3650)| {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let start = base + chrono::Duration::days(start_offset);
        let end = base + chrono::Duration::days(end_offset);

        let result = validate_date_range(start, end);
        prop_assert_eq!(result.is_ok(), start <= end);
        if let Err(e) = result {
            prop_assert!(matches!(e, ValidationError::InvalidFieldValue { .. }), "unexpected error variant: {:?}", e);
        }
    });
}

// Page and count are always clamped into range, and offset follows from them
#[test]
fn property_page_query_clamping() {
    proptest!(|(page in proptest::option::of(0u32..10_000), count in proptest::option::of(0u32..10_000))| {
        let query = PageQuery { page, count };

        prop_assert!(query.page() >= 1);
        prop_assert!((1..=MAX_PAGE_SIZE).contains(&query.count()));
        prop_assert_eq!(query.limit(), query.count() as i64);
        prop_assert_eq!(query.offset(), (query.page() as i64 - 1) * query.limit());
    });
}

// Pages cover the whole result set with no page left empty except the last
#[test]
fn property_total_pages_covers_total() {
    proptest!(|(total in 0u64..100_000, count in 1u32..=MAX_PAGE_SIZE)| {
        let query = PageQuery::new(1, count);
        let page: Paginated<u8> = Paginated::new(Vec::new(), total, &query);

        prop_assert!(page.total_pages * count as u64 >= total);
        if page.total_pages > 0 {
            prop_assert!((page.total_pages - 1) * (count as u64) < total);
        } else {
            prop_assert_eq!(total, 0);
        }
    });
}
