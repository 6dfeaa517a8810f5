// Wire types of the tourism open-data API and their conversion into domain models
//
// The API is loose about types: ids arrive as strings or numbers, coordinates
// as strings, and an empty result set is the empty string instead of an object.

use crate::errors::TourApiError;
use crate::models::{DatePlace, DatePlaceDetail};
use serde::{Deserialize, Deserializer};

pub const SUCCESS_CODE: &str = "0000";

/// Accept `"12"`, `12` or `null`, yielding a string
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0))
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: Response<T>,
}

#[derive(Debug, Deserialize)]
pub struct Response<T> {
    pub header: Header,
    pub body: Option<Body<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    #[serde(rename = "resultCode", deserialize_with = "lenient_string", default)]
    pub result_code: Option<String>,
    #[serde(rename = "resultMsg", default)]
    pub result_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Body<T> {
    #[serde(default = "Items::empty")]
    pub items: Items<T>,
    #[serde(rename = "numOfRows", deserialize_with = "lenient_u64", default)]
    pub num_of_rows: u64,
    #[serde(rename = "pageNo", deserialize_with = "lenient_u64", default)]
    pub page_no: u64,
    #[serde(rename = "totalCount", deserialize_with = "lenient_u64", default)]
    pub total_count: u64,
}

/// `items` is `{"item": [...]}`, `{"item": {...}}` or `""`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Items<T> {
    Present { item: OneOrMany<T> },
    Empty(String),
}

impl<T> Items<T> {
    fn empty() -> Self {
        Items::Empty(String::new())
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Items::Present { item } => item.into_vec(),
            Items::Empty(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Error body some gateways return instead of the envelope
#[derive(Debug, Deserialize)]
pub struct FlatError {
    #[serde(rename = "resultCode", deserialize_with = "lenient_string", default)]
    pub result_code: Option<String>,
    #[serde(rename = "resultMsg", default)]
    pub result_msg: Option<String>,
}

/// One content item as returned by list, search and detail operations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlace {
    #[serde(rename = "contentid", deserialize_with = "lenient_string", default)]
    pub content_id: Option<String>,
    #[serde(rename = "contenttypeid", deserialize_with = "lenient_string", default)]
    pub content_type_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub addr1: Option<String>,
    #[serde(default)]
    pub addr2: Option<String>,
    #[serde(rename = "areacode", deserialize_with = "lenient_string", default)]
    pub area_code: Option<String>,
    #[serde(rename = "sigungucode", deserialize_with = "lenient_string", default)]
    pub sigungu_code: Option<String>,
    #[serde(deserialize_with = "lenient_string", default)]
    pub mapx: Option<String>,
    #[serde(deserialize_with = "lenient_string", default)]
    pub mapy: Option<String>,
    #[serde(default)]
    pub firstimage: Option<String>,
    #[serde(default)]
    pub tel: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn coordinate(value: Option<String>) -> Option<f64> {
    non_empty(value)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl RawPlace {
    /// Convert into a domain place; items without id or title are unusable
    pub fn into_place(self) -> Result<DatePlace, TourApiError> {
        Ok(self.split()?.0)
    }

    pub fn into_detail(self) -> Result<DatePlaceDetail, TourApiError> {
        let (place, homepage, overview) = self.split()?;
        Ok(DatePlaceDetail {
            place,
            homepage,
            overview,
        })
    }

    fn split(self) -> Result<(DatePlace, Option<String>, Option<String>), TourApiError> {
        let content_id = non_empty(self.content_id)
            .ok_or_else(|| TourApiError::InvalidResponse("item without contentid".to_string()))?;
        let title = non_empty(self.title)
            .ok_or_else(|| TourApiError::InvalidResponse("item without title".to_string()))?;

        let address = match (non_empty(self.addr1), non_empty(self.addr2)) {
            (Some(a1), Some(a2)) => Some(format!("{} {}", a1, a2)),
            (a1, a2) => a1.or(a2),
        };

        let place = DatePlace {
            content_id,
            content_type_id: non_empty(self.content_type_id).unwrap_or_default(),
            title,
            address,
            area_code: non_empty(self.area_code),
            sigungu_code: non_empty(self.sigungu_code),
            map_x: coordinate(self.mapx),
            map_y: coordinate(self.mapy),
            image_url: non_empty(self.firstimage),
            tel: non_empty(self.tel),
        };
        Ok((place, non_empty(self.homepage), non_empty(self.overview)))
    }
}

/// Items and total count of one response page
#[derive(Debug)]
pub struct ParsedPage<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

/// Decode a response body, checking the result code
pub fn parse_envelope<T>(body: &str) -> Result<ParsedPage<T>, TourApiError>
where
    T: for<'de> Deserialize<'de>,
{
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(parse_error) => {
            if let Ok(flat) = serde_json::from_str::<FlatError>(body) {
                if let Some(code) = flat.result_code {
                    return Err(TourApiError::Service {
                        code,
                        message: flat.result_msg.unwrap_or_default(),
                    });
                }
            }
            return Err(TourApiError::InvalidResponse(format!(
                "Unexpected response body: {}",
                parse_error
            )));
        }
    };

    let header = envelope.response.header;
    let code = header.result_code.unwrap_or_default();
    if code != SUCCESS_CODE {
        return Err(TourApiError::Service {
            code,
            message: header.result_msg.unwrap_or_default(),
        });
    }

    match envelope.response.body {
        Some(body) => Ok(ParsedPage {
            items: body.items.into_vec(),
            total_count: body.total_count,
        }),
        None => Ok(ParsedPage {
            items: Vec::new(),
            total_count: 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(items: serde_json::Value, total: serde_json::Value) -> String {
        json!({
            "response": {
                "header": {"resultCode": "0000", "resultMsg": "OK"},
                "body": {"items": items, "numOfRows": 10, "pageNo": 1, "totalCount": total}
            }
        })
        .to_string()
    }

    fn item(id: &str) -> serde_json::Value {
        json!({
            "contentid": id,
            "contenttypeid": "12",
            "title": "Namsan Tower",
            "addr1": "105 Namsangongwon-gil",
            "addr2": "",
            "areacode": "1",
            "sigungucode": "24",
            "mapx": "126.9882",
            "mapy": "37.5512",
            "firstimage": "",
            "tel": "02-3455-9277"
        })
    }

    #[test]
    fn test_list_of_items() {
        let body = envelope(json!({"item": [item("1"), item("2")]}), json!(2));
        let page = parse_envelope::<RawPlace>(&body).expect("parse");
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn test_single_item_object() {
        let body = envelope(json!({"item": item("7")}), json!("1"));
        let page = parse_envelope::<RawPlace>(&body).expect("parse");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].content_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_empty_string_items() {
        let body = envelope(json!(""), json!(0));
        let page = parse_envelope::<RawPlace>(&body).expect("parse");
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_service_error_code() {
        let body = json!({
            "response": {"header": {"resultCode": "22", "resultMsg": "LIMITED_NUMBER_OF_SERVICE_REQUESTS_EXCEEDS_ERROR"}}
        })
        .to_string();
        match parse_envelope::<RawPlace>(&body) {
            Err(TourApiError::Service { code, message }) => {
                assert_eq!(code, "22");
                assert!(message.contains("EXCEEDS"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_flat_error_body() {
        let body = json!({"resultCode": "10", "resultMsg": "INVALID_REQUEST_PARAMETER_ERROR"}).to_string();
        assert!(matches!(
            parse_envelope::<RawPlace>(&body),
            Err(TourApiError::Service { .. })
        ));
    }

    #[test]
    fn test_xml_body_is_invalid_response() {
        let body = "<OpenAPI_ServiceResponse><cmmMsgHeader/></OpenAPI_ServiceResponse>";
        assert!(matches!(
            parse_envelope::<RawPlace>(body),
            Err(TourApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_into_place_is_lenient() {
        let raw: RawPlace = serde_json::from_value(json!({
            "contentid": 126508,
            "contenttypeid": 12,
            "title": " Gyeongbokgung ",
            "addr1": "161 Sajik-ro",
            "addr2": "(Sejongno)",
            "mapx": "126.97",
            "mapy": "",
            "firstimage": "http://img/1.jpg"
        }))
        .expect("deserialize");

        let place = raw.into_place().expect("convert");
        assert_eq!(place.content_id, "126508");
        assert_eq!(place.content_type_id, "12");
        assert_eq!(place.title, "Gyeongbokgung");
        assert_eq!(place.address.as_deref(), Some("161 Sajik-ro (Sejongno)"));
        assert_eq!(place.map_x, Some(126.97));
        assert_eq!(place.map_y, None);
        assert_eq!(place.image_url.as_deref(), Some("http://img/1.jpg"));
        assert_eq!(place.tel, None);
    }

    #[test]
    fn test_item_without_id_is_rejected() {
        let raw = RawPlace {
            title: Some("x".to_string()),
            ..RawPlace::default()
        };
        assert!(raw.into_place().is_err());
    }
}
