// HTTP client for the Korea Tourism Organization open-data API (KorService1)

use super::models::{parse_envelope, ParsedPage, RawPlace};
use crate::config::TourApiConfig;
use crate::errors::TourApiError;
use crate::models::{DatePlace, DatePlaceDetail};
use crate::pagination::{PageQuery, Paginated};
use crate::retry::{retry_async, ExponentialBackoff};
use crate::telemetry;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Filters for the area based listing
#[derive(Debug, Clone, Default)]
pub struct AreaFilter {
    pub area_code: Option<String>,
    pub sigungu_code: Option<String>,
    pub content_type_id: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    AreaBasedList,
    SearchKeyword,
    DetailCommon,
}

impl Operation {
    fn path(&self) -> &'static str {
        match self {
            Operation::AreaBasedList => "areaBasedList1",
            Operation::SearchKeyword => "searchKeyword1",
            Operation::DetailCommon => "detailCommon1",
        }
    }

    fn metric_name(&self) -> &'static str {
        match self {
            Operation::AreaBasedList => "area_based_list",
            Operation::SearchKeyword => "search_keyword",
            Operation::DetailCommon => "detail_common",
        }
    }
}

#[derive(Clone)]
pub struct TourApiClient {
    client: Client,
    base_url: String,
    service_key: String,
    mobile_os: String,
    mobile_app: String,
    backoff: ExponentialBackoff,
}

impl TourApiClient {
    pub fn new(config: &TourApiConfig) -> Result<Self, TourApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                TourApiError::RequestFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            mobile_os: config.mobile_os.clone(),
            mobile_app: config.mobile_app.clone(),
            backoff: ExponentialBackoff::new(config.max_retries),
        })
    }

    /// Replace the retry schedule (tests use millisecond delays)
    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Places in an area, optionally narrowed by district and content type
    #[instrument(skip(self))]
    pub async fn area_based_list(
        &self,
        filter: &AreaFilter,
        page: &PageQuery,
    ) -> Result<Paginated<DatePlace>, TourApiError> {
        let mut params = Vec::new();
        push_opt(&mut params, "areaCode", &filter.area_code);
        push_opt(&mut params, "sigunguCode", &filter.sigungu_code);
        push_opt(&mut params, "contentTypeId", &filter.content_type_id);
        params.push(("arrange", "Q".to_string()));

        let parsed = self
            .fetch::<RawPlace>(Operation::AreaBasedList, params, Some(page))
            .await?;
        to_page(parsed, page)
    }

    #[instrument(skip(self))]
    pub async fn search_keyword(
        &self,
        keyword: &str,
        filter: &AreaFilter,
        page: &PageQuery,
    ) -> Result<Paginated<DatePlace>, TourApiError> {
        let mut params = vec![("keyword", keyword.to_string())];
        push_opt(&mut params, "areaCode", &filter.area_code);
        push_opt(&mut params, "sigunguCode", &filter.sigungu_code);
        push_opt(&mut params, "contentTypeId", &filter.content_type_id);
        params.push(("arrange", "Q".to_string()));

        let parsed = self
            .fetch::<RawPlace>(Operation::SearchKeyword, params, Some(page))
            .await?;
        to_page(parsed, page)
    }

    /// Common detail of one content item; no item means `NotFound`
    #[instrument(skip(self))]
    pub async fn detail(&self, content_id: &str) -> Result<DatePlaceDetail, TourApiError> {
        let params = vec![
            ("contentId", content_id.to_string()),
            ("defaultYN", "Y".to_string()),
            ("firstImageYN", "Y".to_string()),
            ("areacodeYN", "Y".to_string()),
            ("addrinfoYN", "Y".to_string()),
            ("mapinfoYN", "Y".to_string()),
            ("overviewYN", "Y".to_string()),
        ];

        let parsed = self
            .fetch::<RawPlace>(Operation::DetailCommon, params, None)
            .await?;
        parsed
            .items
            .into_iter()
            .next()
            .ok_or_else(|| TourApiError::NotFound(content_id.to_string()))?
            .into_detail()
    }

    async fn fetch<T>(
        &self,
        operation: Operation,
        params: Vec<(&'static str, String)>,
        page: Option<&PageQuery>,
    ) -> Result<ParsedPage<T>, TourApiError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, operation.path());

        let mut query: Vec<(&str, String)> = vec![
            ("serviceKey", self.service_key.clone()),
            ("MobileOS", self.mobile_os.clone()),
            ("MobileApp", self.mobile_app.clone()),
            ("_type", "json".to_string()),
        ];
        if let Some(page) = page {
            query.push(("numOfRows", page.count().to_string()));
            query.push(("pageNo", page.page().to_string()));
        }
        query.extend(params);

        let result = retry_async(&self.backoff, TourApiError::is_transient, || {
            self.send_once(&url, &query)
        })
        .await
        .and_then(|body| parse_envelope::<T>(&body));

        match &result {
            Ok(parsed) => {
                telemetry::record_tour_api_request(operation.metric_name(), "success");
                debug!(operation = operation.path(), items = parsed.items.len(), "Tour API request succeeded");
            }
            Err(e) => {
                telemetry::record_tour_api_request(operation.metric_name(), "error");
                warn!(operation = operation.path(), error = %e, "Tour API request failed");
            }
        }
        result
    }

    async fn send_once(&self, url: &str, query: &[(&str, String)]) -> Result<String, TourApiError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| TourApiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TourApiError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(TourApiError::UpstreamStatus {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }
        Ok(body)
    }
}

fn push_opt(params: &mut Vec<(&'static str, String)>, name: &'static str, value: &Option<String>) {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        params.push((name, value.to_string()));
    }
}

fn to_page(
    parsed: ParsedPage<RawPlace>,
    page: &PageQuery,
) -> Result<Paginated<DatePlace>, TourApiError> {
    let mut places = Vec::with_capacity(parsed.items.len());
    for raw in parsed.items {
        match raw.into_place() {
            Ok(place) => places.push(place),
            Err(e) => warn!(error = %e, "Skipping malformed Tour API item"),
        }
    }
    Ok(Paginated::new(places, parsed.total_count, page))
}
