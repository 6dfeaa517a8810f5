use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use common::auth::{AccountService, TokenService};
use common::config::Settings;
use common::db::repositories::{
    AlbumRepository, CalendarRepository, CoupleRepository, DatePlaceRepository,
    InquiryRepository, UserRepository,
};
use common::db::DbPool;
use common::storage::UploadService;
use common::tour::TourApiClient;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub tokens: TokenService,
    pub accounts: AccountService,
    pub uploads: UploadService,
    pub tour: TourApiClient,
    pub metrics: PrometheusHandle,
    pub config: Arc<Settings>,
}

impl AppState {
    pub fn new(
        db_pool: DbPool,
        tokens: TokenService,
        uploads: UploadService,
        tour: TourApiClient,
        metrics: PrometheusHandle,
        config: Settings,
    ) -> Self {
        let accounts = AccountService::new(UserRepository::new(db_pool.clone()), tokens.clone());
        Self {
            db_pool,
            tokens,
            accounts,
            uploads,
            tour,
            metrics,
            config: Arc::new(config),
        }
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db_pool.clone())
    }

    pub fn couples(&self) -> CoupleRepository {
        CoupleRepository::new(self.db_pool.clone())
    }

    pub fn albums(&self) -> AlbumRepository {
        AlbumRepository::new(self.db_pool.clone())
    }

    pub fn calendar(&self) -> CalendarRepository {
        CalendarRepository::new(self.db_pool.clone())
    }

    pub fn inquiries(&self) -> InquiryRepository {
        InquiryRepository::new(self.db_pool.clone())
    }

    pub fn date_places(&self) -> DatePlaceRepository {
        DatePlaceRepository::new(self.db_pool.clone())
    }
}
