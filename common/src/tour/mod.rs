// Tourism open-data API: date place listings, keyword search and details

pub mod client;
pub mod models;

pub use client::{AreaFilter, TourApiClient};
