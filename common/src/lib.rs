// Shared library for the Twogether API: domain models, persistence, storage and auth

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pagination;
pub mod retry;
pub mod storage;
pub mod telemetry;
pub mod tour;
pub mod validation;
