// Extractors whose rejections render through AppError

use axum::extract::{FromRequest, FromRequestParts};
use common::errors::AppError;

/// `axum::Json` with a 400 `{"message"}` body for malformed or mistyped input
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);
