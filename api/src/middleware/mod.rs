mod auth;
mod rbac;

pub use auth::{auth_middleware, CurrentUser};
pub use rbac::{admin_guard, couple_guard, CoupleContext};
