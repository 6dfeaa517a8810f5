// Authentication: JWT codec, refresh token store, token rotation and accounts

pub mod account;
pub mod jwt;
pub mod token_store;
pub mod tokens;

pub use account::{AccountService, SignupRequest};
pub use jwt::JwtService;
pub use token_store::{InMemoryRefreshTokenStore, RedisRefreshTokenStore, RefreshTokenStore};
pub use tokens::{TokenPair, TokenService};
