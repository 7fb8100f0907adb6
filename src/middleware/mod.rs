mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{auth_middleware, revoked_token_key};
pub use error_handler::log_errors;
pub use rate_limit::{client_ip, rate_limit};
