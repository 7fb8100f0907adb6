use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    /// Absent means no response caching and an in-process rate limiter.
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub ai_cache_ttl_secs: u64,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub ai_request_timeout_secs: u64,
    pub places_api_key: Option<String>,
    pub places_api_base: String,
}

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PLACES_API_BASE: &str = "https://maps.googleapis.com/maps/api/place";

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration = optional("JWT_EXPIRATION")
            .and_then(|v| v.trim_end_matches('h').parse::<u64>().ok())
            .unwrap_or(24);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: optional("REDIS_URL"),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parsed("SERVER_PORT").unwrap_or(3000),
            api_base_uri: optional("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            rate_limit_window_secs: parsed("RATE_LIMIT_WINDOW").unwrap_or(3600),
            rate_limit_requests: parsed("RATE_LIMIT_REQUESTS").unwrap_or(50),
            ai_cache_ttl_secs: parsed("AI_CACHE_TTL").unwrap_or(3600),
            google_api_key: optional("GOOGLE_API_KEY"),
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| "gemini-pro".into()),
            gemini_api_base: optional("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.into()),
            ai_request_timeout_secs: parsed("AI_REQUEST_TIMEOUT").unwrap_or(60),
            places_api_key: optional("GOOGLE_PLACES_API_KEY"),
            places_api_base: optional("GOOGLE_PLACES_API_BASE")
                .unwrap_or_else(|| DEFAULT_PLACES_API_BASE.into()),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn ai_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.ai_cache_ttl_secs)
    }

    pub fn ai_request_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_request_timeout_secs)
    }
}

// Empty values count as unset so `.env` templates can leave keys blank.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    optional(key).and_then(|v| v.trim().parse().ok())
}
