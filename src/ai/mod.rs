//! Generative-AI provider access and prompt construction.

mod gemini;
mod prompt;

use async_trait::async_trait;

pub use gemini::GeminiClient;
pub use prompt::{
    ItineraryContext, ItineraryPreferences, PromptContext, RecommendationContext,
    TravelTipsContext, TravelTipsPreferences,
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AiError {
    #[error("AI API key is not configured")]
    NotConfigured,
    #[error("AI provider error{}: {message}", status_suffix(.status))]
    Provider { status: Option<u16>, message: String },
    #[error("AI request failed: {0}")]
    Transport(String),
    #[error("AI provider returned no text")]
    EmptyResponse,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl AiError {
    /// True when the provider reported that its own quota was exhausted.
    pub fn is_rate_limited(&self) -> bool {
        self.to_string()
            .to_ascii_lowercase()
            .contains("rate limit exceeded")
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Transport(err.to_string())
    }
}

/// A text-in, text-out generation backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_rate_limit_in_any_case() {
        let err = AiError::Provider {
            status: Some(429),
            message: "Rate Limit Exceeded".into(),
        };
        assert!(err.is_rate_limited());
        assert_eq!(
            err.to_string(),
            "AI provider error (429): Rate Limit Exceeded"
        );
    }

    #[test]
    fn other_errors_are_not_rate_limits() {
        assert!(!AiError::EmptyResponse.is_rate_limited());
        assert!(!AiError::Transport("rate limiter misconfigured".into()).is_rate_limited());
    }
}
