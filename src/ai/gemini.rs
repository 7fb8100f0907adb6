use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{AiError, GenerativeModel};
use crate::config::Config;

/// Google Gemini `generateContent` over REST. The API key travels as `?key=`.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.ai_request_timeout())
            .build()?;
        Ok(Self {
            http,
            api_key: config.google_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::NotConfigured)?;

        tracing::debug!(model = %self.model, "Sending prompt to Gemini ({} chars)", prompt.len());
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&GenerateContentRequest {
                contents: [Content {
                    role: "user",
                    parts: [Part { text: prompt }],
                }],
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &body));
        }

        let body: GenerateContentResponse = response.json().await?;
        extract_text(body)
    }
}

fn provider_error(status: StatusCode, body: &str) -> AiError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    // Quota exhaustion is reported with 429; normalise the wording so callers
    // can recognise it regardless of the provider's phrasing.
    let message = if status == StatusCode::TOO_MANY_REQUESTS {
        format!("rate limit exceeded: {}", detail)
    } else {
        detail
    };
    AiError::Provider {
        status: Some(status.as_u16()),
        message,
    }
}

fn extract_text(body: GenerateContentResponse) -> Result<String, AiError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(AiError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_parts_of_first_candidate() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Lisbon, "},{"text":"Porto"}]}},
                {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "Lisbon, Porto");
    }

    #[test]
    fn blocked_prompt_is_an_empty_response() {
        let body: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(extract_text(body), Err(AiError::EmptyResponse)));
    }

    #[test]
    fn quota_errors_read_as_rate_limits() {
        let err = provider_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(err.is_rate_limited());

        let err = provider_error(StatusCode::BAD_REQUEST, "API key not valid");
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "AI provider error (400): API key not valid");
    }
}
