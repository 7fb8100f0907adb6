//! Request body validation.
//!
//! Bodies are deserialized into a permissive raw shape first, then checked
//! field by field so a client gets every problem in one 400 response.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A request type that can be built from its raw JSON shape.
pub trait Validate: Sized {
    type Raw: DeserializeOwned + Send;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>>;
}

/// JSON extractor that rejects with `AppError::Validation` instead of axum's 422.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<T::Raw>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
        T::validate(raw).map(ValidatedJson).map_err(AppError::Validation)
    }
}

/// Collects field errors while pulling typed values out of a raw body.
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Required string, trimmed, with a character count in `min..=max`.
    pub fn text(&mut self, field: &str, value: Option<String>, min: usize, max: usize) -> String {
        match value {
            None => {
                self.push(field, "Required");
                String::new()
            }
            Some(v) => {
                let v = v.trim().to_string();
                self.check_length(field, &v, min, max);
                v
            }
        }
    }

    /// Like [`Checker::text`] but absent or blank values are allowed.
    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<String>,
        max: usize,
    ) -> Option<String> {
        let v = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
        self.check_length(field, &v, 0, max);
        Some(v)
    }

    pub fn list(&mut self, field: &str, value: Option<Vec<String>>, min_items: usize) -> Vec<String> {
        let Some(items) = value else {
            self.push(field, "Required");
            return Vec::new();
        };
        if items.len() < min_items {
            self.push(
                field,
                format!("Array must contain at least {} element(s)", min_items),
            );
        }
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let item = item.trim().to_string();
            if item.is_empty() {
                self.push(&format!("{}.{}", field, i), "Must not be empty");
            }
            out.push(item);
        }
        out
    }

    pub fn email(&mut self, field: &str, value: Option<String>) -> String {
        let v = self.text(field, value, 1, 254).to_lowercase();
        if !v.is_empty() && !looks_like_email(&v) {
            self.push(field, "Invalid email");
        }
        v
    }

    pub fn url(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let v = self.optional_text(field, value, 2048)?;
        let valid = Url::parse(&v)
            .map(|u| {
                matches!(u.scheme(), "http" | "https")
                    && u.host_str().is_some_and(|h| !h.is_empty())
            })
            .unwrap_or(false);
        if !valid {
            self.push(field, "Invalid url");
        }
        Some(v)
    }

    /// Accepts `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
    pub fn date(&mut self, field: &str, value: Option<String>) -> Option<DateTime<Utc>> {
        let Some(raw) = value else {
            self.push(field, "Required");
            return None;
        };
        let parsed = parse_date(raw.trim());
        if parsed.is_none() {
            self.push(field, "Invalid date");
        }
        parsed
    }

    pub fn optional_date(&mut self, field: &str, value: Option<String>) -> Option<DateTime<Utc>> {
        match value.filter(|v| !v.trim().is_empty()) {
            None => None,
            some => self.date(field, some),
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        let v = value?;
        if !v.is_finite() || v < 0.0 {
            self.push(field, "Number must be greater than or equal to 0");
        }
        Some(v)
    }

    pub fn range(&mut self, field: &str, value: Option<f64>, min: f64, max: f64) -> f64 {
        match value {
            None => {
                self.push(field, "Required");
                0.0
            }
            Some(v) => {
                if !(min..=max).contains(&v) {
                    self.push(field, format!("Number must be between {} and {}", min, max));
                }
                v
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }

    fn check_length(&mut self, field: &str, v: &str, min: usize, max: usize) {
        let len = v.chars().count();
        if len < min {
            if min == 1 {
                self.push(field, "Required");
            } else {
                self.push(
                    field,
                    format!("String must contain at least {} character(s)", min),
                );
            }
        } else if len > max {
            self.push(
                field,
                format!("String must contain at most {} character(s)", max),
            );
        }
    }
}

fn looks_like_email(v: &str) -> bool {
    let Some((local, domain)) = v.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !v.chars().any(char::is_whitespace)
}

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
