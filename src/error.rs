use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

pub const MISSING_API_KEY: &str = "OpenAI API key is not configured";
pub const MISSING_API_KEY_HINT: &str = "Please set the OPENAI_API_KEY environment variable";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Upstream(#[from] UpstreamError),
    #[error("{0}")]
    Timeout(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Request(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Which input constraint a request violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Body,
    PromptRequired,
    PromptLength,
    Model,
    MainImageRequired,
    MainImageFormat,
    MainImageSize,
    ComponentCount,
    ComponentImageFormat,
    ComponentImageSize,
    MaskFormat,
    MaskSize,
    Size,
    OutputFormat,
}

impl Constraint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Constraint::Body => "body",
            Constraint::PromptRequired => "prompt_required",
            Constraint::PromptLength => "prompt_length",
            Constraint::Model => "model",
            Constraint::MainImageRequired => "main_image_required",
            Constraint::MainImageFormat => "main_image_format",
            Constraint::MainImageSize => "main_image_size",
            Constraint::ComponentCount => "component_count",
            Constraint::ComponentImageFormat => "component_image_format",
            Constraint::ComponentImageSize => "component_image_size",
            Constraint::MaskFormat => "mask_format",
            Constraint::MaskSize => "mask_size",
            Constraint::Size => "size",
            Constraint::OutputFormat => "output_format",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub constraint: Constraint,
    pub message: String,
    pub detail: Option<String>,
    pub details: Option<Value>,
}

impl ValidationError {
    pub fn new(constraint: Constraint, message: impl Into<String>) -> Self {
        Self {
            constraint,
            message: message.into(),
            detail: None,
            details: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}. {}", self.message, detail),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failure reported by the service on the other side of an HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamError {
    pub status: Option<u16>,
    pub message: String,
    pub error_type: Option<String>,
    pub code: Option<String>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            error_type: None,
            code: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Decode an OpenAI-style `{"error": {"message", "type", "code"}}` body,
    /// falling back to the raw text when the body has another shape.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let inner = parsed.as_ref().and_then(|v| v.get("error"));

        let message = inner
            .and_then(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
            .map(String::from)
            .or_else(|| {
                parsed
                    .as_ref()
                    .and_then(|v| v.get("message"))
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("Upstream responded with status {}", status)
                } else {
                    trimmed.to_string()
                }
            });

        Self {
            status: Some(status),
            message,
            error_type: inner
                .and_then(|e| e.get("type"))
                .and_then(Value::as_str)
                .map(String::from),
            code: inner.and_then(|e| e.get("code")).and_then(|c| match c {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "Upstream error ({}): {}", status, self.message),
            None => write!(f, "Upstream error: {}", self.message),
        }
    }
}

impl std::error::Error for UpstreamError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    Upstream,
    Timeout,
    Parse,
    Internal,
}

/// The uniform error payload every failing request receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RelayError {
    pub fn timeout(after: std::time::Duration) -> Self {
        RelayError::Timeout(format!(
            "Request timed out after {} seconds. The image might still be processing.",
            after.as_secs().max(1)
        ))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Config(_) => ErrorKind::Configuration,
            RelayError::Validation(_) => ErrorKind::Validation,
            RelayError::Upstream(_) => ErrorKind::Upstream,
            RelayError::Timeout(_) => ErrorKind::Timeout,
            RelayError::Parse(_) | RelayError::Request(_) => ErrorKind::Parse,
            RelayError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            RelayError::Config(_) | RelayError::Internal(_) => 500,
            RelayError::Validation(_) => 400,
            RelayError::Upstream(e) => e.status.filter(|s| (400..600).contains(s)).unwrap_or(500),
            RelayError::Timeout(_) => 504,
            RelayError::Parse(_) | RelayError::Request(_) => 502,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::Timeout(_) | RelayError::Request(_) => true,
            RelayError::Upstream(e) => matches!(e.status, Some(408 | 409 | 429) | Some(500..=599)),
            _ => false,
        }
    }

    /// Short text suitable for showing to a user as-is.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Config(_) => MISSING_API_KEY.to_string(),
            RelayError::Validation(e) => e.to_string(),
            RelayError::Upstream(e) if !e.message.is_empty() => e.message.clone(),
            RelayError::Timeout(msg) => msg.clone(),
            RelayError::Internal(msg) if msg.is_empty() => "An unexpected error occurred".to_string(),
            RelayError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_error_body(&self) -> ErrorBody {
        let kind = Some(self.kind());
        match self {
            RelayError::Config(_) => ErrorBody {
                error: MISSING_API_KEY.to_string(),
                message: Some(MISSING_API_KEY_HINT.to_string()),
                kind,
                details: None,
            },
            RelayError::Validation(e) => {
                let mut details = json!({ "constraint": e.constraint });
                if let (Some(Value::Object(extra)), Some(obj)) = (&e.details, details.as_object_mut()) {
                    obj.extend(extra.clone());
                }
                ErrorBody {
                    error: e.message.clone(),
                    message: e.detail.clone(),
                    kind,
                    details: Some(details),
                }
            }
            RelayError::Upstream(e) => ErrorBody {
                error: if e.message.is_empty() {
                    "OpenAI API error".to_string()
                } else {
                    e.message.clone()
                },
                message: e.error_type.as_ref().map(|t| {
                    format!("{}: {}", t, e.code.as_deref().unwrap_or("unknown error code"))
                }),
                kind,
                details: Some(json!({ "type": e.error_type, "code": e.code })),
            },
            RelayError::Timeout(msg) => ErrorBody {
                error: "Request timed out".to_string(),
                message: Some(msg.clone()),
                kind,
                details: Some(json!({ "retryable": true })),
            },
            RelayError::Parse(msg) | RelayError::Request(msg) => ErrorBody {
                error: "Failed to process upstream response".to_string(),
                message: Some(msg.clone()),
                kind,
                details: None,
            },
            RelayError::Internal(msg) => ErrorBody {
                error: "An unexpected error occurred".to_string(),
                message: Some(if msg.is_empty() {
                    "Unknown error".to_string()
                } else {
                    msg.clone()
                }),
                kind,
                details: None,
            },
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Timeout(format!(
                "Upstream request timed out: {}. The image might still be processing.",
                e
            ))
        } else if e.is_decode() {
            RelayError::Parse(e.to_string())
        } else {
            RelayError::Request(e.to_string())
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Parse(e.to_string())
    }
}

#[cfg(feature = "server")]
impl actix_web::ResponseError for RelayError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code()).json(self.to_error_body())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_has_fixed_body() {
        let a = RelayError::Config("missing".into()).to_error_body();
        let b = RelayError::Config("other".into()).to_error_body();
        assert_eq!(a, b);
        assert_eq!(a.error, MISSING_API_KEY);
        assert_eq!(RelayError::Config("x".into()).status(), 500);
    }

    #[test]
    fn upstream_status_is_mirrored() {
        let err = RelayError::Upstream(UpstreamError::from_response_body(
            429,
            r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#,
        ));
        assert_eq!(err.status(), 429);
        let body = err.to_error_body();
        assert_eq!(body.error, "Rate limit reached");
        assert_eq!(body.message.as_deref(), Some("requests: rate_limit_exceeded"));
        assert_eq!(body.details.unwrap()["code"], "rate_limit_exceeded");
        assert!(err.is_retryable());
    }

    #[test]
    fn upstream_without_status_defaults_to_500() {
        let err = RelayError::Upstream(UpstreamError::new("connection reset"));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn upstream_body_falls_back_to_raw_text() {
        let e = UpstreamError::from_response_body(502, "Bad Gateway");
        assert_eq!(e.message, "Bad Gateway");
        assert!(e.error_type.is_none());

        let e = UpstreamError::from_response_body(500, "");
        assert_eq!(e.message, "Upstream responded with status 500");
    }

    #[test]
    fn validation_body_names_constraint() {
        let err: RelayError = ValidationError::new(Constraint::MaskFormat, "Mask must be in PNG format")
            .with_detail("Received format: image/jpeg")
            .into();
        assert_eq!(err.status(), 400);
        let body = err.to_error_body();
        assert_eq!(body.kind, Some(ErrorKind::Validation));
        assert_eq!(body.details.unwrap()["constraint"], "mask_format");
        assert_eq!(body.message.as_deref(), Some("Received format: image/jpeg"));
    }

    #[test]
    fn timeout_is_retryable() {
        let err = RelayError::timeout(std::time::Duration::from_secs(180));
        assert_eq!(err.status(), 504);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("might still be processing"));
    }

    #[test]
    fn user_message_drops_prefixes() {
        let err = RelayError::Upstream(UpstreamError::new("Billing hard limit reached").with_status(400));
        assert_eq!(err.user_message(), "Billing hard limit reached");
        let err = RelayError::timeout(std::time::Duration::from_secs(300));
        assert!(err.user_message().starts_with("Request timed out after 300 seconds"));
    }

    #[test]
    fn internal_error_keeps_message() {
        let body = RelayError::Internal("boom".into()).to_error_body();
        assert_eq!(body.message.as_deref(), Some("boom"));
    }
}
