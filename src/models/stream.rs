use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_STREAM_ERROR: &str = "Unknown error during image generation";

/// One line of a streamed generation. `Progress` is the only stage that
/// carries a payload; `Complete` and `Error` are terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StreamEvent {
    Starting,
    Generating,
    #[serde(rename_all = "camelCase")]
    Progress {
        image_data: String,
        #[serde(default)]
        estimated_cost: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quality: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transparent: Option<bool>,
    },
    Complete,
    Error {
        #[serde(default)]
        error: Option<String>,
    },
}

impl StreamEvent {
    pub fn progress(image_data: impl Into<String>, estimated_cost: f64) -> Self {
        StreamEvent::Progress {
            image_data: image_data.into(),
            estimated_cost,
            model: None,
            quality: None,
            size: None,
            output_format: None,
            transparent: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            error: Some(message.into()),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            StreamEvent::Starting => "starting",
            StreamEvent::Generating => "generating",
            StreamEvent::Progress { .. } => "progress",
            StreamEvent::Complete => "complete",
            StreamEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete | StreamEvent::Error { .. })
    }

    /// Serialize as a single newline-terminated JSON line.
    pub fn to_line(&self) -> Bytes {
        let mut line = serde_json::to_vec(self).unwrap_or_else(|e| {
            log::error!("Failed to serialize stream event: {}", e);
            format!(
                r#"{{"status":"error","error":"{}"}}"#,
                "Failed to serialize stream event"
            )
            .into_bytes()
        });
        line.push(b'\n');
        Bytes::from(line)
    }
}
