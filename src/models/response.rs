use serde::{Deserialize, Serialize};

use super::image::{ImageModel, ImageSize, OutputFormat, Quality};

/// Token accounting attached to a successful upstream reply. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens_details: Option<InputTokensDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTokensDetails {
    #[serde(default)]
    pub text_tokens: u64,
    #[serde(default)]
    pub image_tokens: u64,
}

/// What an image producer hands back for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOutput {
    /// Base64 encoded image bytes.
    pub image_data: String,
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_data: String,
    pub estimated_cost: f64,
    pub model: ImageModel,
    pub quality: Quality,
    pub size: ImageSize,
    pub output_format: OutputFormat,
    pub transparent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    pub image_data: String,
    pub estimated_cost: f64,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

/// Result of probing the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub success: bool,
    pub message: String,
    /// Formatted as `"<n>ms"`.
    pub response_time: String,
    pub models_count: usize,
    pub has_gpt_image1: bool,
    pub first_few_models: Vec<String>,
}

impl HealthReport {
    pub fn from_model_ids(ids: &[String], elapsed_ms: u128) -> Self {
        Self {
            success: true,
            message: "OpenAI API is accessible".to_string(),
            response_time: format!("{}ms", elapsed_ms),
            models_count: ids.len(),
            has_gpt_image1: ids.iter().any(|id| id == ImageModel::GptImage1.as_str()),
            first_few_models: ids.iter().take(5).cloned().collect(),
        }
    }
}
