use serde::Deserialize;

use crate::models::{InputTokensDetails, UsageInfo};

#[derive(Debug, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub data: Vec<ImageDatum>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ImageDatum {
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub input_tokens_details: Option<OpenAiInputTokensDetails>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiInputTokensDetails {
    #[serde(default)]
    pub text_tokens: u64,
    #[serde(default)]
    pub image_tokens: u64,
}

impl From<OpenAiUsage> for UsageInfo {
    fn from(u: OpenAiUsage) -> Self {
        UsageInfo {
            total_tokens: u.total_tokens,
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
            input_tokens_details: u.input_tokens_details.map(|d| InputTokensDetails {
                text_tokens: d.text_tokens,
                image_tokens: d.image_tokens,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_maps_to_camel_case_info() {
        let raw = r#"{
            "data": [{"b64_json": "AA"}],
            "usage": {
                "total_tokens": 100,
                "input_tokens": 50,
                "output_tokens": 50,
                "input_tokens_details": {"text_tokens": 10, "image_tokens": 40}
            }
        }"#;
        let resp: ImagesResponse = serde_json::from_str(raw).unwrap();
        let usage: UsageInfo = resp.usage.unwrap().into();
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["totalTokens"], 100);
        assert_eq!(json["inputTokensDetails"]["imageTokens"], 40);
    }
}
