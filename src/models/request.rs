use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::image::{ImageModel, ImageSize, ModelParams, OutputFormat, Quality};

/// JSON body accepted by `POST /api/generate`, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub transparent: bool,
}

/// A file received in a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    /// MIME type as declared by the sender.
    pub content_type: Option<String>,
    /// Retained bytes; never longer than the configured limit.
    pub data: Bytes,
    /// Total bytes received, including any that were not retained.
    pub size: usize,
}

impl UploadedImage {
    pub fn new(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            file_name: None,
            content_type: Some(content_type.into()),
            size: data.len(),
            data,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn declared_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or("unknown")
    }

    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.size
    }

    pub fn size_mb(&self) -> String {
        if self.size < 1024 * 1024 {
            return crate::config::format_size(self.size);
        }
        format!("{:.2}MB", self.size as f64 / (1024.0 * 1024.0))
    }
}

/// Fields gathered from the `POST /api/edit` multipart body, before validation.
#[derive(Debug, Clone, Default)]
pub struct EditForm {
    pub prompt: Option<String>,
    pub main_image: Option<UploadedImage>,
    pub component_images: Vec<UploadedImage>,
    /// Component parts received past the retention cap; counted, never kept.
    pub skipped_components: usize,
    pub mask: Option<UploadedImage>,
    pub quality: Option<String>,
    pub size: Option<String>,
    pub model: Option<String>,
    pub output_format: Option<String>,
    pub transparent: bool,
}

impl EditForm {
    pub fn component_count(&self) -> usize {
        self.component_images.len() + self.skipped_components
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: ImageModel,
    pub quality: Quality,
    pub size: ImageSize,
    pub output_format: OutputFormat,
    pub stream: bool,
    pub transparent: bool,
    pub params: ModelParams,
}

impl GenerationRequest {
    pub fn prompt_preview(&self) -> String {
        prompt_preview(&self.prompt)
    }
}

#[derive(Debug, Clone)]
pub struct EditRequest {
    pub base: GenerationRequest,
    pub main_image: UploadedImage,
    pub component_images: Vec<UploadedImage>,
    pub mask: Option<UploadedImage>,
}

impl EditRequest {
    /// Main image first, then components in upload order.
    pub fn images(&self) -> impl Iterator<Item = &UploadedImage> {
        std::iter::once(&self.main_image).chain(self.component_images.iter())
    }

    pub fn image_count(&self) -> usize {
        1 + self.component_images.len()
    }
}

pub(crate) fn prompt_preview(prompt: &str) -> String {
    let mut preview: String = prompt.chars().take(50).collect();
    if prompt.chars().count() > 50 {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_body_defaults() {
        let body: GenerateBody = serde_json::from_str(r#"{"prompt":"a fox"}"#).unwrap();
        assert_eq!(body.prompt.as_deref(), Some("a fox"));
        assert!(!body.stream);
        assert!(!body.transparent);
        assert!(body.output_format.is_none());
    }

    #[test]
    fn generate_body_reads_camel_case() {
        let body: GenerateBody =
            serde_json::from_str(r#"{"prompt":"p","outputFormat":"png","stream":true}"#).unwrap();
        assert_eq!(body.output_format.as_deref(), Some("png"));
        assert!(body.stream);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let prompt = "é".repeat(60);
        let preview = prompt_preview(&prompt);
        assert_eq!(preview.chars().count(), 53);
        assert!(preview.ends_with("..."));
        assert_eq!(prompt_preview("short"), "short");
    }

    #[test]
    fn uploaded_image_reports_size() {
        let img = UploadedImage::new("image/png", vec![0u8; 3 * 1024 * 1024]);
        assert_eq!(img.size_mb(), "3.00MB");
        assert!(!img.is_truncated());
        assert_eq!(UploadedImage::new("image/png", vec![0u8; 4096]).size_mb(), "4KB");
    }
}
