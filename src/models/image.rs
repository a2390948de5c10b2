use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Constraint, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageModel {
    #[serde(rename = "dall-e-3")]
    DallE3,
    #[serde(rename = "gpt-image-1")]
    GptImage1,
}

impl ImageModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageModel::DallE3 => "dall-e-3",
            ImageModel::GptImage1 => "gpt-image-1",
        }
    }

    pub fn max_prompt_chars(&self) -> usize {
        match self {
            ImageModel::DallE3 => 4_000,
            ImageModel::GptImage1 => 32_000,
        }
    }

    pub fn supports_transparency(&self) -> bool {
        matches!(self, ImageModel::GptImage1)
    }

    pub fn supported_models() -> Vec<(&'static str, &'static str)> {
        vec![
            ("dall-e-3", "DALL-E 3"),
            ("gpt-image-1", "GPT Image 1"),
        ]
    }
}

impl Default for ImageModel {
    fn default() -> Self {
        ImageModel::GptImage1
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageModel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dall-e-3" => Ok(ImageModel::DallE3),
            "gpt-image-1" => Ok(ImageModel::GptImage1),
            other => Err(ValidationError::new(Constraint::Model, "Invalid model specified")
                .with_detail(format!("Received model: {}", other))),
        }
    }
}

/// Quality as chosen in the UI. Unknown values are preserved rather than
/// rejected; each model maps them onto its own tier set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Quality {
    Standard,
    Hd,
    Low,
    Medium,
    High,
    Auto,
    Other(String),
}

impl Quality {
    pub fn as_str(&self) -> &str {
        match self {
            Quality::Standard => "standard",
            Quality::Hd => "hd",
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
            Quality::Auto => "auto",
            Quality::Other(s) => s,
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Standard
    }
}

impl From<&str> for Quality {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Quality::Standard,
            "hd" => Quality::Hd,
            "low" => Quality::Low,
            "medium" => Quality::Medium,
            "high" => Quality::High,
            "auto" => Quality::Auto,
            _ => Quality::Other(s.to_string()),
        }
    }
}

impl From<String> for Quality {
    fn from(s: String) -> Self {
        Quality::from(s.as_str())
    }
}

impl From<Quality> for String {
    fn from(q: Quality) -> Self {
        q.as_str().to_string()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1024x1024")]
    Square1024,
    #[serde(rename = "1792x1024")]
    Wide1792,
    #[serde(rename = "1024x1792")]
    Tall1792,
    #[serde(rename = "1536x1024")]
    Landscape1536,
    #[serde(rename = "1024x1536")]
    Portrait1536,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Auto => "auto",
            ImageSize::Square1024 => "1024x1024",
            ImageSize::Wide1792 => "1792x1024",
            ImageSize::Tall1792 => "1024x1792",
            ImageSize::Landscape1536 => "1536x1024",
            ImageSize::Portrait1536 => "1024x1536",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(ImageSize::Auto),
            "1024x1024" => Ok(ImageSize::Square1024),
            "1792x1024" => Ok(ImageSize::Wide1792),
            "1024x1792" => Ok(ImageSize::Tall1792),
            "1536x1024" => Ok(ImageSize::Landscape1536),
            "1024x1536" => Ok(ImageSize::Portrait1536),
            other => Err(ValidationError::new(Constraint::Size, "Unsupported image size")
                .with_detail(format!("Received size: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn supports_alpha(&self) -> bool {
        matches!(self, OutputFormat::Png | OutputFormat::Webp)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            _ => Err(
                ValidationError::new(Constraint::OutputFormat, "Unsupported output format")
                    .with_detail(format!("Received format: {}", s)),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DallEQuality {
    Standard,
    Hd,
}

impl DallEQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DallEQuality::Standard => "standard",
            DallEQuality::Hd => "hd",
        }
    }
}

impl From<&Quality> for DallEQuality {
    fn from(q: &Quality) -> Self {
        match q {
            Quality::High | Quality::Hd => DallEQuality::Hd,
            _ => DallEQuality::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DallESize {
    Square,
    Wide,
    Tall,
}

impl DallESize {
    pub fn as_str(&self) -> &'static str {
        match self {
            DallESize::Square => "1024x1024",
            DallESize::Wide => "1792x1024",
            DallESize::Tall => "1024x1792",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GptQuality {
    Low,
    Medium,
    High,
    Auto,
}

impl GptQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            GptQuality::Low => "low",
            GptQuality::Medium => "medium",
            GptQuality::High => "high",
            GptQuality::Auto => "auto",
        }
    }
}

impl From<&Quality> for GptQuality {
    fn from(q: &Quality) -> Self {
        match q {
            Quality::Low | Quality::Standard => GptQuality::Low,
            Quality::Medium => GptQuality::Medium,
            Quality::High | Quality::Hd => GptQuality::High,
            Quality::Auto => GptQuality::Auto,
            Quality::Other(_) => GptQuality::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GptSize {
    Auto,
    Square,
    Landscape,
    Portrait,
}

impl GptSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            GptSize::Auto => "auto",
            GptSize::Square => "1024x1024",
            GptSize::Landscape => "1536x1024",
            GptSize::Portrait => "1024x1536",
        }
    }
}

/// Upstream parameters, one shape per model. Only combinations the selected
/// model accepts can be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelParams {
    DallE3 {
        quality: DallEQuality,
        /// `None` leaves the size to the upstream default.
        size: Option<DallESize>,
    },
    GptImage1 {
        quality: GptQuality,
        size: GptSize,
        output_format: OutputFormat,
        transparent: bool,
    },
}

impl ModelParams {
    pub fn resolve(
        model: ImageModel,
        quality: &Quality,
        size: ImageSize,
        output_format: OutputFormat,
        transparent: bool,
    ) -> Result<Self, ValidationError> {
        let unsupported = || {
            ValidationError::new(
                Constraint::Size,
                format!("Size {} is not supported by {}", size, model),
            )
            .with_detail(format!("Received size: {}", size))
        };

        match model {
            ImageModel::DallE3 => {
                let size = match size {
                    ImageSize::Auto => None,
                    ImageSize::Square1024 => Some(DallESize::Square),
                    ImageSize::Wide1792 => Some(DallESize::Wide),
                    ImageSize::Tall1792 => Some(DallESize::Tall),
                    _ => return Err(unsupported()),
                };
                Ok(ModelParams::DallE3 {
                    quality: DallEQuality::from(quality),
                    size,
                })
            }
            ImageModel::GptImage1 => {
                let size = match size {
                    ImageSize::Auto => GptSize::Auto,
                    ImageSize::Square1024 => GptSize::Square,
                    ImageSize::Landscape1536 => GptSize::Landscape,
                    ImageSize::Portrait1536 => GptSize::Portrait,
                    _ => return Err(unsupported()),
                };
                Ok(ModelParams::GptImage1 {
                    quality: GptQuality::from(quality),
                    size,
                    output_format,
                    transparent: transparent && output_format.supports_alpha(),
                })
            }
        }
    }

    pub fn model(&self) -> ImageModel {
        match self {
            ModelParams::DallE3 { .. } => ImageModel::DallE3,
            ModelParams::GptImage1 { .. } => ImageModel::GptImage1,
        }
    }

    /// Whether a transparent background will actually be requested upstream.
    pub fn transparent(&self) -> bool {
        match self {
            ModelParams::DallE3 { .. } => false,
            ModelParams::GptImage1 { transparent, .. } => *transparent,
        }
    }

    pub fn output_format(&self) -> Option<OutputFormat> {
        match self {
            ModelParams::DallE3 { .. } => None,
            ModelParams::GptImage1 { output_format, .. } => Some(*output_format),
        }
    }
}
