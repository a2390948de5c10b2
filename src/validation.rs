//! Authoritative checks run before any upstream call. Each function fails
//! fast on the first violated constraint.

use serde_json::json;

use crate::config::UploadLimits;
use crate::error::{Constraint, ValidationError};
use crate::models::{
    EditForm, EditRequest, GenerateBody, GenerationRequest, ImageModel, ImageSize, ModelParams,
    OutputFormat, Quality, UploadedImage,
};

pub const SUPPORTED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];
pub const MASK_IMAGE_TYPE: &str = "image/png";

type Checked<T> = std::result::Result<T, ValidationError>;

pub fn validate_generate(body: GenerateBody) -> Checked<GenerationRequest> {
    let prompt = require_prompt(body.prompt)?;

    let model = match body.model.as_deref() {
        Some(m) if !m.trim().is_empty() => m.parse::<ImageModel>()?,
        _ => ImageModel::default(),
    };
    check_prompt_length(&prompt, model.max_prompt_chars())?;

    let quality = body
        .quality
        .as_deref()
        .map(Quality::from)
        .unwrap_or_default();
    let size = parse_or(body.size.as_deref(), ImageSize::Square1024)?;
    let output_format = parse_or(body.output_format.as_deref(), OutputFormat::Jpeg)?;
    let params = ModelParams::resolve(model, &quality, size, output_format, body.transparent)?;

    Ok(GenerationRequest {
        prompt,
        model,
        quality,
        size,
        output_format,
        stream: body.stream,
        transparent: body.transparent,
        params,
    })
}

pub fn validate_edit(form: EditForm, limits: &UploadLimits) -> Checked<EditRequest> {
    let component_count = form.component_count();
    let prompt = require_prompt(form.prompt)?;
    let main_image = form.main_image.ok_or_else(|| {
        ValidationError::new(Constraint::MainImageRequired, "Please provide a main image")
            .with_detail("A main image is required for editing")
    })?;

    check_prompt_length(&prompt, limits.max_edit_prompt_chars)?;

    check_image_type(&main_image, &SUPPORTED_IMAGE_TYPES, || {
        ValidationError::new(
            Constraint::MainImageFormat,
            "Main image must be in PNG, JPEG, or WebP format",
        )
    })?;
    check_image_size(&main_image, limits, || {
        ValidationError::new(
            Constraint::MainImageSize,
            format!("Image too large. Maximum size is {}.", limits.max_image_mb()),
        )
    })?;

    if component_count > limits.max_component_images {
        return Err(ValidationError::new(
            Constraint::ComponentCount,
            format!(
                "Maximum of {} component images allowed",
                limits.max_component_images
            ),
        )
        .with_detail(format!(
            "Received {} component images",
            component_count
        )));
    }
    for (i, image) in form.component_images.iter().enumerate() {
        check_image_type(image, &SUPPORTED_IMAGE_TYPES, || {
            ValidationError::new(
                Constraint::ComponentImageFormat,
                "All component images must be in PNG, JPEG, or WebP format",
            )
            .with_details(json!({ "index": i + 1 }))
        })?;
        check_image_size(image, limits, || {
            ValidationError::new(
                Constraint::ComponentImageSize,
                format!(
                    "Component image {} too large. Maximum size is {}.",
                    i + 1,
                    limits.max_image_mb()
                ),
            )
        })?;
    }

    if let Some(mask) = &form.mask {
        check_image_type(mask, &[MASK_IMAGE_TYPE], || {
            ValidationError::new(Constraint::MaskFormat, "Mask must be in PNG format")
        })?;
        check_image_size(mask, limits, || {
            ValidationError::new(
                Constraint::MaskSize,
                format!("Mask image too large. Maximum size is {}.", limits.max_image_mb()),
            )
        })?;
    }

    let requested_model = match form.model.as_deref() {
        Some(m) if !m.trim().is_empty() => m.parse::<ImageModel>()?,
        _ => ImageModel::GptImage1,
    };
    if requested_model != ImageModel::GptImage1 {
        log::warn!(
            "Edit requested with {}, using {} instead",
            requested_model,
            ImageModel::GptImage1
        );
    }

    let quality = form
        .quality
        .as_deref()
        .map(Quality::from)
        .unwrap_or_default();
    let size = parse_or(form.size.as_deref(), ImageSize::Auto)?;
    let output_format = parse_or(form.output_format.as_deref(), OutputFormat::Png)?;
    let params = ModelParams::resolve(
        ImageModel::GptImage1,
        &quality,
        size,
        output_format,
        form.transparent,
    )?;

    Ok(EditRequest {
        base: GenerationRequest {
            prompt,
            model: ImageModel::GptImage1,
            quality,
            size,
            output_format,
            stream: false,
            transparent: form.transparent,
            params,
        },
        main_image,
        component_images: form.component_images,
        mask: form.mask,
    })
}

fn require_prompt(prompt: Option<String>) -> Checked<String> {
    match prompt {
        Some(p) if !p.trim().is_empty() => Ok(p),
        _ => Err(
            ValidationError::new(Constraint::PromptRequired, "Please provide a valid prompt")
                .with_detail("A prompt is required"),
        ),
    }
}

fn check_prompt_length(prompt: &str, max_chars: usize) -> Checked<()> {
    let length = prompt.chars().count();
    if length > max_chars {
        return Err(ValidationError::new(
            Constraint::PromptLength,
            format!("Prompt exceeds maximum length of {} characters", max_chars),
        )
        .with_detail("Please shorten your prompt")
        .with_details(json!({ "length": length, "maxLength": max_chars })));
    }
    Ok(())
}

fn check_image_type<F>(image: &UploadedImage, allowed: &[&str], err: F) -> Checked<()>
where
    F: FnOnce() -> ValidationError,
{
    let declared = image.declared_type().trim().to_ascii_lowercase();
    if allowed.iter().any(|t| *t == declared) {
        Ok(())
    } else {
        Err(err().with_detail(format!("Received format: {}", image.declared_type())))
    }
}

fn check_image_size<F>(image: &UploadedImage, limits: &UploadLimits, err: F) -> Checked<()>
where
    F: FnOnce() -> ValidationError,
{
    if image.size > limits.max_image_bytes {
        let e = err();
        let mut details = json!({
            "imageSize": image.size_mb(),
            "maxSize": limits.max_image_mb(),
        });
        if let (Some(serde_json::Value::Object(extra)), Some(obj)) =
            (&e.details, details.as_object_mut())
        {
            obj.extend(extra.clone());
        }
        return Err(e.with_details(details));
    }
    Ok(())
}

fn parse_or<T>(value: Option<&str>, default: T) -> Checked<T>
where
    T: std::str::FromStr<Err = ValidationError>,
{
    match value {
        Some(v) if !v.trim().is_empty() => v.parse(),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(len: usize) -> UploadedImage {
        UploadedImage::new("image/png", vec![0u8; len])
    }

    fn edit_form() -> EditForm {
        EditForm {
            prompt: Some("add a hat".into()),
            main_image: Some(png(16)),
            ..Default::default()
        }
    }

    #[test]
    fn generate_applies_defaults() {
        let req = validate_generate(GenerateBody {
            prompt: Some("a lighthouse".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(req.model, ImageModel::GptImage1);
        assert_eq!(req.quality, Quality::Standard);
        assert_eq!(req.size, ImageSize::Square1024);
        assert_eq!(req.output_format, OutputFormat::Jpeg);
        assert!(!req.stream);
    }

    #[test]
    fn generate_requires_prompt() {
        for prompt in [None, Some(String::new()), Some("   ".into())] {
            let err = validate_generate(GenerateBody {
                prompt,
                ..Default::default()
            })
            .unwrap_err();
            assert_eq!(err.constraint, Constraint::PromptRequired);
        }
    }

    #[test]
    fn generate_prompt_limit_depends_on_model() {
        let body = |model: &str| GenerateBody {
            prompt: Some("x".repeat(5_000)),
            model: Some(model.into()),
            ..Default::default()
        };
        assert_eq!(
            validate_generate(body("dall-e-3")).unwrap_err().constraint,
            Constraint::PromptLength
        );
        assert!(validate_generate(body("gpt-image-1")).is_ok());
    }

    #[test]
    fn generate_rejects_unknown_format() {
        let err = validate_generate(GenerateBody {
            prompt: Some("p".into()),
            output_format: Some("gif".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.constraint, Constraint::OutputFormat);
    }

    #[test]
    fn edit_requires_main_image() {
        let err = validate_edit(
            EditForm {
                prompt: Some("p".into()),
                ..Default::default()
            },
            &UploadLimits::default(),
        )
        .unwrap_err();
        assert_eq!(err.constraint, Constraint::MainImageRequired);
    }

    #[test]
    fn edit_prompt_checked_before_image() {
        let err = validate_edit(EditForm::default(), &UploadLimits::default()).unwrap_err();
        assert_eq!(err.constraint, Constraint::PromptRequired);
    }

    #[test]
    fn edit_rejects_unsupported_main_type() {
        let mut form = edit_form();
        form.main_image = Some(UploadedImage::new("image/gif", vec![1, 2, 3]));
        let err = validate_edit(form, &UploadLimits::default()).unwrap_err();
        assert_eq!(err.constraint, Constraint::MainImageFormat);
        assert!(err.to_string().contains("image/gif"));
    }

    #[test]
    fn edit_accepts_jpg_alias() {
        let mut form = edit_form();
        form.main_image = Some(UploadedImage::new("image/jpg", vec![1]));
        assert!(validate_edit(form, &UploadLimits::default()).is_ok());
    }

    #[test]
    fn edit_rejects_oversized_main_image() {
        let limits = UploadLimits::default().with_max_image_bytes(8);
        let mut form = edit_form();
        form.main_image = Some(png(9));
        let err = validate_edit(form, &limits).unwrap_err();
        assert_eq!(err.constraint, Constraint::MainImageSize);
        assert!(err.details.unwrap().get("maxSize").is_some());
    }

    #[test]
    fn ten_images_pass_eleven_fail() {
        let mut form = edit_form();
        form.component_images = (0..9).map(|_| png(4)).collect();
        let ok = validate_edit(form.clone(), &UploadLimits::default()).unwrap();
        assert_eq!(ok.image_count(), 10);

        form.component_images.push(png(4));
        let err = validate_edit(form, &UploadLimits::default()).unwrap_err();
        assert_eq!(err.constraint, Constraint::ComponentCount);
        assert!(err.message.contains("9 component images"));
    }

    #[test]
    fn skipped_components_still_count() {
        let mut form = edit_form();
        form.component_images = (0..9).map(|_| png(4)).collect();
        form.skipped_components = 191;
        let err = validate_edit(form, &UploadLimits::default()).unwrap_err();
        assert_eq!(err.constraint, Constraint::ComponentCount);
        assert_eq!(err.detail.as_deref(), Some("Received 200 component images"));
    }

    #[test]
    fn component_size_message_names_index() {
        let limits = UploadLimits::default().with_max_image_bytes(8);
        let mut form = edit_form();
        form.main_image = Some(png(4));
        form.component_images = vec![png(4), png(64)];
        let err = validate_edit(form, &limits).unwrap_err();
        assert_eq!(err.constraint, Constraint::ComponentImageSize);
        assert!(err.message.starts_with("Component image 2"));
    }

    #[test]
    fn component_with_unsupported_type_is_rejected() {
        let mut form = edit_form();
        form.component_images = vec![png(4), UploadedImage::new("image/bmp", vec![1, 2])];
        let err = validate_edit(form, &UploadLimits::default()).unwrap_err();
        assert_eq!(err.constraint, Constraint::ComponentImageFormat);
        assert_eq!(err.details.unwrap()["index"], 2);
        assert_eq!(err.detail.as_deref(), Some("Received format: image/bmp"));
    }

    #[test]
    fn oversized_mask_is_rejected() {
        let limits = UploadLimits::default().with_max_image_bytes(8);
        let mut form = edit_form();
        form.main_image = Some(png(4));
        form.mask = Some(png(32));
        let err = validate_edit(form, &limits).unwrap_err();
        assert_eq!(err.constraint, Constraint::MaskSize);
        assert!(err.message.starts_with("Mask image too large"));
        assert_eq!(err.details.unwrap()["maxSize"], "8 bytes");
    }

    #[test]
    fn jpeg_mask_is_rejected() {
        let mut form = edit_form();
        form.mask = Some(UploadedImage::new("image/jpeg", vec![1]));
        let err = validate_edit(form, &UploadLimits::default()).unwrap_err();
        assert_eq!(err.constraint, Constraint::MaskFormat);
        assert!(err.message.contains("PNG"));
    }

    #[test]
    fn edit_always_targets_gpt_image() {
        let mut form = edit_form();
        form.model = Some("dall-e-3".into());
        let req = validate_edit(form, &UploadLimits::default()).unwrap();
        assert_eq!(req.base.model, ImageModel::GptImage1);
        assert_eq!(req.base.size, ImageSize::Auto);
        assert_eq!(req.base.output_format, OutputFormat::Png);
    }
}
