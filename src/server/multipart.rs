use crate::{
    config::UploadLimits,
    error::{Constraint, Result, ValidationError},
    models::{EditForm, UploadedImage},
};
use actix_multipart::{Field, Multipart, MultipartError};
use bytes::BytesMut;
use futures::StreamExt;

/// Text fields are small; anything past this is not a real form value.
const MAX_TEXT_FIELD: usize = 256 * 1024;

/// Upper bound on parts of any name in one edit form.
pub const MAX_FORM_PARTS: usize = 64;

/// Collect the edit form fields. File bytes past the image limit are
/// counted but dropped, so the validator still sees the real upload size.
/// Component parts past the component limit are drained and only counted.
pub async fn read_edit_form(mut payload: Multipart, limits: &UploadLimits) -> Result<EditForm> {
    let max_file_bytes = limits.max_image_bytes;
    let mut form = EditForm::default();
    let mut parts = 0usize;

    while let Some(field) = payload.next().await {
        let field = field.map_err(malformed)?;
        parts += 1;
        if parts > MAX_FORM_PARTS {
            return Err(ValidationError::new(Constraint::Body, "Too many form parts")
                .with_detail(format!("At most {} parts are accepted", MAX_FORM_PARTS))
                .into());
        }
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "mainImage" => form.main_image = read_file(field, max_file_bytes).await?,
            "componentImages" if form.component_images.len() >= limits.max_component_images => {
                drain(field).await?;
                form.skipped_components += 1;
            }
            "componentImages" => {
                if let Some(image) = read_file(field, max_file_bytes).await? {
                    form.component_images.push(image);
                }
            }
            "mask" => form.mask = read_file(field, max_file_bytes).await?,
            "prompt" => form.prompt = Some(read_text(field).await?),
            "quality" => form.quality = non_empty(read_text(field).await?),
            "size" => form.size = non_empty(read_text(field).await?),
            "model" => form.model = non_empty(read_text(field).await?),
            "outputFormat" => form.output_format = non_empty(read_text(field).await?),
            "transparent" => form.transparent = is_truthy(&read_text(field).await?),
            other => {
                log::debug!("Ignoring unexpected form field '{}'", other);
                drain(field).await?;
            }
        }
    }

    log::debug!(
        "Edit form received: main_image={} components={} mask={}",
        form.main_image.is_some(),
        form.component_count(),
        form.mask.is_some()
    );
    Ok(form)
}

/// Returns `None` for the empty part browsers send when no file was chosen.
async fn read_file(mut field: Field, limit: usize) -> Result<Option<UploadedImage>> {
    let content_type = field.content_type().map(|m| m.essence_str().to_string());
    let file_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(String::from);

    let mut data = BytesMut::new();
    let mut size = 0usize;
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(malformed)?;
        size += chunk.len();
        if data.len() < limit {
            let keep = (limit - data.len()).min(chunk.len());
            data.extend_from_slice(&chunk[..keep]);
        }
    }

    if size == 0 && file_name.as_deref().map_or(true, str::is_empty) {
        return Ok(None);
    }

    Ok(Some(UploadedImage {
        file_name: file_name.filter(|n| !n.is_empty()),
        content_type,
        data: data.freeze(),
        size,
    }))
}

async fn read_text(mut field: Field) -> Result<String> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(malformed)?;
        if buf.len() + chunk.len() > MAX_TEXT_FIELD {
            let name = field.name().unwrap_or_default();
            return Err(ValidationError::new(Constraint::Body, "Form field too large")
                .with_detail(format!("Field '{}' exceeds {} bytes", name, MAX_TEXT_FIELD))
                .into());
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf.to_vec()).map_err(|_| {
        ValidationError::new(Constraint::Body, "Form fields must be valid UTF-8").into()
    })
}

async fn drain(mut field: Field) -> Result<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(malformed)?;
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
}

fn malformed(e: MultipartError) -> crate::error::RelayError {
    ValidationError::new(Constraint::Body, "Invalid multipart form data")
        .with_detail(e.to_string())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        error::PayloadError,
        http::header::{self, HeaderMap, HeaderValue},
    };
    use bytes::Bytes;

    const BOUNDARY: &str = "form-test-boundary";

    fn multipart(parts: &[(&str, &[u8])]) -> Multipart {
        let mut body = Vec::new();
        for (name, data) in parts {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}.png\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY, name, name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={}", BOUNDARY)).unwrap(),
        );
        let stream = futures::stream::iter(vec![Ok::<_, PayloadError>(Bytes::from(body))]);
        Multipart::new(&headers, stream)
    }

    #[actix_web::test]
    async fn components_past_the_limit_are_counted_not_kept() {
        let chunk = vec![7u8; 64 * 1024];
        let mut parts: Vec<(&str, &[u8])> = vec![("mainImage", &b"main"[..])];
        parts.extend((0..40).map(|_| ("componentImages", chunk.as_slice())));

        let limits = UploadLimits::default();
        let form = read_edit_form(multipart(&parts), &limits).await.unwrap();
        assert_eq!(form.component_images.len(), limits.max_component_images);
        assert_eq!(form.skipped_components, 40 - limits.max_component_images);
        assert_eq!(form.component_count(), 40);
        assert!(form.main_image.is_some());
    }

    #[actix_web::test]
    async fn part_count_is_capped() {
        let parts: Vec<(&str, &[u8])> = (0..MAX_FORM_PARTS + 1).map(|_| ("junk", &b"x"[..])).collect();
        let err = read_edit_form(multipart(&parts), &UploadLimits::default())
            .await
            .unwrap_err();
        match err {
            crate::error::RelayError::Validation(e) => {
                assert_eq!(e.constraint, Constraint::Body);
                assert_eq!(e.message, "Too many form parts");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn flags_and_blanks() {
        assert!(is_truthy("true"));
        assert!(is_truthy(" 1 "));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
        assert_eq!(non_empty("  ".into()), None);
        assert_eq!(non_empty(" png ".into()).as_deref(), Some("png"));
    }
}
