use crate::{
    error::{RelayError, Result, UpstreamError},
    logger,
    models::{EditRequest, GenerationRequest, ImageOutput, UploadedImage},
    openai::{
        payload::{edit_fields, generation_payload},
        transport::Transport,
        types::ImagesResponse,
    },
};
use base64::Engine;
use reqwest::multipart::{Form, Part};

#[derive(Clone)]
pub struct ImageClient {
    transport: Transport,
}

impl ImageClient {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<ImageOutput> {
        let payload = generation_payload(request);
        log::info!(
            "Generating image with model: {} quality={} size={} format={} transparent={} prompt='{}'",
            request.model,
            request.quality,
            request.size,
            request.output_format,
            request.params.transparent(),
            request.prompt_preview()
        );

        let timer = logger::timer("images/generations");
        let response = self
            .transport
            .send("Image generation", || {
                Ok(self.transport.post("images/generations")?.json(&payload))
            })
            .await?;
        let images: ImagesResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Parse(format!("Invalid image generation response: {}", e)))?;
        timer.stop();

        self.into_output(images).await
    }

    pub async fn edit(&self, request: &EditRequest) -> Result<ImageOutput> {
        log::info!(
            "Editing image with model: {} images={} mask={} prompt='{}'",
            request.base.model,
            request.image_count(),
            request.mask.is_some(),
            request.base.prompt_preview()
        );

        let timer = logger::timer("images/edits");
        let response = self
            .transport
            .send("Image edit", || {
                Ok(self.transport.post("images/edits")?.multipart(edit_form(request)?))
            })
            .await?;
        let images: ImagesResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Parse(format!("Invalid image edit response: {}", e)))?;
        timer.stop();

        self.into_output(images).await
    }

    async fn into_output(&self, images: ImagesResponse) -> Result<ImageOutput> {
        let usage = images.usage.map(Into::into);
        let first = images
            .data
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::new("No image was generated"))?;

        let image_data = match (first.b64_json, first.url) {
            (Some(b64), _) if !b64.is_empty() => b64,
            (_, Some(url)) => self.download_as_base64(&url).await?,
            _ => return Err(UpstreamError::new("No image was generated").into()),
        };

        if let Some(usage) = &usage {
            log::debug!("Usage information: {:?}", usage);
        }

        Ok(ImageOutput { image_data, usage })
    }

    async fn download_as_base64(&self, url: &str) -> Result<String> {
        log::debug!("Fetching generated image from URL");
        let response = self.transport.http().get(url).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::new("Failed to download generated image")
                .with_status(response.status().as_u16())
                .into());
        }
        let bytes = response.bytes().await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

fn edit_form(request: &EditRequest) -> Result<Form> {
    let mut form = Form::new();
    for (key, value) in edit_fields(request) {
        form = form.text(key, value);
    }
    for (i, image) in request.images().enumerate() {
        form = form.part("image[]", file_part(image, &format!("image-{}", i))?);
    }
    if let Some(mask) = &request.mask {
        form = form.part("mask", file_part(mask, "mask")?);
    }
    Ok(form)
}

fn file_part(image: &UploadedImage, fallback_stem: &str) -> Result<Part> {
    let file_name = image.file_name.clone().unwrap_or_else(|| {
        let ext = image
            .declared_type()
            .rsplit('/')
            .next()
            .unwrap_or("png")
            .to_string();
        format!("{}.{}", fallback_stem, ext)
    });
    Ok(Part::bytes(image.data.to_vec())
        .file_name(file_name)
        .mime_str(image.declared_type())?)
}
