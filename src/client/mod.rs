//! HTTP client for the relay's own API, with the same validation and cost
//! tables the server uses.

pub mod stream;

use crate::{
    config::{ClientConfig, UploadLimits},
    error::{Constraint, ErrorBody, ErrorKind, RelayError, Result, UpstreamError, ValidationError},
    models::{
        EditForm, EditResponse, GenerateBody, GenerateResponse, HealthReport, OutputFormat,
        UploadedImage,
    },
    validation::{validate_edit, validate_generate},
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::future::Future;

pub use crate::cost::{estimate, estimate_edit, format_cost};
pub use stream::{consume_events, ConsumeSummary, LineDecoder, StreamCallbacks, StreamPolicy};

#[derive(Clone)]
pub struct RelayClient {
    http: Client,
    config: ClientConfig,
    limits: UploadLimits,
}

impl RelayClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            config,
            limits: UploadLimits::default(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Limits used by the local pre-check. Should match the server's.
    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, route: &str) -> String {
        format!("{}/api/{}", self.config.base_url, route)
    }

    pub async fn generate(&self, body: GenerateBody) -> Result<GenerateResponse> {
        let body = prepare_generate(body, false)?;
        self.bounded(async {
            let response = self.http.post(self.url("generate")).json(&body).send().await?;
            decode(response).await
        })
        .await
    }

    /// Streamed generation. Every failure, including the local timeout, is
    /// delivered through `on_error`.
    pub async fn generate_with_stream<C>(
        &self,
        body: GenerateBody,
        callbacks: &mut C,
        policy: StreamPolicy,
    ) -> ConsumeSummary
    where
        C: StreamCallbacks + ?Sized,
    {
        let body = match prepare_generate(body, true) {
            Ok(body) => body,
            Err(e) => {
                callbacks.on_error(&e.user_message());
                return ConsumeSummary {
                    aborted: true,
                    ..Default::default()
                };
            }
        };

        let outcome = self
            .bounded(self.stream_events(&body, &mut *callbacks, policy))
            .await;
        match outcome {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Streamed generation failed: {}", e);
                callbacks.on_error(&e.user_message());
                ConsumeSummary {
                    aborted: true,
                    ..Default::default()
                }
            }
        }
    }

    async fn stream_events<C>(
        &self,
        body: &GenerateBody,
        callbacks: &mut C,
        policy: StreamPolicy,
    ) -> Result<ConsumeSummary>
    where
        C: StreamCallbacks + ?Sized,
    {
        let response = self.http.post(self.url("generate")).json(body).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(consume_events(response.bytes_stream(), callbacks, policy).await)
    }

    pub async fn edit(&self, form: EditForm) -> Result<EditResponse> {
        validate_edit(form.clone(), &self.limits)?;
        let multipart = edit_form(form)?;
        self.bounded(async {
            let response = self
                .http
                .post(self.url("edit"))
                .multipart(multipart)
                .send()
                .await?;
            decode(response).await
        })
        .await
    }

    pub async fn health_check(&self) -> Result<HealthReport> {
        self.bounded(async {
            let response = self.http.get(self.url("health-check")).send().await?;
            decode(response).await
        })
        .await
    }

    /// Abandon the local wait after the configured timeout. Work already
    /// running on the server is not cancelled.
    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Relay request exceeded {:?}", self.config.timeout);
                Err(RelayError::timeout(self.config.timeout))
            }
        }
    }
}

/// Run the local pre-check and shape the wire body. `transparent` is only
/// sent when the model and format can honor it.
fn prepare_generate(mut body: GenerateBody, stream: bool) -> Result<GenerateBody> {
    let checked = validate_generate(body.clone())?;
    body.stream = stream;
    body.transparent = checked.params.transparent();
    Ok(body)
}

fn edit_form(form: EditForm) -> Result<Form> {
    let mut multipart = Form::new();
    if let Some(prompt) = form.prompt {
        multipart = multipart.text("prompt", prompt);
    }
    for (name, value) in [
        ("quality", form.quality),
        ("size", form.size),
        ("model", form.model),
    ] {
        if let Some(value) = value {
            multipart = multipart.text(name, value);
        }
    }
    let alpha = form
        .output_format
        .as_deref()
        .and_then(|f| f.parse::<OutputFormat>().ok())
        .map_or(true, |f| f.supports_alpha());
    if let Some(format) = form.output_format {
        multipart = multipart.text("outputFormat", format);
    }
    if form.transparent && alpha {
        multipart = multipart.text("transparent", "true");
    }

    if let Some(main) = form.main_image {
        multipart = multipart.part("mainImage", file_part(main, "main")?);
    }
    for (i, image) in form.component_images.into_iter().enumerate() {
        multipart = multipart.part("componentImages", file_part(image, &format!("component-{}", i))?);
    }
    if let Some(mask) = form.mask {
        multipart = multipart.part("mask", file_part(mask, "mask")?);
    }
    Ok(multipart)
}

fn file_part(image: UploadedImage, fallback_name: &str) -> Result<Part> {
    let file_name = image
        .file_name
        .clone()
        .unwrap_or_else(|| fallback_name.to_string());
    let part = Part::bytes(image.data.to_vec()).file_name(file_name);
    match image.content_type.as_deref() {
        Some(mime) => Ok(part.mime_str(mime)?),
        None => Ok(part),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RelayError::Parse(format!("Invalid response from relay: {}", e)))
}

/// Rebuild a typed error from the server's uniform error body.
async fn error_from_response(response: Response) -> RelayError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    error_from_body(status, &text)
}

fn error_from_body(status: u16, text: &str) -> RelayError {
    let body = match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => body,
        Err(_) => return UpstreamError::from_response_body(status, text).into(),
    };
    let detail_str = |key: &str| {
        body.details
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(|v| v.as_str())
            .map(String::from)
    };

    match body.kind {
        Some(ErrorKind::Configuration) => RelayError::Config(body.error),
        Some(ErrorKind::Timeout) => RelayError::Timeout(body.message.unwrap_or(body.error)),
        Some(ErrorKind::Validation) => {
            let mut extra = body.details.clone().unwrap_or_default();
            let constraint = extra
                .as_object_mut()
                .and_then(|d| d.remove("constraint"))
                .and_then(|c| serde_json::from_value::<Constraint>(c).ok())
                .unwrap_or(Constraint::Body);
            let mut err = ValidationError::new(constraint, body.error);
            if let Some(detail) = body.message {
                err = err.with_detail(detail);
            }
            if extra.as_object().map_or(false, |d| !d.is_empty()) {
                err = err.with_details(extra);
            }
            err.into()
        }
        _ => {
            let mut err = UpstreamError::new(body.error.clone()).with_status(status);
            err.error_type = detail_str("type");
            err.code = detail_str("code");
            err.into()
        }
    }
}
