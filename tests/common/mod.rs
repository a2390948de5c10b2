#![allow(dead_code)]

use async_trait::async_trait;
use imagegen_relay::{
    config::{Config, OpenAiConfig},
    error::{Result, UpstreamError},
    models::{EditRequest, GenerationRequest, HealthReport, ImageOutput},
    producer::ImageProducer,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
enum Behavior {
    Succeed,
    Fail(UpstreamError),
    Hang,
}

/// Producer double that counts every call it receives.
pub struct MockProducer {
    calls: AtomicUsize,
    behavior: Behavior,
}

impl MockProducer {
    pub fn succeeding() -> Arc<Self> {
        Self::with(Behavior::Succeed)
    }

    pub fn failing(err: UpstreamError) -> Arc<Self> {
        Self::with(Behavior::Fail(err))
    }

    /// Never resolves.
    pub fn hanging() -> Arc<Self> {
        Self::with(Behavior::Hang)
    }

    fn with(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            behavior,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<ImageOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed => Ok(ImageOutput {
                image_data: "AA".to_string(),
                usage: None,
            }),
            Behavior::Fail(err) => Err(err.clone().into()),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl ImageProducer for MockProducer {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<ImageOutput> {
        self.respond().await
    }

    async fn edit(&self, _request: &EditRequest) -> Result<ImageOutput> {
        self.respond().await
    }

    async fn health_check(&self) -> Result<HealthReport> {
        self.respond().await?;
        Ok(HealthReport::from_model_ids(&["gpt-image-1".to_string()], 1))
    }
}

pub fn configured() -> Config {
    Config::new().with_openai(OpenAiConfig::new().with_api_key("sk-test-key"))
}

pub fn configured_with_deadline(deadline: Duration) -> Config {
    Config::new().with_openai(
        OpenAiConfig::new()
            .with_api_key("sk-test-key")
            .with_timeout(deadline),
    )
}

pub fn png_bytes() -> Vec<u8> {
    b"\x89PNG\r\n\x1a\nfake".to_vec()
}

/// Hand-assembled `multipart/form-data` body.
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "relay-test-boundary".to_string(),
            buf: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.buf,
        )
    }
}
