pub mod image_client;
pub mod models_client;
pub mod payload;
pub mod transport;
pub mod types;

use crate::{
    config::OpenAiConfig,
    error::Result,
    models::{EditRequest, GenerationRequest, HealthReport, ImageOutput},
    producer::ImageProducer,
};
use async_trait::async_trait;

pub use image_client::ImageClient;
pub use models_client::ModelsClient;
pub use transport::Transport;

/// The real upstream: OpenAI's images and models endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    image_client: ImageClient,
    models_client: ModelsClient,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let transport = Transport::new(config)?;
        Ok(Self {
            image_client: ImageClient::new(transport.clone()),
            models_client: ModelsClient::new(transport),
        })
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn models(&self) -> &ModelsClient {
        &self.models_client
    }
}

#[async_trait]
impl ImageProducer for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageOutput> {
        self.image_client.generate(request).await
    }

    async fn edit(&self, request: &EditRequest) -> Result<ImageOutput> {
        self.image_client.edit(request).await
    }

    async fn health_check(&self) -> Result<HealthReport> {
        self.models_client.probe().await
    }
}
