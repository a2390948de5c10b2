use crate::{
    error::Result,
    models::{EditRequest, GenerationRequest, HealthReport, ImageOutput},
    producer::traits::ImageProducer,
};
use async_trait::async_trait;

/// 1x1 transparent PNG.
pub const SAMPLE_IMAGE_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Returns a fixed sample image without touching the network.
#[derive(Debug, Clone, Default)]
pub struct DemoImageProducer;

impl DemoImageProducer {
    pub fn new() -> Self {
        Self
    }

    fn sample(&self) -> ImageOutput {
        ImageOutput {
            image_data: SAMPLE_IMAGE_B64.to_string(),
            usage: None,
        }
    }
}

#[async_trait]
impl ImageProducer for DemoImageProducer {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageOutput> {
        log::info!("Demo mode: returning sample image for '{}'", request.prompt_preview());
        Ok(self.sample())
    }

    async fn edit(&self, request: &EditRequest) -> Result<ImageOutput> {
        log::info!(
            "Demo mode: returning sample edit for '{}' ({} images)",
            request.base.prompt_preview(),
            request.image_count()
        );
        Ok(self.sample())
    }

    async fn health_check(&self) -> Result<HealthReport> {
        Ok(HealthReport {
            success: true,
            message: "Demo mode is active; upstream is not contacted".to_string(),
            response_time: "0ms".to_string(),
            models_count: 0,
            has_gpt_image1: false,
            first_few_models: Vec::new(),
        })
    }
}
