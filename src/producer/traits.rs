use crate::{
    error::Result,
    models::{EditRequest, GenerationRequest, HealthReport, ImageOutput},
};
use async_trait::async_trait;

/// Anything that can turn a validated request into an image.
///
/// Implementations hold no per-request state and are shared across
/// concurrent requests behind an `Arc`.
#[async_trait]
pub trait ImageProducer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageOutput>;

    async fn edit(&self, request: &EditRequest) -> Result<ImageOutput>;

    async fn health_check(&self) -> Result<HealthReport>;
}
