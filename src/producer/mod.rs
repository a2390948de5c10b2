pub mod demo;
pub mod traits;

use crate::{
    config::Config,
    error::{RelayError, Result},
    openai::OpenAiClient,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use demo::DemoImageProducer;
pub use traits::ImageProducer;

/// Pick the image backend once, at startup.
pub fn build_producer(config: &Config) -> Result<Arc<dyn ImageProducer>> {
    let producer: Arc<dyn ImageProducer> = if config.demo_mode {
        log::warn!("DEMO_MODE is enabled, upstream calls are replaced by sample output");
        Arc::new(DemoImageProducer::new())
    } else {
        // A missing key is not fatal here: each request answers with the
        // configuration error instead.
        if config.openai.api_key.is_none() {
            log::error!("OPENAI_API_KEY is not set, requests will fail until it is configured");
        }
        Arc::new(OpenAiClient::new(config.openai.clone())?)
    };

    log::info!("Image producer: {}", producer.name());
    Ok(producer)
}

/// Bound a producer call. Expiry abandons the local wait; whatever the
/// upstream already started is not cancelled remotely.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            log::error!("Upstream call exceeded {:?}", deadline);
            Err(RelayError::timeout(deadline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_expires_on_pending_future() {
        let result: Result<()> =
            with_deadline(Duration::from_millis(20), std::future::pending()).await;
        assert!(matches!(result, Err(RelayError::Timeout(_))));
    }

    #[tokio::test]
    async fn deadline_passes_through_results() {
        let ok = with_deadline(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[test]
    fn demo_mode_selects_demo_producer() {
        let producer = build_producer(&Config::new().with_demo_mode(true)).unwrap();
        assert_eq!(producer.name(), "demo");
    }

    #[test]
    fn missing_key_still_builds_openai_producer() {
        let producer = build_producer(&Config::new()).unwrap();
        assert_eq!(producer.name(), "openai");
    }
}
