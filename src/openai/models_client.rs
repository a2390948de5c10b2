use crate::{
    error::{RelayError, Result},
    models::HealthReport,
    openai::{transport::Transport, types::ModelList},
};
use std::time::Instant;

#[derive(Clone)]
pub struct ModelsClient {
    transport: Transport,
}

impl ModelsClient {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        let response = self
            .transport
            .send("List models", || self.transport.get("models"))
            .await?;
        let models: ModelList = response
            .json()
            .await
            .map_err(|e| RelayError::Parse(format!("Invalid models response: {}", e)))?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    /// Time a models listing as a reachability and credential probe.
    pub async fn probe(&self) -> Result<HealthReport> {
        if let Some(fp) = self.transport.config().key_fingerprint() {
            log::info!("Testing OpenAI API with key {}", fp);
        }
        let started = Instant::now();
        let ids = self.list().await?;
        let elapsed = started.elapsed().as_millis();
        log::info!("OpenAI API reachable: {} models in {}ms", ids.len(), elapsed);
        Ok(HealthReport::from_model_ids(&ids, elapsed))
    }
}
