pub mod client;
pub mod config;
pub mod cost;
pub mod error;
pub mod logger;
pub mod models;
pub mod openai;
pub mod producer;
#[cfg(feature = "server")]
pub mod server;
pub mod validation;

pub use client::{RelayClient, StreamCallbacks, StreamPolicy};
pub use config::{ClientConfig, Config, OpenAiConfig, UploadLimits};
pub use error::{ErrorBody, RelayError, Result, UpstreamError, ValidationError};
pub use models::*;
pub use openai::OpenAiClient;
pub use producer::{build_producer, DemoImageProducer, ImageProducer};
