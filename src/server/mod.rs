pub mod bridge;
pub mod handlers;
pub mod multipart;

use crate::{config::Config, producer::ImageProducer};
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;

/// Largest JSON body `POST /api/generate` will buffer.
pub const MAX_JSON_BODY: usize = 1024 * 1024;

/// Read-only state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub producer: Arc<dyn ImageProducer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, producer: Arc<dyn ImageProducer>) -> Self {
        Self {
            producer,
            config: Arc::new(config),
        }
    }

    pub fn upstream_deadline(&self) -> Duration {
        self.config.openai.timeout
    }
}

/// Register the `/api` routes. Used by [`run`] and by tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/generate", web::post().to(handlers::generate))
            .route("/edit", web::post().to(handlers::edit))
            .route("/health-check", web::get().to(handlers::health_check))
            .route("/test-openai", web::get().to(handlers::health_check)),
    );
}

pub async fn run(state: AppState) -> std::io::Result<()> {
    let host = state.config.host.clone();
    let port = state.config.port_or_default();
    let data = web::Data::new(state);

    log::info!("🌐 Listening on http://{}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
