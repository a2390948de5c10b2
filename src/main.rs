use imagegen_relay::{
    build_producer,
    config::Config,
    logger,
    models::ImageModel,
    server::{self, AppState},
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init()?;
    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port_or_default(),
    );
    logger::log_config_info(&config);

    log::info!("🖼️  Supported image models:");
    for (id, name) in ImageModel::supported_models() {
        log::info!("  {} - {}", id, name);
    }

    let producer = match build_producer(&config) {
        Ok(producer) => producer,
        Err(e) => {
            log::error!("❌ Failed to initialize image producer: {}", e);
            return Err(e.into());
        }
    };

    server::run(AppState::new(config, producer)).await?;
    log::info!("👋 Server stopped");
    Ok(())
}
