// src/main.rs
use afit_packer::api;
use afit_packer::config::{AppConfig, LogConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();
    LogConfig::from_env().init_subscriber();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("Konnte .env nicht laden: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let optimizer_config = app_config.optimizer.clone();

    info!("Packing Service startet...");
    if let Err(err) = api::start_api_server(api_config, optimizer_config).await {
        error!("API server terminated with an error: {err}");
        std::process::exit(1);
    }
}
