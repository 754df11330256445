use std::process::ExitCode;

use plot_sampler::api::{create_router, AppState};
use plot_sampler::Config;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => match Config::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let bind = config.server.bind.clone();
    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", bind, e);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Plot sampler API listening on http://{}", bind);
    log::info!("  GET  /api/health");
    log::info!("  GET  /api/sample?latitude=<lat>&longitude=<lon>&radius_ft=<ft>&samples=<n>");
    log::info!("  POST /api/upload (multipart/form-data: csv, radius_ft, samples, seed)");
    log::info!("  POST /api/extract (multipart/form-data: csv, dataset, start_date, end_date, aggregate)");

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
