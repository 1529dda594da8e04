mod cache;
mod config;
mod inference;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware::Logger, web};
use cache::model_provider::{ModelProvider, TorchLoader};
use config::AppConfig;
use routes::configure_routes;
use std::env;
use storage::drive_service::DriveService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return Err(std::io::Error::other(format!("Configuration error: {e}")));
        }
    };

    let drive = DriveService::new(&config.model.download_url).map_err(|e| {
        log::error!("Invalid model download URL: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let provider = ModelProvider::new(config.model.clone(), drive, TorchLoader);
    let classifier = match provider.ensure_model_available().await {
        Ok(classifier) => classifier,
        Err(e) => {
            log::error!("Failed to load model at startup: {}", e);
            return Err(std::io::Error::other(format!("Model loading failed: {e}")));
        }
    };

    let frontend_dir = config.server.frontend_dir.clone();
    let bind_address = (config.server.host.clone(), config.server.port);
    log::info!("Starting server on {}:{}", bind_address.0, bind_address.1);

    let classifier = web::Data::from(classifier);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(classifier.clone())
            .app_data(config.clone())
            .configure(configure_routes)
            .service(Files::new("/", frontend_dir.clone()).index_file("index.html"))
    })
    .bind(bind_address)?
    .run()
    .await
}
