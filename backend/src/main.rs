mod classifier;
mod config;
mod error;
mod pipeline;
mod routes;
mod security;
mod upload;

use actix_web::{App, HttpServer, web};
use classifier::ModelHandle;
use config::AppConfig;
use pipeline::PredictionPipeline;
use routes::{RouteLimits, ServiceInfo, configure_routes, not_found};
use security::audit::{AuditLog, AuditSink};
use security::csrf::{CsrfProtect, CsrfTokens};
use security::headers::security_headers;
use security::rate_limit::ClientRateLimiter;
use std::io::{Error, ErrorKind};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))?;

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let static_dir = if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        format!("{}/static", manifest_dir)
    } else {
        "static".to_string()
    };

    std::fs::create_dir_all(&config.upload_folder)?;

    log::info!(
        "Loading model {} from {} ({} label set)",
        config.model_name,
        config.model_path.display(),
        config.label_policy
    );
    let model = Arc::new(ModelHandle::load(&config.model_path, config.label_policy));
    if !model.is_loaded() {
        log::warn!("Serving without a model; every prediction will fail until restart");
    }

    let pipeline = PredictionPipeline::new(
        model,
        config.upload_folder.clone(),
        config.expose_raw_scores,
    );
    let csrf = Arc::new(
        CsrfTokens::new(&config.secret_key)
            .map_err(|e| Error::new(ErrorKind::InvalidInput, format!("Invalid SECRET_KEY: {}", e)))?,
    );
    let audit = Arc::new(AuditSink::open(&config.security_log).await?);
    let limits = RouteLimits {
        index: Arc::new(ClientRateLimiter::new(config.index_quota)),
        predict: Arc::new(ClientRateLimiter::new(config.predict_quota)),
    };
    let model_name = config.model_name.clone();

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let limits = limits.clone();
        let static_dir = static_dir.clone();
        App::new()
            .wrap(CsrfProtect::new(csrf.clone()).exempt("/predict"))
            .wrap(AuditLog::new(audit.clone()))
            .wrap(security_headers())
            .app_data(web::Data::new(pipeline.clone()))
            .app_data(web::Data::from(csrf.clone()))
            .app_data(web::Data::new(ServiceInfo {
                model_name: model_name.clone(),
            }))
            .configure(move |cfg| configure_routes(cfg, limits, static_dir))
            .default_service(web::to(not_found))
    })
    .bind(&bind_address)?
    .run()
    .await
}
