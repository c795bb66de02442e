mod config;
mod error;
mod models;
mod retrieval;
mod routes;
mod services;
mod utils;

#[cfg(test)]
mod test_utils;

use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{Compress, Logger, NormalizePath},
    web, App, HttpResponse, HttpServer,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::retrieval::EmbeddingFactory;
use crate::routes::create_routes;
use crate::services::{LlmFactory, SessionContext};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    // One session per process; every handler serializes on this lock
    pub session: Arc<Mutex<SessionContext>>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting rag-chat");

    let config = Arc::new(Config::from_env()?);
    info!(
        "Configuration loaded: data_dir={}, index={}",
        config.data_dir.display(),
        config.index_path().display()
    );

    let embedder = EmbeddingFactory::from_config(&config)?;
    let llm = LlmFactory::from_config(&config)?;

    let mut session = SessionContext::new(config.clone(), embedder, llm);
    match session.initialize().await {
        Ok(state) => info!("Session ready: {:?}", state),
        Err(e) => error!("Index not available at startup: {}", e),
    }

    let state = web::Data::new(AppState {
        config: config.clone(),
        session: Arc::new(Mutex::new(session)),
    });

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    let cors_allow_origin = config.cors_allow_origin.clone();

    info!("Server running at http://{}", addr);

    HttpServer::new(move || {
        let cors = if cors_allow_origin == "*" {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600)
        } else {
            let mut cors = Cors::default();
            for origin in cors_allow_origin.split(',').map(|s| s.trim()) {
                cors = cors.allowed_origin(origin);
            }
            cors.allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
                .max_age(3600)
        };

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .route("/health", web::get().to(health_check))
            .service(web::scope("/api").configure(create_routes))
            .configure(routes::frontend::create_routes)
    })
    // Index builds and model calls can take minutes
    .client_request_timeout(std::time::Duration::from_secs(300))
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": true }))
}
