use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod service;
mod state;
mod store;
mod utils;

#[cfg(test)]
mod test_support;

use config::{Config, StoreBackend};
use db::init_db;

use crate::docs::ApiDoc;
use crate::service::meetings::HttpMeetingProvider;
use crate::state::AppState;
use crate::store::{DocumentStore, MemoryStore, MySqlStore};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const CONTACT_WARMUP_BATCH: usize = 250;

#[get("/")]
async fn index() -> impl Responder {
    "Wellness API"
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            Ok(Arc::new(MySqlStore::new(init_db(url).await?)))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; nothing survives a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store = open_store(&config).await?;
    let meetings = Arc::new(HttpMeetingProvider::new(config.meeting_api_base.clone()));
    let state = AppState::new(store, meetings, &config);

    let warmup_state = state.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_state
            .contacts
            .warm_up(&warmup_state.users, &warmup_state.teachers, CONTACT_WARMUP_BATCH)
            .await
        {
            warn!(error = ?e, "Failed to warm up contact index");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(state.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
