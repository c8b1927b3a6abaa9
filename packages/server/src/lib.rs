#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the epi map dashboard.
//!
//! Serves country snapshots, batch snapshots, legend metadata, and time
//! series from the country store under `/api/covid`. Reads never wait on
//! the upstream provider: each request enqueues its countries on the shared
//! [`RefreshQueue`], and a [`Scheduler`] re-enqueues every known country on
//! a fixed interval.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use epi_map_database::{CountryStore, DuckDbCountryStore};
use epi_map_refresh::{RefreshOptions, RefreshQueue, Scheduler};
use epi_map_source::api_ninjas::ApiNinjasClient;

pub use config::{ServerConfig, ServerError};

/// Shared application state.
pub struct AppState {
    /// Country record store.
    pub store: Arc<dyn CountryStore>,
    /// Background refresh queue, shared with the scheduler.
    pub queue: Arc<RefreshQueue>,
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/covid")
                    .route("/country/{name}", web::get().to(handlers::country))
                    .route("/batch", web::post().to(handlers::batch))
                    .route("/legend", web::get().to(handlers::legend))
                    .route("/seed", web::post().to(handlers::seed))
                    .route("/status", web::get().to(handlers::status))
                    .route("/timeseries/{name}", web::get().to(handlers::time_series)),
            ),
    );
}

/// Starts the epi map API server.
///
/// Reads [`ServerConfig`] from the environment, opens the country store,
/// builds the upstream client and refresh queue, starts the scheduler, and
/// runs the Actix-Web HTTP server. This is a regular async function: the
/// caller provides the runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if configuration is invalid, the store cannot be
/// opened, or the HTTP server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env()?;

    log::info!("Opening country store at {}...", config.db_path.display());
    let store: Arc<dyn CountryStore> = Arc::new(DuckDbCountryStore::open(&config.db_path)?);

    let fetcher = ApiNinjasClient::new(config.api_url.clone(), config.api_key.clone())?;
    if !fetcher.has_api_key() {
        log::warn!("API_NINJAS_KEY is not set; refreshes will record a configuration error");
    }

    let queue = RefreshQueue::new(
        Arc::new(fetcher),
        store.clone(),
        RefreshOptions {
            gap: config.request_gap,
        },
    )?;

    let scheduler = Scheduler::new(queue.clone());
    scheduler.start(config.refresh_interval);

    let state = web::Data::new(AppState { store, queue });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.clone(), config.port))?
    .run()
    .await?;

    Ok(())
}
