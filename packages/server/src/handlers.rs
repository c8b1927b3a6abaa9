//! HTTP handler functions for the epi map API.
//!
//! Handlers answer from the store and then enqueue the requested countries
//! for a background refresh without waiting for it.

use actix_web::{HttpResponse, web};
use epi_map_analytics::{color, readers, timeseries};
use epi_map_server_models::{
    ApiError, ApiHealth, CountriesBody, MaxQuery, SeedResponse, StatusResponse,
};

use crate::AppState;

const COUNTRIES_REQUIRED: &str = "countries array is required";

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn internal_error(context: &str, e: &dyn std::fmt::Display) -> HttpResponse {
    log::error!("{context}: {e}");
    HttpResponse::InternalServerError().json(ApiError::new(context))
}

/// `GET /api/covid/country/{name}?max=`
///
/// Returns the stored snapshot (or a zero-value placeholder) and schedules
/// a refresh of the country.
pub async fn country(
    state: web::Data<AppState>,
    name: web::Path<String>,
    query: web::Query<MaxQuery>,
) -> HttpResponse {
    let name = name.into_inner();

    match readers::get_one(state.store.as_ref(), &name, query.max).await {
        Ok(dto) => {
            state.queue.enqueue([name.as_str()]);
            HttpResponse::Ok().json(dto)
        }
        Err(e) => internal_error("Failed to fetch country data", &e),
    }
}

/// `POST /api/covid/batch`
///
/// Returns snapshots colored relative to the batch maximum and schedules a
/// refresh of every requested country.
pub async fn batch(state: web::Data<AppState>, body: web::Json<CountriesBody>) -> HttpResponse {
    let CountriesBody { countries } = body.into_inner();
    if countries.is_empty() {
        return HttpResponse::BadRequest().json(ApiError::new(COUNTRIES_REQUIRED));
    }

    match readers::get_batch(state.store.as_ref(), &countries).await {
        Ok(result) => {
            state.queue.enqueue(&countries);
            HttpResponse::Ok().json(result)
        }
        Err(e) => internal_error("Failed to fetch batch data", &e),
    }
}

/// `GET /api/covid/legend?max=`
pub async fn legend(query: web::Query<MaxQuery>) -> HttpResponse {
    HttpResponse::Ok().json(color::legend(query.max))
}

/// `POST /api/covid/seed`
///
/// Enqueues the countries and answers `202 Accepted` immediately.
pub async fn seed(state: web::Data<AppState>, body: web::Json<CountriesBody>) -> HttpResponse {
    let CountriesBody { countries } = body.into_inner();
    let canonical = epi_map_geography::normalize_all(&countries);
    if canonical.is_empty() {
        return HttpResponse::BadRequest().json(ApiError::new(COUNTRIES_REQUIRED));
    }

    let added = state.queue.enqueue(&canonical);
    log::info!(
        "Seed requested for {} countries ({added} newly queued)",
        canonical.len()
    );

    HttpResponse::Accepted().json(SeedResponse {
        message: "Seed started".to_string(),
        count: canonical.len(),
    })
}

/// `GET /api/covid/status`
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let count = match state.store.count().await {
        Ok(count) => count,
        Err(e) => return internal_error("Failed to get status", &e),
    };
    let last_updated_at = match state.store.latest_update().await {
        Ok(latest) => latest,
        Err(e) => return internal_error("Failed to get status", &e),
    };

    HttpResponse::Ok().json(StatusResponse {
        count,
        last_updated_at,
        pending: state.queue.pending_len(),
        draining: state.queue.is_draining(),
    })
}

/// `GET /api/covid/timeseries/{name}`
///
/// Returns the series rebuilt from the stored payload and schedules a
/// refresh of the country.
pub async fn time_series(state: web::Data<AppState>, name: web::Path<String>) -> HttpResponse {
    let name = name.into_inner();

    match timeseries::build_series(state.store.as_ref(), &name).await {
        Ok(response) => {
            state.queue.enqueue([name.as_str()]);
            HttpResponse::Ok().json(response)
        }
        Err(e) => internal_error("Failed to get time series", &e),
    }
}
