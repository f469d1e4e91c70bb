use std::sync::Arc;

use axum::{
    Json, Router,
    middleware,
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use parkly_db::{Database, ParkingResult};

use crate::error::{ApiError, ApiResult};
use crate::middleware::require_auth;
use crate::{admin, auth, entries, slots};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Builds the full router: public auth routes plus everything behind the JWT middleware.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/me", get(auth::profile))
        .route("/dashboard", get(slots::dashboard))
        .route("/slots", get(slots::list_slots))
        .route("/slots/available", get(slots::list_available_slots))
        .route("/slots/{slot_id}/reserve", post(slots::reserve))
        .route("/entries", get(entries::list_own_entries))
        .route("/entries/{entry_id}/release", post(entries::release))
        .route("/admin/slots", post(admin::create_slot))
        .route(
            "/admin/slots/{slot_id}",
            patch(admin::update_slot).delete(admin::delete_slot),
        )
        .route("/admin/entries", get(admin::list_entries))
        .route("/admin/entries/{entry_id}", delete(admin::delete_entry))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Runs a blocking store call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ParkingResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
