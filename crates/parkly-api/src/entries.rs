use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use parkly_types::api::Claims;
use parkly_types::{Actor, VehicleEntry};

use crate::app::{AppState, run_db};
use crate::error::{ApiError, ApiResult};

pub async fn list_own_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<VehicleEntry>>> {
    let user_id = claims.sub;
    let entries = run_db(&state, move |db| db.list_entries_for_user(user_id)).await?;
    Ok(Json(entries))
}

/// POST /entries/{entry_id}/release: owners release their own entries,
/// admins may release any.
pub async fn release(
    State(state): State<AppState>,
    WithRejection(Path(entry_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<VehicleEntry>> {
    let actor = Actor::from(&claims);
    let entry = run_db(&state, move |db| db.release(actor, entry_id)).await?;
    Ok(Json(entry))
}
