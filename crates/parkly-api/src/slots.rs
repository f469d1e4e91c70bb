use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use parkly_types::ParkingSlot;
use parkly_types::api::{Claims, DashboardResponse};

use crate::app::{AppState, run_db};
use crate::error::{ApiError, ApiResult};

pub async fn list_slots(State(state): State<AppState>) -> ApiResult<Json<Vec<ParkingSlot>>> {
    let slots = run_db(&state, |db| db.list_slots()).await?;
    Ok(Json(slots))
}

pub async fn list_available_slots(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ParkingSlot>>> {
    let slots = run_db(&state, |db| db.list_available_slots()).await?;
    Ok(Json(slots))
}

/// GET /dashboard: every slot plus the caller's own entries.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<DashboardResponse>> {
    let user_id = claims.sub;
    let (slots, entries) = run_db(&state, move |db| {
        Ok((db.list_slots()?, db.list_entries_for_user(user_id)?))
    })
    .await?;

    Ok(Json(DashboardResponse { slots, entries }))
}

/// POST /slots/{slot_id}/reserve: opens an entry for the caller.
pub async fn reserve(
    State(state): State<AppState>,
    WithRejection(Path(slot_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub;
    let entry = run_db(&state, move |db| db.reserve(user_id, slot_id)).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}
