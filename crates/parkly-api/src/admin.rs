use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use parkly_types::api::{Claims, CreateSlotRequest, UpdateSlotRequest};
use parkly_types::{Capability, ParkingSlot, VehicleEntry};

use crate::app::{AppState, run_db};
use crate::error::{ApiError, ApiResult};
use crate::middleware::require_capability;

const MAX_LABEL_LEN: usize = 32;

pub async fn create_slot(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateSlotRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let actor = require_capability(&claims, Capability::ManageSlots)?;
    let label = validate_label(&req.label)?;

    let slot = run_db(&state, move |db| db.create_slot(&label)).await?;
    info!("Slot {} ({}) created by {}", slot.label, slot.id, actor.id);

    Ok((StatusCode::CREATED, Json(slot)))
}

pub async fn update_slot(
    State(state): State<AppState>,
    WithRejection(Path(slot_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateSlotRequest>, ApiError>,
) -> ApiResult<Json<ParkingSlot>> {
    require_capability(&claims, Capability::ManageSlots)?;
    let label = req.label.as_deref().map(validate_label).transpose()?;
    let status = req.status;

    let slot = run_db(&state, move |db| {
        db.update_slot(slot_id, label.as_deref(), status)
    })
    .await?;

    Ok(Json(slot))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    WithRejection(Path(slot_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    require_capability(&claims, Capability::ManageSlots)?;
    run_db(&state, move |db| db.delete_slot(slot_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<VehicleEntry>>> {
    require_capability(&claims, Capability::ManageEntries)?;
    let entries = run_db(&state, |db| db.list_entries()).await?;
    Ok(Json(entries))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    WithRejection(Path(entry_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    require_capability(&claims, Capability::ManageEntries)?;
    run_db(&state, move |db| db.delete_entry(entry_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_label(raw: &str) -> ApiResult<String> {
    let label = raw.trim();
    if label.is_empty() || label.chars().count() > MAX_LABEL_LEN {
        return Err(ApiError::BadRequest(format!(
            "Slot label must be 1-{} characters",
            MAX_LABEL_LEN
        )));
    }
    Ok(label.to_string())
}
