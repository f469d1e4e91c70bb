use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Actor, ParkingSlot, Role, SlotStatus, VehicleEntry};

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
/// The core trusts `sub` and `role` as the caller's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Actor {
            id: claims.sub,
            role: claims.role,
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Booking --

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub slots: Vec<ParkingSlot>,
    pub entries: Vec<VehicleEntry>,
}

// -- Admin --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSlotRequest {
    pub label: String,
}

/// Both fields optional; omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSlotRequest {
    pub label: Option<String>,
    pub status: Option<SlotStatus>,
}
