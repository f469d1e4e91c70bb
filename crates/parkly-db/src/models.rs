//! Database row types. These map directly to SQLite rows and are converted
//! into the parkly-types records at the edge of this crate.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use parkly_types::{ParkingSlot, Role, User, VehicleEntry};
use uuid::Uuid;

use crate::error::{ParkingError, ParkingResult};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct SlotRow {
    pub id: String,
    pub label: String,
    pub status: String,
    pub created_at: String,
}

pub struct EntryRow {
    pub id: String,
    pub user_id: String,
    pub slot_id: String,
    pub entry_time: String,
    pub exit_time: Option<String>,
}

impl UserRow {
    pub fn role(&self) -> ParkingResult<Role> {
        self.role
            .parse()
            .map_err(|e| ParkingError::Corrupt(format!("user {}: {}", self.id, e)))
    }

    pub fn into_user(self) -> ParkingResult<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            role: self.role()?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
        })
    }
}

impl SlotRow {
    pub fn into_slot(self) -> ParkingResult<ParkingSlot> {
        Ok(ParkingSlot {
            id: parse_id(&self.id)?,
            status: self
                .status
                .parse()
                .map_err(|e| ParkingError::Corrupt(format!("slot {}: {}", self.id, e)))?,
            created_at: parse_timestamp(&self.created_at)?,
            label: self.label,
        })
    }
}

impl EntryRow {
    pub fn into_entry(self) -> ParkingResult<VehicleEntry> {
        Ok(VehicleEntry {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            slot_id: parse_id(&self.slot_id)?,
            entry_time: parse_timestamp(&self.entry_time)?,
            exit_time: self.exit_time.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

/// Current time in the format every timestamp column is written with.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_id(raw: &str) -> ParkingResult<Uuid> {
    raw.parse()
        .map_err(|e| ParkingError::Corrupt(format!("id '{}': {}", raw, e)))
}

fn parse_timestamp(raw: &str) -> ParkingResult<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through the sqlite shell use datetime('now').
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| ParkingError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

pub(crate) fn collect_slots(rows: Vec<SlotRow>) -> ParkingResult<Vec<ParkingSlot>> {
    rows.into_iter().map(SlotRow::into_slot).collect()
}

pub(crate) fn collect_entries(rows: Vec<EntryRow>) -> ParkingResult<Vec<VehicleEntry>> {
    rows.into_iter().map(EntryRow::into_entry).collect()
}
