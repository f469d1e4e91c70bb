use parkly_types::{ParkingSlot, Role, SlotStatus, User, VehicleEntry};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::Database;
use crate::error::{ParkingError, ParkingResult};
use crate::models::{EntryRow, SlotRow, UserRow, collect_entries, collect_slots, now_timestamp};

const SLOT_COLUMNS: &str = "id, label, status, created_at";
const ENTRY_COLUMNS: &str = "id, user_id, slot_id, entry_time, exit_time";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> ParkingResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id.to_string(), username, password_hash, role.as_str(), now_timestamp()),
            )
            .map_err(ParkingError::on_unique("username"))?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> ParkingResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> ParkingResult<Option<User>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))?
            .map(UserRow::into_user)
            .transpose()
    }

    /// Overwrites role and password of an existing account. Returns false if
    /// no such username exists.
    pub fn update_user_credentials(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> ParkingResult<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1, role = ?2 WHERE username = ?3",
                (password_hash, role.as_str(), username),
            )?;
            Ok(changed == 1)
        })
    }

    // -- Slots --

    pub fn list_slots(&self) -> ParkingResult<Vec<ParkingSlot>> {
        let rows = self.with_conn(|conn| {
            let sql = format!("SELECT {SLOT_COLUMNS} FROM parking_slots ORDER BY label");
            query_rows(conn, &sql, params![], slot_row)
        })?;
        collect_slots(rows)
    }

    pub fn list_available_slots(&self) -> ParkingResult<Vec<ParkingSlot>> {
        let rows = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SLOT_COLUMNS} FROM parking_slots WHERE status = ?1 ORDER BY label"
            );
            query_rows(conn, &sql, params![SlotStatus::Available.as_str()], slot_row)
        })?;
        collect_slots(rows)
    }

    pub fn get_slot(&self, slot_id: Uuid) -> ParkingResult<Option<ParkingSlot>> {
        self.with_conn(|conn| query_slot(conn, slot_id))?
            .map(SlotRow::into_slot)
            .transpose()
    }

    pub fn create_slot(&self, label: &str) -> ParkingResult<ParkingSlot> {
        let id = Uuid::new_v4();
        let row = self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO parking_slots (id, label, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), label, SlotStatus::Available.as_str(), now_timestamp()),
            )
            .map_err(ParkingError::on_unique("slot label"))?;
            query_slot(conn, id)?.ok_or(ParkingError::NotFound("slot"))
        })?;
        row.into_slot()
    }

    /// Creates an available slot with this label unless one already exists.
    /// Returns true if a slot was inserted.
    pub fn ensure_slot(&self, label: &str) -> ParkingResult<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO parking_slots (id, label, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                (Uuid::new_v4().to_string(), label, SlotStatus::Available.as_str(), now_timestamp()),
            )?;
            Ok(inserted == 1)
        })
    }

    // -- Entries --

    pub fn list_entries_for_user(&self, user_id: Uuid) -> ParkingResult<Vec<VehicleEntry>> {
        let rows = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ENTRY_COLUMNS} FROM vehicle_entries WHERE user_id = ?1 ORDER BY entry_time DESC"
            );
            query_rows(conn, &sql, params![user_id.to_string()], entry_row)
        })?;
        collect_entries(rows)
    }

    pub fn list_entries(&self) -> ParkingResult<Vec<VehicleEntry>> {
        let rows = self.with_conn(|conn| {
            let sql = format!("SELECT {ENTRY_COLUMNS} FROM vehicle_entries ORDER BY entry_time DESC");
            query_rows(conn, &sql, params![], entry_row)
        })?;
        collect_entries(rows)
    }

    pub fn get_entry(&self, entry_id: Uuid) -> ParkingResult<Option<VehicleEntry>> {
        self.with_conn(|conn| query_entry(conn, entry_id))?
            .map(EntryRow::into_entry)
            .transpose()
    }

    /// The open entry against a slot, if any.
    pub fn active_entry_for_slot(&self, slot_id: Uuid) -> ParkingResult<Option<VehicleEntry>> {
        self.with_conn(|conn| query_active_entry(conn, slot_id))?
            .map(EntryRow::into_entry)
            .transpose()
    }
}

// `column` is always a literal from this module, never caller input.
fn query_user(conn: &Connection, column: &str, value: &str) -> ParkingResult<Option<UserRow>> {
    let sql = format!("SELECT id, username, password, role, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                role: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

pub(crate) fn query_slot(conn: &Connection, slot_id: Uuid) -> ParkingResult<Option<SlotRow>> {
    let sql = format!("SELECT {SLOT_COLUMNS} FROM parking_slots WHERE id = ?1");
    conn.query_row(&sql, [slot_id.to_string()], slot_row).optional()
}

pub(crate) fn query_entry(conn: &Connection, entry_id: Uuid) -> ParkingResult<Option<EntryRow>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM vehicle_entries WHERE id = ?1");
    conn.query_row(&sql, [entry_id.to_string()], entry_row).optional()
}

pub(crate) fn query_active_entry(conn: &Connection, slot_id: Uuid) -> ParkingResult<Option<EntryRow>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM vehicle_entries WHERE slot_id = ?1 AND exit_time IS NULL"
    );
    conn.query_row(&sql, [slot_id.to_string()], entry_row).optional()
}

fn query_rows<P, T, F>(conn: &Connection, sql: &str, params: P, map: F) -> ParkingResult<Vec<T>>
where
    P: rusqlite::Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn slot_row(row: &Row<'_>) -> rusqlite::Result<SlotRow> {
    Ok(SlotRow {
        id: row.get(0)?,
        label: row.get(1)?,
        status: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn entry_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        slot_id: row.get(2)?,
        entry_time: row.get(3)?,
        exit_time: row.get(4)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> ParkingResult<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> ParkingResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_round_trip_and_duplicate_username() {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        db.create_user(id, "alice", "hash", Role::User).unwrap();

        let row = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(row.password, "hash");
        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::User);

        let dup = db.create_user(Uuid::new_v4(), "alice", "other", Role::User);
        assert!(matches!(dup, Err(ParkingError::Conflict("username"))));
        assert!(db.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn update_user_credentials_promotes_existing_account() {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        db.create_user(id, "admin", "old", Role::User).unwrap();

        assert!(db.update_user_credentials("admin", "new", Role::Admin).unwrap());
        assert!(!db.update_user_credentials("ghost", "new", Role::Admin).unwrap());

        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn available_listing_filters_by_status() {
        let db = Database::open_in_memory().unwrap();
        let b = db.create_slot("B2").unwrap();
        let a = db.create_slot("A1").unwrap();
        assert_eq!(a.status, SlotStatus::Available);

        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE parking_slots SET status = 'occupied' WHERE id = ?1",
                [b.id.to_string()],
            )?;
            Ok(())
        })
        .unwrap();

        let all: Vec<String> = db.list_slots().unwrap().into_iter().map(|s| s.label).collect();
        assert_eq!(all, vec!["A1", "B2"]);

        let free = db.list_available_slots().unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, a.id);
    }

    #[test]
    fn duplicate_slot_label_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.create_slot("A1").unwrap();
        assert!(matches!(
            db.create_slot("A1"),
            Err(ParkingError::Conflict("slot label"))
        ));
        assert!(!db.ensure_slot("A1").unwrap());
        assert!(db.ensure_slot("A2").unwrap());
        assert_eq!(db.list_slots().unwrap().len(), 2);
    }
}
