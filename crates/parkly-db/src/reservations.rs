//! Slot/entry lifecycle. Every transition runs in one immediate transaction:
//! the write lock is taken before the slot status is read, so two requests
//! for the same slot cannot both observe it as available.

use parkly_types::{Actor, Capability, ParkingSlot, SlotStatus, VehicleEntry};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Database;
use crate::error::{ParkingError, ParkingResult};
use crate::models::{EntryRow, now_timestamp};
use crate::queries::{OptionalExt, query_active_entry, query_entry, query_slot};

impl Database {
    /// Claims an available slot for `user_id` and opens an entry on it.
    pub fn reserve(&self, user_id: Uuid, slot_id: Uuid) -> ParkingResult<VehicleEntry> {
        let row = self.transaction(|tx| {
            // Tokens can outlive their account, e.g. after the store is reset.
            if !user_exists(tx, user_id)? {
                return Err(ParkingError::NotFound("user"));
            }

            let slot = slot_id.to_string();

            // Check-and-set: only flips a slot that is still available.
            let claimed = tx.execute(
                "UPDATE parking_slots SET status = ?1 WHERE id = ?2 AND status = ?3",
                (
                    SlotStatus::Occupied.as_str(),
                    &slot,
                    SlotStatus::Available.as_str(),
                ),
            )?;
            if claimed != 1 {
                return Err(match query_slot(tx, slot_id)? {
                    Some(_) => ParkingError::SlotUnavailable,
                    None => ParkingError::NotFound("slot"),
                });
            }

            let row = EntryRow {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                slot_id: slot,
                entry_time: now_timestamp(),
                exit_time: None,
            };
            tx.execute(
                "INSERT INTO vehicle_entries (id, user_id, slot_id, entry_time) VALUES (?1, ?2, ?3, ?4)",
                (&row.id, &row.user_id, &row.slot_id, &row.entry_time),
            )?;
            Ok(row)
        })?;

        info!("User {} reserved slot {} (entry {})", user_id, slot_id, row.id);
        row.into_entry()
    }

    /// Closes an active entry and frees its slot.
    ///
    /// The caller must own the entry or hold `ReleaseAnyEntry`. Entries that
    /// are already closed are reported as `NotFound`.
    pub fn release(&self, actor: Actor, entry_id: Uuid) -> ParkingResult<VehicleEntry> {
        let row = self.transaction(|tx| {
            let mut row = query_entry(tx, entry_id)?
                .filter(|row| row.exit_time.is_none())
                .ok_or(ParkingError::NotFound("active entry"))?;

            if row.user_id != actor.id.to_string() && !actor.can(Capability::ReleaseAnyEntry) {
                return Err(ParkingError::Unauthorized);
            }

            let exit_time = now_timestamp();
            tx.execute(
                "UPDATE vehicle_entries SET exit_time = ?1 WHERE id = ?2 AND exit_time IS NULL",
                (&exit_time, &row.id),
            )?;
            set_slot_status(tx, &row.slot_id, SlotStatus::Available)?;

            row.exit_time = Some(exit_time);
            Ok(row)
        })?;

        info!("Entry {} released by {} (slot {})", row.id, actor.id, row.slot_id);
        row.into_entry()
    }

    /// Relabels a slot and/or sets its status by hand.
    ///
    /// A status change is refused while the slot has an active entry; that
    /// entry has to be released first.
    pub fn update_slot(
        &self,
        slot_id: Uuid,
        label: Option<&str>,
        status: Option<SlotStatus>,
    ) -> ParkingResult<ParkingSlot> {
        let row = self.transaction(|tx| {
            let current = query_slot(tx, slot_id)?
                .ok_or(ParkingError::NotFound("slot"))?
                .into_slot()?;

            if let Some(status) = status.filter(|s| *s != current.status) {
                if query_active_entry(tx, slot_id)?.is_some() {
                    return Err(ParkingError::SlotUnavailable);
                }
                set_slot_status(tx, &current.id.to_string(), status)?;
            }

            if let Some(label) = label {
                tx.execute(
                    "UPDATE parking_slots SET label = ?1 WHERE id = ?2",
                    (label, current.id.to_string()),
                )
                .map_err(ParkingError::on_unique("slot label"))?;
            }

            query_slot(tx, slot_id)?.ok_or(ParkingError::NotFound("slot"))
        })?;

        debug!("Slot {} updated", slot_id);
        row.into_slot()
    }

    /// Deletes a slot with no active entry, together with its closed entries.
    pub fn delete_slot(&self, slot_id: Uuid) -> ParkingResult<()> {
        self.transaction(|tx| {
            if query_slot(tx, slot_id)?.is_none() {
                return Err(ParkingError::NotFound("slot"));
            }
            if query_active_entry(tx, slot_id)?.is_some() {
                return Err(ParkingError::SlotUnavailable);
            }

            let slot = slot_id.to_string();
            tx.execute("DELETE FROM vehicle_entries WHERE slot_id = ?1", [&slot])?;
            tx.execute("DELETE FROM parking_slots WHERE id = ?1", [&slot])?;
            Ok(())
        })?;

        info!("Slot {} deleted", slot_id);
        Ok(())
    }

    /// Removes an entry record. An active entry frees its slot.
    pub fn delete_entry(&self, entry_id: Uuid) -> ParkingResult<()> {
        self.transaction(|tx| {
            let row = query_entry(tx, entry_id)?.ok_or(ParkingError::NotFound("entry"))?;

            tx.execute("DELETE FROM vehicle_entries WHERE id = ?1", [&row.id])?;
            if row.exit_time.is_none() {
                set_slot_status(tx, &row.slot_id, SlotStatus::Available)?;
            }
            Ok(())
        })?;

        info!("Entry {} deleted", entry_id);
        Ok(())
    }

    /// Runs `f` in an immediate transaction, committing only on `Ok`.
    fn transaction<F, T>(&self, f: F) -> ParkingResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> ParkingResult<T>,
    {
        self.with_conn_mut(|conn: &mut Connection| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }
}

fn user_exists(conn: &Connection, user_id: Uuid) -> ParkingResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM users WHERE id = ?1",
            [user_id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn set_slot_status(conn: &Connection, slot_id: &str, status: SlotStatus) -> ParkingResult<()> {
    conn.execute(
        "UPDATE parking_slots SET status = ?1 WHERE id = ?2",
        (status.as_str(), slot_id),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkly_types::Role;
    use std::sync::{Arc, Barrier};

    fn setup() -> (Database, Uuid, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        db.create_user(user, "u1", "hash", Role::User).unwrap();
        let slot = db.create_slot("S1").unwrap();
        (db, user, slot.id)
    }

    fn add_user(db: &Database, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        db.create_user(id, name, "hash", role).unwrap();
        id
    }

    fn actor(id: Uuid, role: Role) -> Actor {
        Actor { id, role }
    }

    #[test]
    fn reserve_opens_entry_and_occupies_slot() {
        let (db, user, slot) = setup();

        let entry = db.reserve(user, slot).unwrap();
        assert!(entry.is_active());
        assert_eq!(entry.user_id, user);
        assert_eq!(entry.slot_id, slot);

        let stored = db.get_slot(slot).unwrap().unwrap();
        assert_eq!(stored.status, SlotStatus::Occupied);

        let active = db.active_entry_for_slot(slot).unwrap().unwrap();
        assert_eq!(active.id, entry.id);
        assert_eq!(db.list_entries_for_user(user).unwrap(), vec![entry]);
    }

    #[test]
    fn reserve_occupied_slot_changes_nothing() {
        let (db, u1, slot) = setup();
        let u2 = add_user(&db, "u2", Role::User);
        let first = db.reserve(u1, slot).unwrap();

        let err = db.reserve(u2, slot).unwrap_err();
        assert!(matches!(err, ParkingError::SlotUnavailable));

        assert!(db.list_entries_for_user(u2).unwrap().is_empty());
        assert_eq!(db.list_entries().unwrap(), vec![first]);
        assert_eq!(db.get_slot(slot).unwrap().unwrap().status, SlotStatus::Occupied);
    }

    #[test]
    fn reserve_unknown_slot_is_not_found() {
        let (db, user, _) = setup();
        let err = db.reserve(user, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ParkingError::NotFound("slot")));
        assert!(db.list_entries().unwrap().is_empty());
    }

    #[test]
    fn reserve_for_unknown_user_is_not_found() {
        let (db, _, slot) = setup();

        let err = db.reserve(Uuid::new_v4(), slot).unwrap_err();
        assert!(matches!(err, ParkingError::NotFound("user")));
        assert_eq!(db.get_slot(slot).unwrap().unwrap().status, SlotStatus::Available);
        assert!(db.list_entries().unwrap().is_empty());
    }

    #[test]
    fn release_closes_entry_and_frees_slot() {
        let (db, u1, slot) = setup();
        let u2 = add_user(&db, "u2", Role::User);

        let e1 = db.reserve(u1, slot).unwrap();
        assert!(matches!(
            db.reserve(u2, slot),
            Err(ParkingError::SlotUnavailable)
        ));

        let closed = db.release(actor(u1, Role::User), e1.id).unwrap();
        assert_eq!(closed.id, e1.id);
        let exit = closed.exit_time.unwrap();
        assert!(exit >= closed.entry_time);

        assert_eq!(db.get_slot(slot).unwrap().unwrap().status, SlotStatus::Available);
        assert_eq!(db.get_entry(e1.id).unwrap().unwrap().exit_time, Some(exit));
        assert!(db.active_entry_for_slot(slot).unwrap().is_none());

        // Slot can be booked again once freed.
        let e2 = db.reserve(u2, slot).unwrap();
        assert_ne!(e2.id, e1.id);
    }

    #[test]
    fn release_twice_is_not_found() {
        let (db, user, slot) = setup();
        let entry = db.reserve(user, slot).unwrap();
        db.release(actor(user, Role::User), entry.id).unwrap();

        let err = db.release(actor(user, Role::User), entry.id).unwrap_err();
        assert!(matches!(err, ParkingError::NotFound(_)));
        assert!(matches!(
            db.release(actor(user, Role::User), Uuid::new_v4()),
            Err(ParkingError::NotFound(_))
        ));
    }

    #[test]
    fn only_owner_or_admin_may_release() {
        let (db, owner, slot) = setup();
        let other = add_user(&db, "other", Role::User);
        let admin = add_user(&db, "admin", Role::Admin);
        let entry = db.reserve(owner, slot).unwrap();

        let err = db.release(actor(other, Role::User), entry.id).unwrap_err();
        assert!(matches!(err, ParkingError::Unauthorized));
        assert_eq!(db.get_slot(slot).unwrap().unwrap().status, SlotStatus::Occupied);

        let closed = db.release(actor(admin, Role::Admin), entry.id).unwrap();
        assert!(!closed.is_active());
        assert_eq!(closed.user_id, owner);
    }

    #[test]
    fn concurrent_reservations_have_single_winner() {
        const ATTEMPTS: usize = 8;

        let db = Arc::new(Database::open_in_memory().unwrap());
        let slot = db.create_slot("S1").unwrap().id;
        let users: Vec<Uuid> = (0..ATTEMPTS)
            .map(|i| add_user(&db, &format!("user{i}"), Role::User))
            .collect();

        let barrier = Arc::new(Barrier::new(ATTEMPTS));
        let handles: Vec<_> = users
            .into_iter()
            .map(|user| {
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    db.reserve(user, slot)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let unavailable = results
            .iter()
            .filter(|r| matches!(r, Err(ParkingError::SlotUnavailable)))
            .count();

        assert_eq!(wins, 1);
        assert_eq!(unavailable, ATTEMPTS - 1);
        assert_eq!(db.list_entries().unwrap().len(), 1);
    }

    #[test]
    fn status_change_refused_while_entry_active() {
        let (db, user, slot) = setup();
        let entry = db.reserve(user, slot).unwrap();

        let err = db
            .update_slot(slot, None, Some(SlotStatus::Available))
            .unwrap_err();
        assert!(matches!(err, ParkingError::SlotUnavailable));

        // Relabelling is still fine.
        let renamed = db.update_slot(slot, Some("S1-north"), None).unwrap();
        assert_eq!(renamed.label, "S1-north");
        assert_eq!(renamed.status, SlotStatus::Occupied);

        db.release(actor(user, Role::User), entry.id).unwrap();
        let blocked = db
            .update_slot(slot, None, Some(SlotStatus::Occupied))
            .unwrap();
        assert_eq!(blocked.status, SlotStatus::Occupied);
        assert!(matches!(
            db.reserve(user, slot),
            Err(ParkingError::SlotUnavailable)
        ));
    }

    #[test]
    fn update_unknown_slot_and_duplicate_label() {
        let (db, _, slot) = setup();
        db.create_slot("S2").unwrap();

        assert!(matches!(
            db.update_slot(Uuid::new_v4(), Some("X"), None),
            Err(ParkingError::NotFound("slot"))
        ));
        assert!(matches!(
            db.update_slot(slot, Some("S2"), None),
            Err(ParkingError::Conflict("slot label"))
        ));
        assert_eq!(db.get_slot(slot).unwrap().unwrap().label, "S1");
    }

    #[test]
    fn delete_slot_requires_no_active_entry() {
        let (db, user, slot) = setup();
        let entry = db.reserve(user, slot).unwrap();

        assert!(matches!(
            db.delete_slot(slot),
            Err(ParkingError::SlotUnavailable)
        ));

        db.release(actor(user, Role::User), entry.id).unwrap();
        db.delete_slot(slot).unwrap();

        assert!(db.get_slot(slot).unwrap().is_none());
        assert!(db.get_entry(entry.id).unwrap().is_none());
        assert!(matches!(
            db.delete_slot(slot),
            Err(ParkingError::NotFound("slot"))
        ));
    }

    #[test]
    fn deleting_active_entry_frees_slot() {
        let (db, user, slot) = setup();
        let entry = db.reserve(user, slot).unwrap();

        db.delete_entry(entry.id).unwrap();

        assert!(db.get_entry(entry.id).unwrap().is_none());
        assert_eq!(db.get_slot(slot).unwrap().unwrap().status, SlotStatus::Available);
        assert!(matches!(
            db.delete_entry(entry.id),
            Err(ParkingError::NotFound("entry"))
        ));
    }
}
