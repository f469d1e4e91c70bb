use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS parking_slots (
            id          TEXT PRIMARY KEY,
            label       TEXT NOT NULL UNIQUE,
            status      TEXT NOT NULL DEFAULT 'available'
                        CHECK (status IN ('available', 'occupied')),
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS vehicle_entries (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            slot_id     TEXT NOT NULL REFERENCES parking_slots(id),
            entry_time  TEXT NOT NULL,
            exit_time   TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_entries_user
            ON vehicle_entries(user_id, entry_time);

        -- At most one open entry per slot
        CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_active_slot
            ON vehicle_entries(slot_id) WHERE exit_time IS NULL;
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
