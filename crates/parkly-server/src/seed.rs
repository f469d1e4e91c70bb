use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use parkly_api::auth::hash_password;
use parkly_db::Database;
use parkly_types::Role;

use crate::config::Config;

/// Makes sure the configured admin account and slots exist.
pub fn run(db: &Database, config: &Config) -> Result<()> {
    if let Some(password) = &config.admin_password {
        ensure_admin(db, &config.admin_username, password)?;
    }

    for label in &config.seed_slots {
        if db.ensure_slot(label)? {
            info!("Seeded slot {}", label);
        }
    }
    Ok(())
}

fn ensure_admin(db: &Database, username: &str, password: &str) -> Result<()> {
    let hash = hash_password(password)?;

    if db.update_user_credentials(username, &hash, Role::Admin)? {
        info!("Admin account {} refreshed", username);
    } else {
        db.create_user(Uuid::new_v4(), username, &hash, Role::Admin)?;
        info!("Admin account {} created", username);
    }
    Ok(())
}
