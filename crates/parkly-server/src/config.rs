use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub admin_username: String,
    /// No admin account is seeded when unset.
    pub admin_password: Option<String>,
    pub seed_slots: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = var_or("PARKLY_PORT", "3000");
        let port: u16 = port
            .parse()
            .with_context(|| format!("PARKLY_PORT is not a port number: {}", port))?;

        Ok(Self {
            host: var_or("PARKLY_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var_or("PARKLY_DB_PATH", "parkly.db")),
            jwt_secret: var_or("PARKLY_JWT_SECRET", DEV_JWT_SECRET),
            admin_username: var_or("PARKLY_ADMIN_USERNAME", "admin"),
            admin_password: env::var("PARKLY_ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
            seed_slots: parse_labels(&var_or("PARKLY_SEED_SLOTS", "")),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_labels_are_trimmed_and_skip_blanks() {
        assert_eq!(parse_labels(" A1, A2 ,,B1 "), vec!["A1", "A2", "B1"]);
        assert!(parse_labels("").is_empty());
    }

    #[test]
    fn addr_joins_host_and_port() {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 8080,
            db_path: PathBuf::from("test.db"),
            jwt_secret: DEV_JWT_SECRET.into(),
            admin_username: "admin".into(),
            admin_password: None,
            seed_slots: vec![],
        };
        assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:8080");
        assert!(config.uses_dev_secret());
    }
}
