//! Runtime configuration read from the environment
//!
//! Variables (a `.env` file is honoured by `main`):
//!
//! - `PORT` - Server port number (default: 8080)
//! - `DATABASE_URL` - Path to the database file (default: "coupons.db")
//! - `ADMIN_KEY` - Key required on administrative routes; unset or empty disables the check
//! - `RUST_LOG` - Log filter, applied by `main` (default: [`DEFAULT_LOG_FILTER`])

use std::env;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "coupons.db";
pub const DEFAULT_LOG_FILTER: &str = "coupons=debug,tower_http=debug";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub admin_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT").map(|raw| raw.parse::<u16>()) {
            Some(Ok(port)) => port,
            Some(Err(err)) => {
                tracing::warn!(%err, default = DEFAULT_PORT, "invalid PORT, using default");
                DEFAULT_PORT
            }
            None => DEFAULT_PORT,
        };

        Config {
            port,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            admin_key: lookup("ADMIN_KEY").filter(|key| !key.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.admin_key, None);
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "/tmp/c.db"),
            ("ADMIN_KEY", "s3cret"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url, "/tmp/c.db");
        assert_eq!(config.admin_key.as_deref(), Some("s3cret"));
    }

    #[test]
    fn bad_port_and_empty_key() {
        let config = config_from(&[("PORT", "http"), ("ADMIN_KEY", "")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.admin_key, None);
    }
}
