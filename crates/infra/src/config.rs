//! Process configuration read from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DATABASE_URL` | unset | Postgres connection string |
//! | `SLABTRACK_DB_MAX_CONNECTIONS` | `5` | pool size, must be positive |
//! | `SLABTRACK_EMPTY_LISTING` | `not_found` | `not_found` or `empty` |
//! | `SLABTRACK_LOG_FORMAT` | `json` | `json` or `pretty` |

use thiserror::Error;

use slabtrack_cards::{EmptyListing, ServiceConfig};
use slabtrack_observability::LogFormat;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const DB_MAX_CONNECTIONS: &str = "SLABTRACK_DB_MAX_CONNECTIONS";
pub const EMPTY_LISTING: &str = "SLABTRACK_EMPTY_LISTING";
pub const LOG_FORMAT: &str = "SLABTRACK_LOG_FORMAT";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url.as_deref().ok_or(ConfigError::Missing(DATABASE_URL))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub service: ServiceConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let max_connections = match get(DB_MAX_CONNECTIONS) {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: DB_MAX_CONNECTIONS,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: DB_MAX_CONNECTIONS,
                        reason: e.to_string(),
                    });
                }
            },
        };

        let empty_listing = get(EMPTY_LISTING)
            .map(|raw| raw.parse::<EmptyListing>())
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                var: EMPTY_LISTING,
                reason: e.to_string(),
            })?
            .unwrap_or_default();

        let log_format = get(LOG_FORMAT)
            .map(|raw| raw.parse::<LogFormat>())
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                var: LOG_FORMAT,
                reason: e.to_string(),
            })?
            .unwrap_or_default();

        Ok(Self {
            database: DatabaseConfig {
                url: get(DATABASE_URL),
                max_connections,
            },
            service: ServiceConfig { empty_listing },
            log_format,
        })
    }
}
