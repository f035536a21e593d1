//! Process configuration, resolved from environment variables.

use estimate_core::{JsonFileStore, PersistenceError, ProjectSession, ProjectStore};
use std::fmt;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ENV_HTTP_ADDR: &str = "ESTIMATE_TOOL_HTTP_ADDR";
pub const ENV_STORE: &str = "ESTIMATE_TOOL_STORE";
pub const ENV_LOG: &str = "ESTIMATE_TOOL_LOG";

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_LOG_FILTER: &str = "info";

const SQLITE_EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

#[derive(Debug)]
pub enum ConfigError {
    InvalidAddr {
        value: String,
        source: AddrParseError,
    },
    UnknownStoreScheme(String),
    EmptyStorePath,
    SqliteUnavailable,
    Persistence(PersistenceError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAddr { value, source } => {
                write!(f, "invalid {ENV_HTTP_ADDR} '{value}': {source}")
            }
            ConfigError::UnknownStoreScheme(scheme) => {
                write!(f, "unknown {ENV_STORE} scheme '{scheme}' (expected json: or sqlite:)")
            }
            ConfigError::EmptyStorePath => write!(f, "{ENV_STORE} names a backend but no path"),
            ConfigError::SqliteUnavailable => {
                write!(f, "sqlite store requested but the `sqlite` feature is disabled")
            }
            ConfigError::Persistence(err) => write!(f, "could not open store: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidAddr { source, .. } => Some(source),
            ConfigError::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersistenceError> for ConfigError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Where the project snapshot lives between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Json(PathBuf),
    Sqlite(PathBuf),
}

impl StoreBackend {
    /// `json:<path>`, `sqlite:<path>`, or a bare path whose extension picks the backend.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        if value.is_empty() || value == "memory" {
            return Ok(Self::Memory);
        }

        if let Some((scheme, rest)) = value.split_once(':') {
            let is_scheme = scheme.len() > 1 && scheme.chars().all(|c| c.is_ascii_alphabetic());
            if is_scheme {
                let path = rest.trim();
                if path.is_empty() {
                    return Err(ConfigError::EmptyStorePath);
                }
                return match scheme.to_ascii_lowercase().as_str() {
                    "json" => Ok(Self::Json(PathBuf::from(path))),
                    "sqlite" => Ok(Self::Sqlite(PathBuf::from(path))),
                    _ => Err(ConfigError::UnknownStoreScheme(scheme.to_string())),
                };
            }
        }

        let path = PathBuf::from(value);
        if has_sqlite_extension(&path) {
            Ok(Self::Sqlite(path))
        } else {
            Ok(Self::Json(path))
        }
    }

    pub fn open(&self) -> Result<Option<Arc<dyn ProjectStore>>, ConfigError> {
        match self {
            StoreBackend::Memory => Ok(None),
            StoreBackend::Json(path) => Ok(Some(Arc::new(JsonFileStore::new(path)))),
            #[cfg(feature = "sqlite")]
            StoreBackend::Sqlite(path) => Ok(Some(Arc::new(
                estimate_core::SqliteProjectStore::new(path)?,
            ))),
            #[cfg(not(feature = "sqlite"))]
            StoreBackend::Sqlite(_) => Err(ConfigError::SqliteUnavailable),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => f.write_str("memory"),
            StoreBackend::Json(path) => write!(f, "json:{}", path.display()),
            StoreBackend::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
        }
    }
}

fn has_sqlite_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SQLITE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub store: StoreBackend,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration from any key lookup; unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr = get(ENV_HTTP_ADDR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = addr
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidAddr {
                value: addr.clone(),
                source,
            })?;

        let store = match get(ENV_STORE) {
            Some(value) => StoreBackend::parse(&value)?,
            None => StoreBackend::Memory,
        };

        let log_filter = get(ENV_LOG)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            http_addr,
            store,
            log_filter,
        })
    }

    /// Opens the configured store and restores the project held there.
    pub fn open_session(&self) -> Result<ProjectSession, ConfigError> {
        match self.store.open()? {
            Some(store) => Ok(ProjectSession::open(store)?),
            None => Ok(ProjectSession::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.http_addr, DEFAULT_HTTP_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn store_backends_parse() {
        assert_eq!(
            StoreBackend::parse("json:/tmp/p.json").unwrap(),
            StoreBackend::Json("/tmp/p.json".into())
        );
        assert_eq!(
            StoreBackend::parse("sqlite:estimates.data").unwrap(),
            StoreBackend::Sqlite("estimates.data".into())
        );
        assert_eq!(
            StoreBackend::parse("./state/project.DB").unwrap(),
            StoreBackend::Sqlite("./state/project.DB".into())
        );
        assert_eq!(
            StoreBackend::parse("project.json").unwrap(),
            StoreBackend::Json("project.json".into())
        );
        assert!(matches!(
            StoreBackend::parse("redis:localhost"),
            Err(ConfigError::UnknownStoreScheme(_))
        ));
        assert!(matches!(
            StoreBackend::parse("json:"),
            Err(ConfigError::EmptyStorePath)
        ));
    }

    #[test]
    fn invalid_address_is_reported() {
        let err = config(&[(ENV_HTTP_ADDR, "not-an-addr")]).unwrap_err();
        assert!(err.to_string().contains(ENV_HTTP_ADDR));
    }

    #[test]
    fn explicit_values_win() {
        let config = config(&[
            (ENV_HTTP_ADDR, "127.0.0.1:8080"),
            (ENV_STORE, "json:project.json"),
            (ENV_LOG, "debug,estimate_core=trace"),
        ])
        .unwrap();
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.store.to_string(), "json:project.json");
        assert_eq!(config.log_filter, "debug,estimate_core=trace");
    }
}
