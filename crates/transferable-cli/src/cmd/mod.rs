pub mod check;
pub mod count;
pub mod delete;
pub mod describe;
pub mod transfer;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use transferable_core::config::{RegistryConfig, load_config, resolve_database_path};
use transferable_core::{ErrorCode, KeyValue, Registry, db};

/// Key argument parser: integers first, text otherwise.
///
/// Set explicitly on every key argument, since clap's default parser would
/// pick `From<String>` and bind every key as text.
pub fn parse_key(raw: &str) -> Result<KeyValue, Infallible> {
    raw.parse()
}

/// Where the registry file and database come from.
#[derive(Debug, Clone)]
pub struct SessionArgs {
    pub registry: PathBuf,
    pub db: Option<PathBuf>,
}

/// A loaded registry and an open database connection.
pub struct Session {
    pub registry: Registry,
    pub conn: Connection,
}

/// Parse and validate the registry file.
pub fn load_registry(path: &Path) -> Result<(RegistryConfig, Registry)> {
    let config = load_config(path).context(ErrorCode::ConfigParseError)?;
    let registry = Registry::from_config(&config)?;
    Ok((config, registry))
}

impl SessionArgs {
    pub fn open(&self) -> Result<Session> {
        let (config, registry) = load_registry(&self.registry)?;
        let env_db = std::env::var("XFER_DB").ok();
        let Some(path) = resolve_database_path(self.db.as_deref(), env_db.as_deref(), &config)
        else {
            bail!(
                "no database configured: pass --db, set XFER_DB, or set database.path in {}",
                self.registry.display()
            );
        };
        if !path.exists() {
            bail!("database {} does not exist", path.display());
        }
        let conn = db::open(&path, &config.settings)?;
        tracing::debug!(
            registry = %self.registry.display(),
            database = %path.display(),
            types = registry.types().count(),
            "session ready"
        );
        Ok(Session { registry, conn })
    }
}
