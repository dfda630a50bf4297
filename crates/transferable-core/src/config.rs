use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::EntityType;

/// Contents of a registry file: database location, runtime settings and the
/// entity types with their relationship declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Fail instead of skipping when a declared name is a plain attribute.
    #[serde(default)]
    pub strict_declarations: bool,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub foreign_keys: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict_declarations: false,
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: false,
        }
    }
}

impl Settings {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Load a registry file. A missing file yields the default (empty) config.
///
/// Relative `database.path` values are resolved against the file's directory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<RegistryConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "registry file missing, using defaults");
        return Ok(RegistryConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut config =
        parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    if let (Some(db_path), Some(base)) = (config.database.path.as_ref(), path.parent()) {
        if db_path.is_relative() {
            config.database.path = Some(base.join(db_path));
        }
    }

    Ok(config)
}

/// # Errors
///
/// Returns an error if `content` is not a valid registry document.
pub fn parse_config(content: &str) -> Result<RegistryConfig> {
    Ok(toml::from_str::<RegistryConfig>(content)?)
}

/// Resolve the database path: explicit flag, then `XFER_DB`, then the file.
#[must_use]
pub fn resolve_database_path(
    cli_path: Option<&Path>,
    env_path: Option<&str>,
    config: &RegistryConfig,
) -> Option<PathBuf> {
    cli_path
        .map(Path::to_path_buf)
        .or_else(|| {
            env_path
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        })
        .or_else(|| config.database.path.clone())
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationKind;

    const SAMPLE: &str = r#"
[database]
path = "library.sqlite3"

[settings]
strict_declarations = true

[[entity]]
name = "genre"
table = "genres"
strict = true
transferable = ["books"]

[entity.relations.books]
kind = "has_many"
related = "book"
foreign_key = "genre_id"

[[entity]]
name = "book"
table = "books"
attributes = ["title"]
"#;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let cfg = load_config(&dir.path().join("transferable.toml")).expect("load should succeed");
        assert!(cfg.entities.is_empty());
        assert!(!cfg.settings.strict_declarations);
        assert!(!cfg.settings.foreign_keys);
        assert_eq!(cfg.settings.busy_timeout(), Duration::from_secs(5));
        assert!(cfg.database.path.is_none());
    }

    #[test]
    fn parses_entities_and_relations() {
        let cfg = parse_config(SAMPLE).expect("parse sample");
        assert!(cfg.settings.strict_declarations);
        assert_eq!(cfg.entities.len(), 2);

        let genre = &cfg.entities[0];
        assert!(genre.strict);
        assert_eq!(genre.transferable, vec!["books"]);
        assert_eq!(genre.relations["books"].kind, RelationKind::HasMany);
        assert_eq!(genre.relations["books"].foreign_key, "genre_id");

        assert_eq!(cfg.entities[1].attributes, vec!["title"]);
    }

    #[test]
    fn relative_database_path_is_anchored_to_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let file = dir.path().join("transferable.toml");
        std::fs::write(&file, SAMPLE).expect("write config");

        let cfg = load_config(&file).expect("load config");
        assert_eq!(cfg.database.path, Some(dir.path().join("library.sqlite3")));
    }

    #[test]
    fn unknown_relation_kind_fails_to_parse() {
        let broken = SAMPLE.replace("has_many", "has_lots");
        assert!(parse_config(&broken).is_err());
    }

    #[test]
    fn database_path_precedence() {
        let cfg = parse_config(SAMPLE).expect("parse sample");

        let from_cli = resolve_database_path(Some(Path::new("cli.db")), Some("env.db"), &cfg);
        assert_eq!(from_cli, Some(PathBuf::from("cli.db")));

        let from_env = resolve_database_path(None, Some("env.db"), &cfg);
        assert_eq!(from_env, Some(PathBuf::from("env.db")));

        let from_file = resolve_database_path(None, Some("  "), &cfg);
        assert_eq!(from_file, Some(PathBuf::from("library.sqlite3")));

        assert_eq!(
            resolve_database_path(None, None, &RegistryConfig::default()),
            None
        );
    }
}
