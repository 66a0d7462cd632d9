//! Explicit init/teardown handle for the schema database (§9 "Global
//! state": the schema database, object pools and controller singleton are
//! process-wide, but each gets an explicit `init(config) -> handle` +
//! `teardown(handle)` pair rather than a bare global).
//!
//! Grounded on the teacher's `DATA_DIR` resolution
//! (`zigbee-core/src/network.rs`: `std::env::var("DATA_DIR").unwrap_or_else(...)`),
//! generalized to the schema index path per SPEC_FULL.md §6.1/§10.3:
//! an explicit `ZCLDB_INDEX` environment variable or caller-supplied path
//! takes precedence, falling back to a platform default constant.

use std::path::PathBuf;

use crate::error::Result;
use crate::schema::SchemaDatabase;
use crate::xml::load_all;

/// Name of the environment variable consulted when a config does not name
/// an explicit index path.
pub const ZCLDB_INDEX_ENV: &str = "ZCLDB_INDEX";

/// Platform default search path, used when neither the config nor
/// `ZCLDB_INDEX` name an index file.
pub const DEFAULT_INDEX_PATH: &str = "/usr/share/deCONZ/zcldb/general.xml";

/// Plain configuration struct passed to [`ZclDb::init`] — not a global.
#[derive(Debug, Clone)]
pub struct ZclDbConfig {
    /// Newline-delimited index file listing schema XML sources (§6.1).
    /// When `None`, resolved from [`ZCLDB_INDEX_ENV`] and, failing that,
    /// [`DEFAULT_INDEX_PATH`].
    pub index_path: Option<PathBuf>,
    /// Seeded into the index when it is empty, missing, or stale.
    pub default_path: PathBuf,
}

impl Default for ZclDbConfig {
    fn default() -> Self {
        Self { index_path: None, default_path: PathBuf::from(DEFAULT_INDEX_PATH) }
    }
}

impl ZclDbConfig {
    #[must_use]
    pub fn resolved_index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .or_else(|| std::env::var_os(ZCLDB_INDEX_ENV).map(PathBuf::from))
            .unwrap_or_else(|| self.default_path.clone())
    }
}

/// A loaded schema database plus the config it was built from. The handle
/// is threaded explicitly by callers rather than stashed in a global.
#[derive(Debug)]
pub struct ZclDb {
    pub config: ZclDbConfig,
    pub database: SchemaDatabase,
}

impl ZclDb {
    /// Loads the schema index named by `config` and every XML source it
    /// lists into a fresh [`SchemaDatabase`].
    pub fn init(config: ZclDbConfig) -> Result<Self> {
        let mut database = SchemaDatabase::new();
        let index_path = config.resolved_index_path();
        load_all(&mut database, &index_path, &config.default_path)?;
        tracing::info!(
            domains = database.domains.len(),
            profiles = database.profiles.len(),
            devices = database.devices.len(),
            "schema database loaded"
        );
        Ok(Self { config, database })
    }

    /// Releases the handle. The database holds no external resources
    /// beyond heap memory, so this mostly documents the explicit-teardown
    /// contract (§9) and gives call sites a symmetric bookend to `init`.
    pub fn teardown(self) {
        tracing::info!("schema database torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_index_path_prefers_explicit_config() {
        let config = ZclDbConfig {
            index_path: Some(PathBuf::from("/tmp/explicit-index.txt")),
            default_path: PathBuf::from(DEFAULT_INDEX_PATH),
        };
        assert_eq!(config.resolved_index_path(), PathBuf::from("/tmp/explicit-index.txt"));
    }

    #[test]
    fn resolved_index_path_falls_back_to_default() {
        std::env::remove_var(ZCLDB_INDEX_ENV);
        let config = ZclDbConfig::default();
        assert_eq!(config.resolved_index_path(), PathBuf::from(DEFAULT_INDEX_PATH));
    }

    #[test]
    fn init_seeds_default_path_when_index_is_missing() {
        let dir = std::env::temp_dir().join(format!("zcl-db-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let default_path = dir.join("general.xml");
        std::fs::write(&default_path, "<domain-list></domain-list>").unwrap();

        let config = ZclDbConfig {
            index_path: Some(dir.join("missing-index.txt")),
            default_path,
        };
        let db = ZclDb::init(config).unwrap();
        assert!(db.database.profiles.is_empty());
        db.teardown();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn init_propagates_io_error_when_default_path_is_also_missing() {
        let config = ZclDbConfig {
            index_path: Some(PathBuf::from("/nonexistent/zcldb-index.txt")),
            default_path: PathBuf::from("/nonexistent/general.xml"),
        };
        assert!(ZclDb::init(config).is_err());
    }
}
