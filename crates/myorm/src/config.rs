//! Connection settings for the writer and reader endpoints.
//!
//! Settings are plain `serde` records so applications can load them from
//! whatever configuration source they already use:
//!
//! ```ignore
//! let cluster = myorm::ClusterSettings::from_json_str(r#"{
//!     "master": { "host": "10.0.0.1", "user": "app", "password": "secret", "default_db": "shop" },
//!     "slave":  { "host": "10.0.0.2", "user": "app", "password": "secret", "default_db": "shop" }
//! }"#)?;
//! let db = myorm::Db::connect(cluster).await?;
//! ```

use crate::error::{OrmError, OrmResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default ceiling on open connections per pool.
pub const DEFAULT_MAX_OPEN: usize = 2000;

/// Default ceiling on idle connections kept per pool.
pub const DEFAULT_MAX_IDLE: usize = 1000;

/// Pool sizing for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Maximum number of connections the pool will open.
    pub max_open: usize,
    /// Maximum number of idle connections retained between checkouts.
    pub max_idle: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: DEFAULT_MAX_OPEN,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }
}

/// Settings for a single MySQL endpoint.
///
/// Immutable once handed to the connection manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default)]
    pub default_db: String,
    #[serde(default)]
    pub enable_table_prefix: bool,
    #[serde(default)]
    pub table_prefix: String,
    #[serde(default)]
    pub pool: PoolSettings,
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

impl Settings {
    /// Create settings for `host:port` with the given user and default options.
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: String::new(),
            charset: default_charset(),
            default_db: String::new(),
            enable_table_prefix: false,
            table_prefix: String::new(),
            pool: PoolSettings::default(),
        }
    }

    /// Set the password. An empty password skips authentication data.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the connection charset (`SET NAMES <charset>` on every new connection).
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the schema selected on connect.
    pub fn default_db(mut self, db: impl Into<String>) -> Self {
        self.default_db = db.into();
        self
    }

    /// Enable the table prefix applied to every table name.
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.enable_table_prefix = true;
        self.table_prefix = prefix.into();
        self
    }

    /// Override pool sizing.
    pub fn pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    /// The prefix to apply to table names, if enabled.
    pub fn effective_prefix(&self) -> Option<&str> {
        (self.enable_table_prefix && !self.table_prefix.is_empty())
            .then_some(self.table_prefix.as_str())
    }

    /// Check the settings before any connection is attempted.
    pub fn validate(&self) -> OrmResult<()> {
        if self.host.trim().is_empty() {
            return Err(OrmError::configuration("host must not be empty"));
        }
        if self.port == 0 {
            return Err(OrmError::configuration(format!(
                "invalid port 0 for host {}",
                self.host
            )));
        }
        if self.user.trim().is_empty() {
            return Err(OrmError::configuration(format!(
                "user must not be empty for {}:{}",
                self.host, self.port
            )));
        }
        // The charset is spliced into `SET NAMES`, so only identifier characters are allowed.
        if self.charset.is_empty()
            || !self
                .charset
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(OrmError::configuration(format!(
                "invalid charset {:?}",
                self.charset
            )));
        }
        if self.pool.max_open == 0 {
            return Err(OrmError::configuration("pool.max_open must be at least 1"));
        }
        Ok(())
    }

    /// `host:port` used in logs and error messages.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Writer (primary) and reader (replica) endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSettings {
    pub writer: Settings,
    pub reader: Settings,
}

impl ClusterSettings {
    /// Pair a writer and a reader endpoint.
    pub fn new(writer: Settings, reader: Settings) -> Self {
        Self { writer, reader }
    }

    /// Use one endpoint for both reads and writes.
    pub fn single(settings: Settings) -> Self {
        Self {
            writer: settings.clone(),
            reader: settings,
        }
    }

    /// Build from a role-keyed map.
    ///
    /// The writer is looked up under `"master"` or `"writer"`, the reader under
    /// `"slave"` or `"reader"`. A missing role is a configuration error.
    pub fn from_map(mut map: HashMap<String, Settings>) -> OrmResult<Self> {
        let writer = take_role(&mut map, &["master", "writer"])
            .ok_or_else(|| OrmError::configuration("missing writer settings (\"master\")"))?;
        let reader = take_role(&mut map, &["slave", "reader"])
            .ok_or_else(|| OrmError::configuration("missing reader settings (\"slave\")"))?;
        Ok(Self { writer, reader })
    }

    /// Parse a role-keyed JSON object (see [`ClusterSettings::from_map`]).
    pub fn from_json_str(json: &str) -> OrmResult<Self> {
        let map: HashMap<String, Settings> = serde_json::from_str(json)
            .map_err(|e| OrmError::configuration(format!("invalid settings json: {e}")))?;
        Self::from_map(map)
    }

    /// Validate both endpoints.
    pub fn validate(&self) -> OrmResult<()> {
        self.writer.validate()?;
        self.reader.validate()
    }

    /// Table prefix taken from the writer settings.
    pub fn table_prefix(&self) -> Option<&str> {
        self.writer.effective_prefix()
    }
}

fn take_role(map: &mut HashMap<String, Settings>, names: &[&str]) -> Option<Settings> {
    names.iter().find_map(|name| map.remove(*name))
}
