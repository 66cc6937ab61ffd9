//! Sync Configuration
//!
//! Loaded from `HUBSYNC_*` environment variables with defaults matching the
//! production job. Batch and chunk sizes are capped by what the CRM and the
//! warehouse accept; `validate` enforces the caps.

use crate::{ConfigError, SyncResult, TableRef};
use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

// ============================================================================
// LIMITS AND DEFAULTS
// ============================================================================

/// Largest `inputs` list the batch-read endpoint accepts.
pub const MAX_BATCH_SIZE: usize = 100;

/// Largest row count written in one append transaction.
pub const MAX_LOAD_CHUNK_SIZE: usize = 10_000;

pub const DEFAULT_API_BASE_URL: &str = "https://api.hubapi.com";
pub const DEFAULT_LIST_ID: &str = "9705";
pub const DEFAULT_TARGET_TIMEZONE: &str = "US/Eastern";
pub const DEFAULT_SCHEMA: &str = "HUBSPOT";
pub const DEFAULT_TABLE: &str = "MARKETING_ENGAGEMENTS";

// ============================================================================
// ACCESS TOKEN
// ============================================================================

/// CRM private-app token that never shows up in logs.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a token.
    ///
    /// # Errors
    /// Returns error if the token is empty.
    pub fn new(token: String) -> Result<Self, ConfigError> {
        if token.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "HUBSYNC_ACCESS_TOKEN".to_string(),
            });
        }
        Ok(Self(SecretString::new(token.into())))
    }

    /// Expose the token (only for building the Authorization header).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken([REDACTED])")
    }
}

// ============================================================================
// WAREHOUSE CONFIGURATION
// ============================================================================

/// Warehouse connection and target table.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection wait/create timeout
    pub timeout: Duration,
    pub table: TableRef,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "analytics".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 4,
            timeout: Duration::from_secs(30),
            table: TableRef::new(DEFAULT_SCHEMA, DEFAULT_TABLE),
        }
    }
}

// ============================================================================
// SYNC CONFIGURATION
// ============================================================================

/// Everything one sync run needs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// CRM API base, without trailing slash
    pub api_base_url: String,
    pub access_token: AccessToken,
    /// Saved list whose memberships define the remote collection
    pub list_id: String,
    /// Custom object type used for batch reads
    pub object_type_id: String,
    /// Ids per batch lookup
    pub batch_size: usize,
    /// Rows per append transaction
    pub load_chunk_size: usize,
    pub target_timezone: Tz,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    pub warehouse: WarehouseConfig,
}

impl SyncConfig {
    /// Create a configuration with production defaults for everything but
    /// the credentials and object type.
    pub fn new(access_token: AccessToken, object_type_id: impl Into<String>) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token,
            list_id: DEFAULT_LIST_ID.to_string(),
            object_type_id: object_type_id.into(),
            batch_size: MAX_BATCH_SIZE,
            load_chunk_size: MAX_LOAD_CHUNK_SIZE,
            target_timezone: chrono_tz::US::Eastern,
            http_timeout: Duration::from_secs(30),
            warehouse: WarehouseConfig::default(),
        }
    }

    /// Create SyncConfig from environment variables.
    ///
    /// Environment variables:
    /// - `HUBSYNC_ACCESS_TOKEN`: CRM bearer token (required)
    /// - `HUBSYNC_OBJECT_TYPE_ID`: object type for batch reads (required)
    /// - `HUBSYNC_API_BASE_URL`: CRM base URL (default: https://api.hubapi.com)
    /// - `HUBSYNC_LIST_ID`: saved list id (default: 9705)
    /// - `HUBSYNC_BATCH_SIZE`: ids per lookup, 1..=100 (default: 100)
    /// - `HUBSYNC_LOAD_CHUNK_SIZE`: rows per append, 1..=10000 (default: 10000)
    /// - `HUBSYNC_TARGET_TIMEZONE`: tz database name (default: US/Eastern)
    /// - `HUBSYNC_HTTP_TIMEOUT_SECS`: per-request timeout (default: 30)
    /// - `HUBSYNC_WAREHOUSE_*`: HOST, PORT, NAME, USER, PASSWORD, SCHEMA,
    ///   TABLE, POOL_SIZE, TIMEOUT_SECS
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, then validate.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let access_token = AccessToken::new(var("HUBSYNC_ACCESS_TOKEN").unwrap_or_default())?;
        let object_type_id =
            var("HUBSYNC_OBJECT_TYPE_ID").ok_or_else(|| ConfigError::MissingRequired {
                field: "HUBSYNC_OBJECT_TYPE_ID".to_string(),
            })?;

        let mut config = Self::new(access_token, object_type_id);

        if let Some(url) = var("HUBSYNC_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(list_id) = var("HUBSYNC_LIST_ID") {
            config.list_id = list_id;
        }
        if let Some(raw) = var("HUBSYNC_BATCH_SIZE") {
            config.batch_size = parse_number("HUBSYNC_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = var("HUBSYNC_LOAD_CHUNK_SIZE") {
            config.load_chunk_size = parse_number("HUBSYNC_LOAD_CHUNK_SIZE", &raw)?;
        }
        if let Some(raw) = var("HUBSYNC_TARGET_TIMEZONE") {
            config.target_timezone =
                raw.parse::<Tz>()
                    .map_err(|e| ConfigError::InvalidValue {
                        field: "HUBSYNC_TARGET_TIMEZONE".to_string(),
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?;
        }
        if let Some(raw) = var("HUBSYNC_HTTP_TIMEOUT_SECS") {
            config.http_timeout =
                Duration::from_secs(parse_number("HUBSYNC_HTTP_TIMEOUT_SECS", &raw)?);
        }

        let warehouse = &mut config.warehouse;
        if let Some(host) = var("HUBSYNC_WAREHOUSE_HOST") {
            warehouse.host = host;
        }
        if let Some(raw) = var("HUBSYNC_WAREHOUSE_PORT") {
            warehouse.port = parse_number("HUBSYNC_WAREHOUSE_PORT", &raw)?;
        }
        if let Some(dbname) = var("HUBSYNC_WAREHOUSE_NAME") {
            warehouse.dbname = dbname;
        }
        if let Some(user) = var("HUBSYNC_WAREHOUSE_USER") {
            warehouse.user = user;
        }
        if let Some(password) = lookup("HUBSYNC_WAREHOUSE_PASSWORD") {
            warehouse.password = password;
        }
        if let Some(schema) = var("HUBSYNC_WAREHOUSE_SCHEMA") {
            warehouse.table.schema = schema;
        }
        if let Some(table) = var("HUBSYNC_WAREHOUSE_TABLE") {
            warehouse.table.table = table;
        }
        if let Some(raw) = var("HUBSYNC_WAREHOUSE_POOL_SIZE") {
            warehouse.max_size = parse_number("HUBSYNC_WAREHOUSE_POOL_SIZE", &raw)?;
        }
        if let Some(raw) = var("HUBSYNC_WAREHOUSE_TIMEOUT_SECS") {
            warehouse.timeout =
                Duration::from_secs(parse_number("HUBSYNC_WAREHOUSE_TIMEOUT_SECS", &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - batch_size in 1..=100
    /// - load_chunk_size in 1..=10000
    /// - api_base_url is http(s)
    /// - list_id and object_type_id are non-empty
    /// - warehouse pool size and timeouts are positive
    pub fn validate(&self) -> SyncResult<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(invalid(
                "HUBSYNC_BATCH_SIZE",
                self.batch_size,
                format!("must be between 1 and {}", MAX_BATCH_SIZE),
            ));
        }

        if self.load_chunk_size == 0 || self.load_chunk_size > MAX_LOAD_CHUNK_SIZE {
            return Err(invalid(
                "HUBSYNC_LOAD_CHUNK_SIZE",
                self.load_chunk_size,
                format!("must be between 1 and {}", MAX_LOAD_CHUNK_SIZE),
            ));
        }

        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(invalid(
                "HUBSYNC_API_BASE_URL",
                &self.api_base_url,
                "must be an http(s) URL",
            ));
        }

        if self.list_id.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "HUBSYNC_LIST_ID".to_string(),
            }
            .into());
        }

        if self.object_type_id.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "HUBSYNC_OBJECT_TYPE_ID".to_string(),
            }
            .into());
        }

        if self.http_timeout.is_zero() {
            return Err(invalid("HUBSYNC_HTTP_TIMEOUT_SECS", 0, "must be positive"));
        }

        if self.warehouse.max_size == 0 {
            return Err(invalid("HUBSYNC_WAREHOUSE_POOL_SIZE", 0, "must be positive"));
        }

        if self.warehouse.timeout.is_zero() {
            return Err(invalid("HUBSYNC_WAREHOUSE_TIMEOUT_SECS", 0, "must be positive"));
        }

        if self.warehouse.table.schema.is_empty() || self.warehouse.table.table.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "HUBSYNC_WAREHOUSE_TABLE".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Listing endpoint for the configured list.
    pub fn memberships_url(&self) -> String {
        format!("{}/crm/v3/lists/{}/memberships", self.api_base_url, self.list_id)
    }

    /// Batch-read endpoint for the configured object type.
    pub fn batch_read_url(&self) -> String {
        format!(
            "{}/crm/v3/objects/{}/batch/read",
            self.api_base_url, self.object_type_id
        )
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason: "must be a non-negative integer".to_string(),
    })
}

fn invalid(
    field: &str,
    value: impl std::fmt::Display,
    reason: impl Into<String>,
) -> crate::SyncError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
    .into()
}
