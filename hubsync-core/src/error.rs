//! Error types for HUBSYNC operations

use thiserror::Error;

/// CRM transport and response errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrmError {
    #[error("Request to {url} failed with status {status}")]
    RequestFailed { url: String, status: u16 },

    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

/// Warehouse connection and statement errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WarehouseError {
    #[error("Warehouse connection failed: {reason}")]
    ConnectFailed { reason: String },

    #[error("Read of {table} failed: {reason}")]
    ReadFailed { table: String, reason: String },

    #[error("Append to {table} failed: {reason}")]
    AppendFailed { table: String, reason: String },

    #[error("Unsupported value in column {column}: {reason}")]
    UnsupportedValue { column: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all HUBSYNC errors.
///
/// Only the variants that reach the binary end a run; listing and detail
/// fetch failures are absorbed by their stage and surface in the report.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Result type alias for HUBSYNC operations.
pub type SyncResult<T> = Result<T, SyncError>;

// =============================================================================
// TESTS
// =============================================================================
