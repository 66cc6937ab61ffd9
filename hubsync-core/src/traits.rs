//! Collaborator traits.
//!
//! The sync core talks to the CRM and the warehouse only through these.
//! Concrete implementations live in hubsync-crm and hubsync-warehouse; test
//! doubles live in hubsync-test-utils.

use crate::{CrmResult, LocalIdSet, SyncResult, TableRef, TransformedRecord};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

// ============================================================================
// CRM TRANSPORT
// ============================================================================

/// Status and decoded body of one CRM response.
///
/// Non-2xx responses are returned as values, not errors, so each stage can
/// apply its own failure policy. `body` is `Null` when the payload was not
/// JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct CrmResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl CrmResponse {
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self { status, body }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Authenticated HTTP client for the CRM API.
///
/// Implementations attach the bearer token. An `Err` means no response was
/// received at all.
#[async_trait]
pub trait CrmTransport: Send + Sync {
    /// GET an absolute URL.
    async fn get(&self, url: &str) -> CrmResult<CrmResponse>;

    /// POST a JSON body to an absolute URL.
    async fn post(&self, url: &str, body: &JsonValue) -> CrmResult<CrmResponse>;
}

// ============================================================================
// WAREHOUSE HANDLE
// ============================================================================

/// Read/append access to the warehouse table.
#[async_trait]
pub trait WarehouseHandle: Send + Sync {
    /// Collect the primary-key column of `table`.
    ///
    /// # Returns
    /// * `Ok(LocalIdSet)` - Every id currently in the table
    /// * `Err(SyncError::Warehouse)` - The read failed; the run cannot proceed
    async fn read_ids(&self, table: &TableRef) -> SyncResult<LocalIdSet>;

    /// Append `rows` in a single transaction and return the number written.
    async fn append_rows(&self, table: &TableRef, rows: &[TransformedRecord]) -> SyncResult<u64>;
}
