//! HUBSYNC Core - Records, Collaborators, Configuration
//!
//! Pure data types and the traits the sync stages talk through. All other
//! crates depend on this one; it performs no I/O itself.

pub mod config;
pub mod error;
pub mod outcome;
pub mod record;
pub mod schema;
pub mod timestamp;
pub mod traits;

pub use config::{
    AccessToken, SyncConfig, WarehouseConfig, MAX_BATCH_SIZE, MAX_LOAD_CHUNK_SIZE,
};
pub use error::{ConfigError, CrmError, SyncError, SyncResult, WarehouseError};
pub use outcome::{Completeness, FailurePolicy, FetchOutcome};
pub use record::{
    parse_object_id, quote_ident, DetailedRecord, FieldValue, LocalIdSet, NetNewIdSet,
    RemoteRecordRef, TableRef, TransformedRecord,
};
pub use timestamp::{parse_utc, to_zone};
pub use traits::{CrmResponse, CrmTransport, WarehouseHandle};

/// Result type alias for CRM transport calls.
pub type CrmResult<T> = Result<T, CrmError>;
