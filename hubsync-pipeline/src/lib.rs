//! HUBSYNC Pipeline - Delta Sync Orchestration
//!
//! Wires the CRM stages from hubsync-crm to the warehouse through the
//! reconcile, transform and load steps. [`run_sync`] is the whole run; the
//! `hubsync` binary adds configuration, logging and process exit codes.

pub mod load;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod telemetry;
pub mod transform;

pub use load::{LoadSummary, Loader};
pub use pipeline::run_sync;
pub use reconcile::{load_local_ids, reconcile};
pub use report::SyncReport;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use hubsync_core::{parse_utc, to_zone};
pub use transform::Transformer;
