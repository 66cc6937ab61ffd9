//! One delta-sync run.
//!
//! Paginator → Reconciler → Batch Fetcher → Transformer → Loader, each
//! stage awaited in turn. Remote stages degrade to partial results; the
//! warehouse read and every append are fatal on failure.

use crate::load::{LoadSummary, Loader};
use crate::reconcile::{load_local_ids, reconcile};
use crate::report::SyncReport;
use crate::transform::Transformer;
use hubsync_core::schema::ENGAGEMENT_PROPERTIES;
use hubsync_core::{CrmTransport, SyncConfig, SyncResult, WarehouseHandle};
use hubsync_crm::{BatchFetcher, Paginator};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Run one sync against the given collaborators.
///
/// # Returns
/// * `Ok(SyncReport)` - The run finished; the report says whether any remote
///   stage stopped early
/// * `Err(SyncError::Warehouse)` - Reading local ids or appending a chunk
///   failed
#[instrument(
    level = "info",
    skip_all,
    fields(run_id = %Uuid::now_v7(), list_id = %config.list_id, table = %config.warehouse.table)
)]
pub async fn run_sync<C, W>(config: &SyncConfig, crm: &C, warehouse: &W) -> SyncResult<SyncReport>
where
    C: CrmTransport + ?Sized,
    W: WarehouseHandle + ?Sized,
{
    let table = &config.warehouse.table;

    let listing = Paginator::new(crm, config.memberships_url()).fetch_all().await;
    let local = load_local_ids(warehouse, table).await?;

    let net_new = reconcile(&listing.items, &local);
    info!(
        remote = listing.items.len(),
        local = local.len(),
        net_new = net_new.len(),
        "Reconciled ids"
    );

    let fetcher = BatchFetcher::new(
        crm,
        config.batch_read_url(),
        ENGAGEMENT_PROPERTIES,
        config.batch_size,
    );
    let details = fetcher.fetch(&net_new).await;

    let mut report = SyncReport {
        remote_count: listing.items.len(),
        local_count: local.len(),
        net_new_count: net_new.len(),
        fetched_count: details.items.len(),
        rows_inserted: 0,
        chunks_written: 0,
        listing: listing.completeness,
        details: details.completeness,
    };

    if details.items.is_empty() {
        info!("No new records to load");
        return Ok(finish(report));
    }

    let rows = Transformer::new(config.target_timezone).transform(&details.items);
    let LoadSummary {
        rows_inserted,
        chunks_written,
    } = Loader::new(warehouse, table, config.load_chunk_size)
        .load(&rows)
        .await?;

    report.rows_inserted = rows_inserted;
    report.chunks_written = chunks_written;
    Ok(finish(report))
}

fn finish(report: SyncReport) -> SyncReport {
    if report.is_complete() {
        info!(rows_inserted = report.rows_inserted, "{}", report);
    } else {
        warn!(rows_inserted = report.rows_inserted, "{}", report);
    }
    report
}
