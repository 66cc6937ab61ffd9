//! Remote/local id reconciliation.

use hubsync_core::{
    LocalIdSet, NetNewIdSet, RemoteRecordRef, SyncResult, TableRef, WarehouseHandle,
};
use tracing::{info, instrument};

/// Ids present remotely but not locally. Duplicate remote refs collapse.
pub fn reconcile(remote: &[RemoteRecordRef], local: &LocalIdSet) -> NetNewIdSet {
    remote
        .iter()
        .map(|r| r.record_id)
        .filter(|id| !local.contains(id))
        .collect()
}

/// Read the table's current ids. A failure here ends the run.
#[instrument(level = "info", skip(warehouse), fields(table = %table))]
pub async fn load_local_ids<W>(warehouse: &W, table: &TableRef) -> SyncResult<LocalIdSet>
where
    W: WarehouseHandle + ?Sized,
{
    let ids = warehouse.read_ids(table).await?;
    info!(local_ids = ids.len(), "Read local ids");
    Ok(ids)
}
