//! Chunked appends into the warehouse table.
//!
//! One `append_rows` call (one transaction) per chunk. Chunks are not atomic
//! with respect to each other: a failed chunk ends the load, and the chunks
//! before it stay written.

use hubsync_core::{SyncResult, TableRef, TransformedRecord, WarehouseHandle, MAX_LOAD_CHUNK_SIZE};
use tracing::{info, instrument};

/// Totals for a finished load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_inserted: u64,
    pub chunks_written: usize,
}

/// Appends rows in chunks of at most `chunk_size`.
pub struct Loader<'a, W: WarehouseHandle + ?Sized> {
    warehouse: &'a W,
    table: &'a TableRef,
    chunk_size: usize,
}

impl<'a, W: WarehouseHandle + ?Sized> Loader<'a, W> {
    /// `chunk_size` is clamped to `1..=MAX_LOAD_CHUNK_SIZE`.
    pub fn new(warehouse: &'a W, table: &'a TableRef, chunk_size: usize) -> Self {
        Self {
            warehouse,
            table,
            chunk_size: chunk_size.clamp(1, MAX_LOAD_CHUNK_SIZE),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[instrument(level = "info", skip(self, rows), fields(table = %self.table, rows = rows.len()))]
    pub async fn load(&self, rows: &[TransformedRecord]) -> SyncResult<LoadSummary> {
        let mut summary = LoadSummary::default();

        for (index, chunk) in rows.chunks(self.chunk_size).enumerate() {
            let start = index * self.chunk_size;
            let end = start + chunk.len();
            info!("Inserting rows {} to {}", start, end);

            summary.rows_inserted += self.warehouse.append_rows(self.table, chunk).await?;
            summary.chunks_written += 1;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubsync_core::FieldValue;
    use hubsync_test_utils::{test_table, MockWarehouse};

    fn rows(n: i64) -> Vec<TransformedRecord> {
        (1..=n)
            .map(|id| TransformedRecord::new(vec![("ID".to_string(), FieldValue::Integer(id))]))
            .collect()
    }

    #[test]
    fn test_chunk_size_is_clamped() {
        let warehouse = MockWarehouse::new();
        let table = test_table();
        assert_eq!(Loader::new(&warehouse, &table, 0).chunk_size(), 1);
        assert_eq!(
            Loader::new(&warehouse, &table, 50_000).chunk_size(),
            MAX_LOAD_CHUNK_SIZE
        );
    }

    #[tokio::test]
    async fn test_load_splits_into_chunks() {
        let warehouse = MockWarehouse::new();
        let table = test_table();

        let summary = Loader::new(&warehouse, &table, 3)
            .load(&rows(7))
            .await
            .unwrap();

        assert_eq!(summary.rows_inserted, 7);
        assert_eq!(summary.chunks_written, 3);
        assert_eq!(warehouse.append_sizes(), vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_load_of_nothing_makes_no_calls() {
        let warehouse = MockWarehouse::new();
        let table = test_table();

        let summary = Loader::new(&warehouse, &table, 3).load(&[]).await.unwrap();

        assert_eq!(summary, LoadSummary::default());
        assert!(warehouse.append_sizes().is_empty());
    }
}
