//! Batched detail lookups
//!
//! Net-new ids are split into chunks of at most [`MAX_BATCH_SIZE`] and read
//! one chunk per request. The first failed chunk aborts the rest; rows from
//! chunks that already succeeded are kept
//! ([`FailurePolicy::AbortKeepPartialOnError`]).

use crate::types::{BatchInput, BatchReadRequest, BatchReadResponse};
use hubsync_core::{
    parse_object_id, CrmError, CrmTransport, DetailedRecord, FailurePolicy, FetchOutcome,
    NetNewIdSet, MAX_BATCH_SIZE,
};
use tracing::{debug, info, instrument, warn};

/// Reads full property sets for ids through the batch-read endpoint.
pub struct BatchFetcher<'a, T: CrmTransport + ?Sized> {
    transport: &'a T,
    url: String,
    properties: Vec<String>,
    batch_size: usize,
}

impl<'a, T: CrmTransport + ?Sized> BatchFetcher<'a, T> {
    /// Create a fetcher. `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(
        transport: &'a T,
        url: impl Into<String>,
        properties: &[&str],
        batch_size: usize,
    ) -> Self {
        Self {
            transport,
            url: url.into(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Look up every id, one request per chunk, in ascending id order.
    #[instrument(level = "info", skip(self, ids), fields(ids = ids.len(), batch_size = self.batch_size))]
    pub async fn fetch(&self, ids: &NetNewIdSet) -> FetchOutcome<DetailedRecord> {
        let ids: Vec<i64> = ids.iter().copied().collect();
        let chunks: Vec<&[i64]> = ids.chunks(self.batch_size).collect();
        let total = chunks.len();
        let mut records = Vec::with_capacity(ids.len());

        for (index, chunk) in chunks.into_iter().enumerate() {
            match self.fetch_chunk(chunk).await {
                Ok(batch) => {
                    debug!(chunk = index + 1, total, rows = batch.len(), "Fetched detail batch");
                    records.extend(batch);
                }
                Err(error) => {
                    let skipped = total - index - 1;
                    warn!(
                        chunk = index + 1,
                        total,
                        skipped,
                        kept = records.len(),
                        error = %error,
                        "Detail batch failed, skipping remaining batches"
                    );
                    return FetchOutcome::partial(
                        records,
                        FailurePolicy::AbortKeepPartialOnError,
                        format!(
                            "batch {} of {} failed ({}); {} batches skipped",
                            index + 1,
                            total,
                            error,
                            skipped
                        ),
                    );
                }
            }
        }

        info!(rows = records.len(), batches = total, "Detail fetch complete");
        FetchOutcome::complete(records)
    }

    async fn fetch_chunk(&self, chunk: &[i64]) -> Result<Vec<DetailedRecord>, CrmError> {
        let request = BatchReadRequest {
            properties: self.properties.clone(),
            inputs: chunk
                .iter()
                .map(|id| BatchInput { id: id.to_string() })
                .collect(),
        };
        let body = serde_json::to_value(&request).map_err(|e| CrmError::InvalidResponse {
            url: self.url.clone(),
            reason: format!("Failed to encode request: {}", e),
        })?;

        let response = self.transport.post(&self.url, &body).await?;
        if !response.is_ok() {
            return Err(CrmError::RequestFailed {
                url: self.url.clone(),
                status: response.status,
            });
        }

        let decoded: BatchReadResponse =
            serde_json::from_value(response.body).map_err(|e| CrmError::InvalidResponse {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(decoded
            .results
            .into_iter()
            .filter_map(|result| match parse_object_id(&result.id) {
                Some(id) => Some(DetailedRecord::new(id, result.properties)),
                None => {
                    warn!(id = %result.id, "Dropping batch result with non-integer id");
                    None
                }
            })
            .collect())
    }
}
