//! List membership pagination
//!
//! Walks the cursor links of the listing endpoint as a lazy stream of pages.
//! A failed page ends the stream: the run keeps what was already collected
//! ([`FailurePolicy::PartialOnError`]).

use crate::types::ListingPage;
use futures_util::stream::{self, Stream, StreamExt};
use hubsync_core::{
    CrmError, CrmTransport, FailurePolicy, FetchOutcome, RemoteRecordRef,
};
use std::fmt;
use tracing::{debug, instrument, warn};

/// A page that could not be fetched or decoded. Always the last stream item.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    /// 1-based page number
    pub page: usize,
    pub error: CrmError,
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}: {}", self.page, self.error)
    }
}

/// Cursor walker over a listing endpoint.
pub struct Paginator<'a, T: CrmTransport + ?Sized> {
    transport: &'a T,
    start_url: String,
}

impl<'a, T: CrmTransport + ?Sized> Paginator<'a, T> {
    pub fn new(transport: &'a T, start_url: impl Into<String>) -> Self {
        Self {
            transport,
            start_url: start_url.into(),
        }
    }

    /// Lazy stream of pages. Each item is the record refs of one page; the
    /// stream stops after the last page or right after the first failure.
    ///
    /// Cursor links expire on the CRM side, so a stream cannot be resumed.
    pub fn pages(
        &self,
    ) -> impl Stream<Item = Result<Vec<RemoteRecordRef>, PageFailure>> + '_ {
        stream::unfold(Some((self.start_url.clone(), 1usize)), move |cursor| async move {
            let (url, page) = cursor?;

            match self.fetch_page(&url).await {
                Ok(listing) => {
                    let next = listing.next_link().map(|link| (link.to_string(), page + 1));
                    let refs = records_of(&listing, page);
                    debug!(page, records = refs.len(), has_next = next.is_some(), "Fetched listing page");
                    Some((Ok(refs), next))
                }
                Err(error) => Some((Err(PageFailure { page, error }), None)),
            }
        })
    }

    /// Fold every page into one outcome.
    #[instrument(level = "info", skip(self), fields(start_url = %self.start_url))]
    pub async fn fetch_all(&self) -> FetchOutcome<RemoteRecordRef> {
        self.pages()
            .fold(FetchOutcome::complete(Vec::new()), |mut acc, page| async move {
                match page {
                    Ok(refs) => acc.items.extend(refs),
                    Err(failure) => {
                        warn!(
                            page = failure.page,
                            collected = acc.items.len(),
                            error = %failure.error,
                            "Listing pagination stopped early, continuing with partial ids"
                        );
                        acc = FetchOutcome::partial(
                            acc.items,
                            FailurePolicy::PartialOnError,
                            failure.to_string(),
                        );
                    }
                }
                acc
            })
            .await
    }

    async fn fetch_page(&self, url: &str) -> Result<ListingPage, CrmError> {
        let response = self.transport.get(url).await?;

        if !response.is_ok() {
            return Err(CrmError::RequestFailed {
                url: url.to_string(),
                status: response.status,
            });
        }

        serde_json::from_value(response.body).map_err(|e| CrmError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn records_of(listing: &ListingPage, page: usize) -> Vec<RemoteRecordRef> {
    let refs: Vec<_> = listing
        .results
        .iter()
        .filter_map(RemoteRecordRef::from_json)
        .collect();

    let skipped = listing.results.len() - refs.len();
    if skipped > 0 {
        warn!(page, skipped, "Skipped listing entries without an integer recordId");
    }

    refs
}
