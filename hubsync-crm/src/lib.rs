//! HUBSYNC CRM - Listing and Detail Fetch
//!
//! The two remote stages of a sync run and the HubSpot client they use.
//! Both stages are written against [`hubsync_core::CrmTransport`], so they
//! run unchanged over the real client or a test double.

pub mod batch;
pub mod client;
pub mod paginator;
pub mod types;

pub use batch::BatchFetcher;
pub use client::HubSpotClient;
pub use paginator::{PageFailure, Paginator};
