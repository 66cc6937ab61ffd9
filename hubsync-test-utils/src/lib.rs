//! HUBSYNC Test Utilities
//!
//! Shared test infrastructure for the HUBSYNC workspace:
//! - In-memory CRM and warehouse doubles that record every call
//! - JSON fixtures shaped like real CRM payloads
//! - Proptest generators for ids, timestamps and raw property values

pub use hubsync_core::{
    CrmError, CrmResponse, CrmResult, CrmTransport, DetailedRecord, FieldValue, LocalIdSet,
    NetNewIdSet, SyncError, SyncResult, TableRef, TransformedRecord, WarehouseError,
    WarehouseHandle,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

// ============================================================================
// ENDPOINTS
// ============================================================================

pub const TEST_API_BASE: &str = "https://crm.test";
pub const TEST_LISTING_URL: &str = "https://crm.test/crm/v3/lists/9705/memberships";
pub const TEST_BATCH_URL: &str = "https://crm.test/crm/v3/objects/2-1234567/batch/read";

/// Default target table used by pipeline tests.
pub fn test_table() -> TableRef {
    TableRef::new("HUBSPOT", "MARKETING_ENGAGEMENTS")
}

// ============================================================================
// MOCK CRM
// ============================================================================

/// In-memory CRM.
///
/// GETs are answered from a URL → response map (unknown URLs get 404).
/// POSTs to the batch endpoint look up each requested id in a record store
/// and return the ones that exist. Individual POST calls can be scripted to
/// fail.
#[derive(Debug, Default)]
pub struct MockCrm {
    pages: RwLock<HashMap<String, CrmResponse>>,
    records: RwLock<BTreeMap<i64, Map<String, JsonValue>>>,
    post_failures: RwLock<HashMap<usize, u16>>,
    get_log: RwLock<Vec<String>>,
    post_log: RwLock<Vec<JsonValue>>,
}

impl MockCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `pages` as a linked listing starting at [`TEST_LISTING_URL`].
    pub fn with_listing(self, pages: &[&[i64]]) -> Self {
        for (index, ids) in pages.iter().enumerate() {
            let next = (index + 1 < pages.len()).then(|| page_url(index + 1));
            self.pages.write().unwrap().insert(
                page_url(index),
                CrmResponse::new(200, listing_page_json(ids, next.as_deref())),
            );
        }
        self
    }

    /// Replace the response for one listing page (0-based).
    pub fn with_page_response(self, index: usize, response: CrmResponse) -> Self {
        self.pages.write().unwrap().insert(page_url(index), response);
        self
    }

    /// Store a record served by batch lookups.
    pub fn with_record(self, id: i64, properties: Map<String, JsonValue>) -> Self {
        self.records.write().unwrap().insert(id, properties);
        self
    }

    /// Store [`engagement_properties`] for every id.
    pub fn with_engagements(self, ids: impl IntoIterator<Item = i64>) -> Self {
        for id in ids {
            self.records
                .write()
                .unwrap()
                .insert(id, engagement_properties(id));
        }
        self
    }

    /// Make the `call`-th POST (1-based) answer with `status`.
    pub fn fail_post_call(self, call: usize, status: u16) -> Self {
        self.post_failures.write().unwrap().insert(call, status);
        self
    }

    /// URLs requested with GET, in order.
    pub fn get_calls(&self) -> Vec<String> {
        self.get_log.read().unwrap().clone()
    }

    /// Raw bodies sent with POST, in order.
    pub fn post_bodies(&self) -> Vec<JsonValue> {
        self.post_log.read().unwrap().clone()
    }

    /// The ids of each POSTed batch, in order.
    pub fn posted_ids(&self) -> Vec<Vec<i64>> {
        self.post_log
            .read()
            .unwrap()
            .iter()
            .map(|body| requested_ids(body))
            .collect()
    }
}

#[async_trait]
impl CrmTransport for MockCrm {
    async fn get(&self, url: &str) -> CrmResult<CrmResponse> {
        self.get_log.write().unwrap().push(url.to_string());
        Ok(self
            .pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| CrmResponse::new(404, json!({"message": "not found"}))))
    }

    async fn post(&self, _url: &str, body: &JsonValue) -> CrmResult<CrmResponse> {
        let call = {
            let mut log = self.post_log.write().unwrap();
            log.push(body.clone());
            log.len()
        };

        if let Some(status) = self.post_failures.read().unwrap().get(&call) {
            return Ok(CrmResponse::new(*status, json!({"status": "error"})));
        }

        let records = self.records.read().unwrap();
        let results: Vec<JsonValue> = requested_ids(body)
            .into_iter()
            .filter_map(|id| {
                records.get(&id).map(|props| {
                    json!({
                        "id": id.to_string(),
                        "properties": props,
                        "createdAt": "2024-01-01T00:00:00Z",
                        "archived": false,
                    })
                })
            })
            .collect();

        Ok(CrmResponse::new(
            200,
            json!({"status": "COMPLETE", "results": results}),
        ))
    }
}

fn page_url(index: usize) -> String {
    if index == 0 {
        TEST_LISTING_URL.to_string()
    } else {
        format!("{}?after={}", TEST_LISTING_URL, index)
    }
}

fn requested_ids(body: &JsonValue) -> Vec<i64> {
    body.get("inputs")
        .and_then(JsonValue::as_array)
        .map(|inputs| {
            inputs
                .iter()
                .filter_map(|input| input.get("id").and_then(hubsync_core::parse_object_id))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// MOCK WAREHOUSE
// ============================================================================

/// In-memory warehouse table.
///
/// Appended rows also add their ids to the id set, so a second run against
/// the same instance sees the first run's writes.
#[derive(Debug, Default)]
pub struct MockWarehouse {
    ids: RwLock<LocalIdSet>,
    rows: RwLock<Vec<TransformedRecord>>,
    append_sizes: RwLock<Vec<usize>>,
    read_calls: RwLock<usize>,
    fail_read: bool,
    fail_append_call: Option<usize>,
}

impl MockWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `ids` already present.
    pub fn with_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let warehouse = Self::default();
        warehouse.ids.write().unwrap().extend(ids);
        warehouse
    }

    /// Make every `read_ids` call fail.
    pub fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }

    /// Make the `call`-th append (1-based) fail.
    pub fn failing_append(mut self, call: usize) -> Self {
        self.fail_append_call = Some(call);
        self
    }

    pub fn rows(&self) -> Vec<TransformedRecord> {
        self.rows.read().unwrap().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Row count of each append call, in order.
    pub fn append_sizes(&self) -> Vec<usize> {
        self.append_sizes.read().unwrap().clone()
    }

    pub fn read_calls(&self) -> usize {
        *self.read_calls.read().unwrap()
    }

    pub fn ids(&self) -> LocalIdSet {
        self.ids.read().unwrap().clone()
    }
}

#[async_trait]
impl WarehouseHandle for MockWarehouse {
    async fn read_ids(&self, table: &TableRef) -> SyncResult<LocalIdSet> {
        *self.read_calls.write().unwrap() += 1;
        if self.fail_read {
            return Err(WarehouseError::ReadFailed {
                table: table.to_string(),
                reason: "mock read failure".to_string(),
            }
            .into());
        }
        Ok(self.ids.read().unwrap().clone())
    }

    async fn append_rows(&self, table: &TableRef, rows: &[TransformedRecord]) -> SyncResult<u64> {
        let call = {
            let mut sizes = self.append_sizes.write().unwrap();
            sizes.push(rows.len());
            sizes.len()
        };

        if self.fail_append_call == Some(call) {
            return Err(WarehouseError::AppendFailed {
                table: table.to_string(),
                reason: "mock append failure".to_string(),
            }
            .into());
        }

        let mut ids = self.ids.write().unwrap();
        ids.extend(rows.iter().filter_map(TransformedRecord::id));
        self.rows.write().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Listing page body as returned by the memberships endpoint.
pub fn listing_page_json(ids: &[i64], next_link: Option<&str>) -> JsonValue {
    let results: Vec<JsonValue> = ids
        .iter()
        .map(|id| {
            json!({
                "recordId": id.to_string(),
                "membershipTimestamp": "2024-03-01T12:00:00.000Z",
            })
        })
        .collect();

    match next_link {
        Some(link) => json!({
            "results": results,
            "paging": {"next": {"after": "cursor", "link": link}},
        }),
        None => json!({"results": results}),
    }
}

/// Realistic property map for one marketing engagement, including the
/// fields the CRM adds on its own (`hs_object_id`, `hs_lastmodifieddate`).
pub fn engagement_properties(id: i64) -> Map<String, JsonValue> {
    let mut props = Map::new();
    let mut set = |k: &str, v: JsonValue| {
        props.insert(k.to_string(), v);
    };

    set("hs_object_id", json!(id.to_string()));
    set("hs_createdate", json!("2024-07-04T16:30:00.000Z"));
    set("hs_lastmodifieddate", json!("2024-07-05T09:15:00.000Z"));
    set("company_name", json!(format!("Company {}", id)));
    set("email_address", json!(format!("contact{}@example.com", id)));
    set("email_name", json!("Spring Newsletter"));
    set("engagement_date", json!("2024-07-04"));
    set("first_name", json!("Ada"));
    set("last_name", json!("Lovelace"));
    set("form_name", json!("Contact Us"));
    set("hubspot_contact_record_id", json!(format!("{}", 900_000 + id)));
    set("icapture_lead_rating", JsonValue::Null);
    set("lead_source___most_recent", json!("Webinar"));
    set("marketing_engagement_type", json!("Form Submission"));
    set("partner_of_interest", JsonValue::Null);
    set("salesforce_account_id", json!("0015e00000AbCdE"));
    set("salesforce_campaign_id", json!("7015e00000XyZ"));
    set("salesforce_campaign_name", json!("FY24 Webinar Series"));
    set("salesforce_contact_id", json!("0035e00000QwErT"));
    set("salesforce_lead_id", JsonValue::Null);
    set("url", json!("https://example.com/landing"));
    set("mql_activity", json!("true"));
    set("hubspot_score___activity_score", json!("12"));
    set("hubspot_score___profile___activity", json!("99"));
    set("hubspot_score___profile_score", json!("87"));
    set("hubspot_score___updated", json!("2024-07-05"));
    set("i_m_a___", json!("Tax Professional"));
    set("contact_record_type", json!("Customer"));
    set("tax_id___contact", JsonValue::Null);
    set("event_name", json!("Summer Summit"));
    props
}

/// A detailed record built from [`engagement_properties`].
pub fn engagement_record(id: i64) -> DetailedRecord {
    DetailedRecord::new(id, engagement_properties(id))
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Small positive id sets that overlap often.
pub fn id_set_strategy(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..500, 0..max_len)
}

/// UTC instants at second precision between 2000 and 2040, covering DST
/// transitions in both directions.
pub fn utc_instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800i64..2_208_988_800i64).prop_filter_map("valid timestamp", |secs| {
        Utc.timestamp_opt(secs, 0).single()
    })
}

/// Raw property values as the CRM may send them.
pub fn raw_value_strategy() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        Just(JsonValue::Null),
        "[A-Za-z0-9 @._-]{0,24}".prop_map(JsonValue::from),
        (0i64..10_000).prop_map(|n| json!(n)),
        any::<bool>().prop_map(JsonValue::from),
    ]
}
