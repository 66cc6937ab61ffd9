//! CRM API request and response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

// ============================================================================
// LISTING TYPES
// ============================================================================

/// One page of list memberships.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub results: Vec<JsonValue>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl ListingPage {
    /// Absolute URL of the next page, if the API supplied one.
    pub fn next_link(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|n| n.link.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<NextPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextPage {
    pub link: String,
    #[serde(default)]
    pub after: Option<String>,
}

// ============================================================================
// BATCH READ TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BatchReadRequest {
    pub properties: Vec<String>,
    pub inputs: Vec<BatchInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInput {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchReadResponse {
    #[serde(default)]
    pub results: Vec<BatchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResult {
    pub id: JsonValue,
    #[serde(default)]
    pub properties: Map<String, JsonValue>,
}
