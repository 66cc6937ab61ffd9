//! Record types that flow through a sync run.
//!
//! Every value here lives for a single run. The warehouse table is the only
//! state that survives it.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Ids already present in the warehouse table at run start.
pub type LocalIdSet = HashSet<i64>;

/// Remote ids absent from the warehouse, ordered for deterministic batching.
pub type NetNewIdSet = BTreeSet<i64>;

/// Parse a CRM object id. The API sends ids as JSON strings; numbers are
/// accepted as well.
pub fn parse_object_id(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// One membership entry from the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRecordRef {
    pub record_id: i64,
}

impl RemoteRecordRef {
    pub fn new(record_id: i64) -> Self {
        Self { record_id }
    }

    /// Build from a raw listing entry (`{"recordId": "123", ...}`).
    pub fn from_json(entry: &JsonValue) -> Option<Self> {
        entry
            .get("recordId")
            .and_then(parse_object_id)
            .map(Self::new)
    }
}

// ============================================================================
// DETAILED RECORDS
// ============================================================================

/// Full property set for one net-new id, as returned by the batch lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedRecord {
    pub id: i64,
    pub properties: Map<String, JsonValue>,
}

impl DetailedRecord {
    pub fn new(id: i64, properties: Map<String, JsonValue>) -> Self {
        Self { id, properties }
    }

    /// Raw property value rendered as text. JSON null and absent properties
    /// both yield `None`.
    pub fn property_text(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ============================================================================
// TRANSFORMED RECORDS
// ============================================================================

/// A single warehouse cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
    /// Instant carried with the target zone's offset at that instant.
    Timestamp(DateTime<FixedOffset>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

/// One warehouse row: uppercased column names in schema order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformedRecord {
    columns: Vec<(String, FieldValue)>,
}

impl TransformedRecord {
    pub fn new(columns: Vec<(String, FieldValue)>) -> Self {
        Self { columns }
    }

    /// Value of a column by exact name.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// The row's primary key, if the `ID` column holds an integer.
    pub fn id(&self) -> Option<i64> {
        match self.get(crate::schema::ID_COLUMN) {
            Some(FieldValue::Integer(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// TABLE REFERENCE
// ============================================================================

/// Schema-qualified warehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Quoted `"schema"."table"` form for SQL text.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Double-quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
