//! Record transformation for warehouse storage.
//!
//! Each detailed record goes through a fixed sequence of steps:
//!
//! 1. parse the timestamp properties into UTC instants (coercively)
//! 2. shift them into the target zone
//! 3. drop the CRM's own `hs_object_id`
//! 4. apply the rename table
//! 5. drop `hs_lastmodifieddate`
//! 6. uppercase every field name
//!
//! and is finally projected onto the fixed warehouse column set.

use chrono_tz::Tz;
use hubsync_core::schema::{
    renamed, target_columns, CREATED_AT_FIELD, ID_COLUMN, LAST_MODIFIED_FIELD, OBJECT_ID_FIELD,
};
use hubsync_core::{parse_utc, to_zone, DetailedRecord, FieldValue, TransformedRecord};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Field name → value while a record moves through the steps.
type Fields = BTreeMap<String, FieldValue>;

/// Properties converted to the target zone in step 1-2.
const TIMESTAMP_FIELDS: &[&str] = &[CREATED_AT_FIELD, LAST_MODIFIED_FIELD];

// ============================================================================
// TRANSFORMER
// ============================================================================

/// Shapes detailed records into warehouse rows.
#[derive(Debug, Clone)]
pub struct Transformer {
    zone: Tz,
    columns: Vec<String>,
}

impl Transformer {
    pub fn new(zone: Tz) -> Self {
        Self {
            zone,
            columns: target_columns(),
        }
    }

    /// Transform every record. Never fails: values that cannot be coerced
    /// become null.
    #[instrument(level = "info", skip_all, fields(records = records.len(), zone = %self.zone))]
    pub fn transform(&self, records: &[DetailedRecord]) -> Vec<TransformedRecord> {
        let rows: Vec<TransformedRecord> = records.iter().map(|r| self.transform_one(r)).collect();
        debug!(rows = rows.len(), "Transformed records");
        rows
    }

    /// Run one record through every step.
    pub fn transform_one(&self, record: &DetailedRecord) -> TransformedRecord {
        let fields = raw_fields(record);
        let fields = convert_timestamps(fields, self.zone);
        let fields = drop_object_id(fields);
        let fields = apply_renames(fields);
        let fields = drop_last_modified(fields);
        let fields = uppercase_names(fields);
        self.project(record.id, fields)
    }

    /// Lay the fields out in column order. Missing columns are null; fields
    /// outside the column set are discarded.
    fn project(&self, id: i64, mut fields: Fields) -> TransformedRecord {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let value = if column == ID_COLUMN {
                    FieldValue::Integer(id)
                } else {
                    fields.remove(column).unwrap_or(FieldValue::Null)
                };
                (column.clone(), value)
            })
            .collect();
        TransformedRecord::new(columns)
    }
}

// ============================================================================
// STEPS
// ============================================================================

fn raw_fields(record: &DetailedRecord) -> Fields {
    record
        .properties
        .keys()
        .map(|name| (name.clone(), FieldValue::from(record.property_text(name))))
        .collect()
}

fn convert_timestamps(mut fields: Fields, zone: Tz) -> Fields {
    for name in TIMESTAMP_FIELDS {
        if let Some(value) = fields.get_mut(*name) {
            let converted = value
                .as_text()
                .and_then(parse_utc)
                .map(|instant| to_zone(instant, zone));
            *value = converted.map_or(FieldValue::Null, FieldValue::Timestamp);
        }
    }
    fields
}

fn drop_object_id(mut fields: Fields) -> Fields {
    fields.remove(OBJECT_ID_FIELD);
    fields
}

fn apply_renames(fields: Fields) -> Fields {
    fields
        .into_iter()
        .map(|(name, value)| match renamed(&name) {
            Some(to) => (to.to_string(), value),
            None => (name, value),
        })
        .collect()
}

fn drop_last_modified(mut fields: Fields) -> Fields {
    fields.remove(LAST_MODIFIED_FIELD);
    fields
}

fn uppercase_names(fields: Fields) -> Fields {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_uppercase(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value as JsonValue};

    fn record(id: i64, props: JsonValue) -> DetailedRecord {
        let properties: Map<String, JsonValue> = props.as_object().cloned().unwrap_or_default();
        DetailedRecord::new(id, properties)
    }

    fn eastern() -> Transformer {
        Transformer::new(chrono_tz::US::Eastern)
    }

    #[test]
    fn test_created_date_is_converted_and_kept() {
        let row = eastern().transform_one(&record(
            9,
            json!({"hs_createdate": "2024-07-04T16:30:00.000Z"}),
        ));
        let ts = row.get("HS_CREATEDATE").and_then(FieldValue::as_timestamp).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-07-04T12:30:00-04:00");
    }

    #[test]
    fn test_created_date_with_compact_offset_is_converted() {
        let row = eastern().transform_one(&record(
            9,
            json!({"hs_createdate": "2024-07-04T16:30:00.000+0000"}),
        ));
        let ts = row.get("HS_CREATEDATE").and_then(FieldValue::as_timestamp).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-07-04T12:30:00-04:00");
    }

    #[test]
    fn test_unparseable_created_date_becomes_null() {
        let row = eastern().transform_one(&record(9, json!({"hs_createdate": "not a date"})));
        assert_eq!(row.get("HS_CREATEDATE"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_internal_fields_are_dropped() {
        let row = eastern().transform_one(&record(
            9,
            json!({
                "hs_object_id": "9",
                "hs_lastmodifieddate": "2024-07-05T09:15:00Z",
            }),
        ));
        assert!(row.get("HS_OBJECT_ID").is_none());
        assert!(row.get("HS_LASTMODIFIEDDATE").is_none());
        assert_eq!(row.id(), Some(9));
    }

    #[test]
    fn test_renames_then_uppercase() {
        let row = eastern().transform_one(&record(
            1,
            json!({
                "hubspot_score___profile_score": "87",
                "i_m_a___": "Tax Professional",
                "tax_id___contact": "12-345",
                "hubspot_contact_record_id": "900001",
            }),
        ));
        assert_eq!(row.get("PROFILE_SCORE"), Some(&FieldValue::Text("87".into())));
        assert_eq!(row.get("IM_A"), Some(&FieldValue::Text("Tax Professional".into())));
        assert_eq!(row.get("TAX_ID"), Some(&FieldValue::Text("12-345".into())));
        assert_eq!(row.get("HS_CONTACT_ID"), Some(&FieldValue::Text("900001".into())));
        assert!(row.get("HUBSPOT_SCORE___PROFILE_SCORE").is_none());
    }

    #[test]
    fn test_missing_properties_are_null_and_extras_dropped() {
        let row = eastern().transform_one(&record(
            3,
            json!({"company_name": "Acme", "surprise_field": "x", "url": null}),
        ));
        assert_eq!(row.len(), target_columns().len());
        assert_eq!(row.get("COMPANY_NAME"), Some(&FieldValue::Text("Acme".into())));
        assert!(row.get("URL").is_some_and(FieldValue::is_null));
        assert!(row.get("EVENT_NAME").is_some_and(FieldValue::is_null));
        assert!(row.get("SURPRISE_FIELD").is_none());
    }

    #[test]
    fn test_non_string_values_are_rendered_as_text() {
        let row = eastern().transform_one(&record(
            3,
            json!({"hubspot_score___activity_score": 12, "mql_activity": true}),
        ));
        assert_eq!(row.get("ACTIVITY_SCORE"), Some(&FieldValue::Text("12".into())));
        assert_eq!(row.get("MQL_ACTIVITY"), Some(&FieldValue::Text("true".into())));
    }
}
