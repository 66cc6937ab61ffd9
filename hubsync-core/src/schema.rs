//! Field catalog for the marketing engagement object.
//!
//! The CRM property list requested by the batch lookup, the rename table
//! applied before load, and the resulting warehouse column set.

// ============================================================================
// CRM PROPERTIES
// ============================================================================

/// Creation timestamp property, re-emitted in the target zone.
pub const CREATED_AT_FIELD: &str = "hs_createdate";

/// Last-modified timestamp property. Returned by the CRM, never persisted.
pub const LAST_MODIFIED_FIELD: &str = "hs_lastmodifieddate";

/// Object id echoed inside `properties`; duplicates the top-level id.
pub const OBJECT_ID_FIELD: &str = "hs_object_id";

/// Warehouse primary-key column.
pub const ID_COLUMN: &str = "ID";

/// Properties requested for every batch lookup.
pub const ENGAGEMENT_PROPERTIES: &[&str] = &[
    "hs_createdate",
    "company_name",
    "email_address",
    "email_name",
    "engagement_date",
    "first_name",
    "last_name",
    "form_name",
    "hubspot_contact_record_id",
    "icapture_lead_rating",
    "lead_source___most_recent",
    "marketing_engagement_type",
    "partner_of_interest",
    "salesforce_account_id",
    "salesforce_campaign_id",
    "salesforce_campaign_name",
    "salesforce_contact_id",
    "salesforce_lead_id",
    "url",
    "mql_activity",
    "hubspot_score___activity_score",
    "hubspot_score___profile___activity",
    "hubspot_score___profile_score",
    "hubspot_score___updated",
    "i_m_a___",
    "contact_record_type",
    "tax_id___contact",
    "event_name",
];

// ============================================================================
// RENAMES
// ============================================================================

/// Source property name to warehouse field name, applied before uppercasing.
pub const FIELD_RENAMES: &[(&str, &str)] = &[
    ("hubspot_contact_record_id", "hs_contact_id"),
    ("hubspot_score___profile_score", "profile_score"),
    ("i_m_a___", "im_a"),
    ("hubspot_score___activity_score", "activity_score"),
    ("hubspot_score___profile___activity", "profile_activity"),
    ("hubspot_score___updated", "updated_score"),
    ("tax_id___contact", "TAX_ID"),
    ("event_name", "EVENT_NAME"),
];

/// Look up the renamed field for a source property, if any.
pub fn renamed(field: &str) -> Option<&'static str> {
    FIELD_RENAMES
        .iter()
        .find(|(from, _)| *from == field)
        .map(|(_, to)| *to)
}

/// Warehouse column name for a source property: rename, then uppercase.
pub fn column_name(field: &str) -> String {
    renamed(field).unwrap_or(field).to_uppercase()
}

/// Full warehouse column set, `ID` first, then every requested property in
/// request order.
pub fn target_columns() -> Vec<String> {
    std::iter::once(ID_COLUMN.to_string())
        .chain(ENGAGEMENT_PROPERTIES.iter().map(|p| column_name(p)))
        .collect()
}
