//! Statement text and parameter binding.
//!
//! Column names are emitted unquoted when they are plain identifiers so the
//! server folds them case-insensitively; anything else is quoted. Values are
//! bound according to the column type reported by the prepared statement.

use chrono::{DateTime, NaiveDate, Utc};
use hubsync_core::schema::ID_COLUMN;
use hubsync_core::{parse_utc, quote_ident, FieldValue, TableRef, WarehouseError};
use tokio_postgres::types::{ToSql, Type};

/// Parameter for one cell.
pub type SqlParam = Box<dyn ToSql + Sync + Send>;

/// Column reference that matches case-insensitively when possible.
pub fn column_ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if plain {
        name.to_string()
    } else {
        quote_ident(name)
    }
}

/// `SELECT CAST(ID AS BIGINT) FROM "schema"."table"`
pub fn select_ids_sql(table: &TableRef) -> String {
    format!(
        "SELECT CAST({} AS BIGINT) FROM {}",
        column_ident(ID_COLUMN),
        table.qualified()
    )
}

/// Single-row parameterized insert over `columns`.
pub fn insert_sql<'c>(table: &TableRef, columns: impl IntoIterator<Item = &'c str>) -> String {
    build_insert(table, columns, |i| format!("${}", i))
}

/// Insert over `columns` whose placeholders are cast where the column type
/// has no direct parameter binding. `types` are the parameter types the plain
/// statement reported, in column order.
pub fn insert_sql_for_types<'c>(
    table: &TableRef,
    columns: impl IntoIterator<Item = &'c str>,
    types: &[Type],
) -> String {
    build_insert(table, columns, |i| match types.get(i - 1) {
        Some(ty) if needs_text_cast(ty) => format!("${}::text::{}", i, ty.name()),
        _ => format!("${}", i),
    })
}

fn build_insert<'c>(
    table: &TableRef,
    columns: impl IntoIterator<Item = &'c str>,
    placeholder: impl Fn(usize) -> String,
) -> String {
    let columns: Vec<String> = columns.into_iter().map(column_ident).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(placeholder).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.qualified(),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Convert a cell into a parameter accepted by a column of type `ty`.
pub fn bind(column: &str, value: &FieldValue, ty: &Type) -> Result<SqlParam, WarehouseError> {
    let unsupported = |reason: String| WarehouseError::UnsupportedValue {
        column: column.to_string(),
        reason,
    };

    if is_text(ty) {
        return Ok(Box::new(render_text(value)));
    }

    if *ty == Type::INT8 || *ty == Type::INT4 || *ty == Type::INT2 {
        let parsed = match value {
            FieldValue::Null => None,
            FieldValue::Integer(v) => Some(*v),
            FieldValue::Text(s) => Some(
                s.trim()
                    .parse::<i64>()
                    .map_err(|_| unsupported(format!("'{}' is not an integer", s)))?,
            ),
            FieldValue::Timestamp(_) => {
                return Err(unsupported("timestamp bound to integer column".to_string()))
            }
        };
        return narrow_integer(parsed, ty).map_err(unsupported);
    }

    if *ty == Type::FLOAT8 || *ty == Type::FLOAT4 {
        let parsed = match value {
            FieldValue::Null => None,
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Text(s) => Some(
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| unsupported(format!("'{}' is not a number", s)))?,
            ),
            FieldValue::Timestamp(_) => {
                return Err(unsupported("timestamp bound to float column".to_string()))
            }
        };
        if *ty == Type::FLOAT4 {
            return Ok(Box::new(parsed.map(|v| v as f32)));
        }
        return Ok(Box::new(parsed));
    }

    if *ty == Type::BOOL {
        let parsed = match value {
            FieldValue::Null => None,
            FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => return Err(unsupported(format!("'{}' is not a boolean", s))),
            },
            other => return Err(unsupported(format!("{:?} bound to boolean column", other))),
        };
        return Ok(Box::new(parsed));
    }

    if *ty == Type::TIMESTAMPTZ {
        // Text is coerced the same way the transformer coerces; failures bind null.
        let param: SqlParam = match value {
            FieldValue::Timestamp(ts) => Box::new(Some(*ts)),
            other => Box::new(coerce_instant(other)),
        };
        return Ok(param);
    }

    if *ty == Type::TIMESTAMP {
        // Converted timestamps keep their wall-clock time; coerced text is UTC.
        let param: SqlParam = match value {
            FieldValue::Timestamp(ts) => Box::new(Some(ts.naive_local())),
            other => Box::new(coerce_instant(other).map(|ts| ts.naive_utc())),
        };
        return Ok(param);
    }

    if *ty == Type::DATE {
        let param: SqlParam = match value {
            FieldValue::Timestamp(ts) => Box::new(Some(ts.date_naive())),
            FieldValue::Text(s) => Box::new(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .ok()
                    .or_else(|| parse_utc(s).map(|ts| ts.date_naive())),
            ),
            FieldValue::Null | FieldValue::Integer(_) => Box::new(None::<NaiveDate>),
        };
        return Ok(param);
    }

    if *ty == Type::NUMERIC {
        return Err(unsupported(
            "numeric columns take a text parameter; prepare with insert_sql_for_types".to_string(),
        ));
    }

    Err(unsupported(format!("column type {} is not supported", ty.name())))
}

/// Whether a column of this type is written through a `::text::numeric` cast.
pub fn needs_text_cast(ty: &Type) -> bool {
    *ty == Type::NUMERIC
}

/// Instant for a text or epoch-millis cell, `None` when it does not parse.
fn coerce_instant(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Text(s) => parse_utc(s),
        FieldValue::Integer(millis) => parse_utc(&millis.to_string()),
        FieldValue::Timestamp(ts) => Some(ts.with_timezone(&Utc)),
        FieldValue::Null => None,
    }
}

fn is_text(ty: &Type) -> bool {
    *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
}

fn render_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Null => None,
        FieldValue::Integer(v) => Some(v.to_string()),
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S %z").to_string()),
    }
}

fn narrow_integer(value: Option<i64>, ty: &Type) -> Result<SqlParam, String> {
    if *ty == Type::INT8 {
        return Ok(Box::new(value));
    }
    if *ty == Type::INT4 {
        return value
            .map(i32::try_from)
            .transpose()
            .map(|v| Box::new(v) as SqlParam)
            .map_err(|_| "value out of range for integer column".to_string());
    }
    value
        .map(i16::try_from)
        .transpose()
        .map(|v| Box::new(v) as SqlParam)
        .map_err(|_| "value out of range for smallint column".to_string())
}
