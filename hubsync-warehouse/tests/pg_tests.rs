//! Id reads and appends against a live warehouse.
//!
//! Run with `cargo test -p hubsync-warehouse --features db-tests` and the
//! `HUBSYNC_WAREHOUSE_*` variables pointing at a scratch database.

#![cfg(feature = "db-tests")]

use chrono::{FixedOffset, TimeZone};
use hubsync_core::{SyncConfig, SyncError, WarehouseError};
use hubsync_test_utils::*;
use hubsync_warehouse::PgWarehouse;

async fn scratch_table(suffix: &str) -> SyncResult<(PgWarehouse, TableRef)> {
    let config = SyncConfig::from_lookup(|key| match key {
        "HUBSYNC_ACCESS_TOKEN" => Some("unused".to_string()),
        "HUBSYNC_OBJECT_TYPE_ID" => Some("2-0".to_string()),
        other => std::env::var(other).ok(),
    })?;
    let warehouse = PgWarehouse::connect(&config.warehouse).await?;

    let table = TableRef::new("hubsync_test", format!("ENGAGEMENTS_{}", suffix));
    let conn = warehouse
        .pool()
        .get()
        .await
        .map_err(|e| WarehouseError::ConnectFailed {
            reason: e.to_string(),
        })?;
    let ddl = format!(
        "CREATE SCHEMA IF NOT EXISTS \"hubsync_test\";
         DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
             ID BIGINT PRIMARY KEY,
             HS_CREATEDATE TIMESTAMPTZ,
             PROFILE_SCORE INTEGER,
             EMAIL_NAME TEXT
         );",
        table = table.qualified()
    );
    conn.batch_execute(&ddl)
        .await
        .map_err(|e| WarehouseError::AppendFailed {
            table: table.to_string(),
            reason: e.to_string(),
        })?;

    Ok((warehouse, table))
}

fn row(id: i64, score: &str) -> TransformedRecord {
    let created = FixedOffset::west_opt(4 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 7, 4, 12, 30, 0)
        .unwrap();
    TransformedRecord::new(vec![
        ("ID".to_string(), FieldValue::Integer(id)),
        ("HS_CREATEDATE".to_string(), FieldValue::Timestamp(created)),
        ("PROFILE_SCORE".to_string(), FieldValue::Text(score.to_string())),
        ("EMAIL_NAME".to_string(), FieldValue::Null),
    ])
}

#[tokio::test]
async fn test_append_then_read_ids() -> SyncResult<()> {
    let (warehouse, table) = scratch_table("roundtrip").await?;

    assert!(warehouse.read_ids(&table).await?.is_empty());

    let written = warehouse
        .append_rows(&table, &[row(4, "87"), row(5, "12")])
        .await?;
    assert_eq!(written, 2);

    let ids = warehouse.read_ids(&table).await?;
    assert_eq!(ids, [4, 5].into_iter().collect::<LocalIdSet>());

    warehouse.close();
    Ok(())
}

#[tokio::test]
async fn test_failed_append_rolls_back_the_chunk() -> SyncResult<()> {
    let (warehouse, table) = scratch_table("rollback").await?;

    let result = warehouse
        .append_rows(&table, &[row(1, "87"), row(2, "not a number")])
        .await;
    assert!(matches!(
        result,
        Err(SyncError::Warehouse(WarehouseError::UnsupportedValue { .. }))
    ));
    assert!(warehouse.read_ids(&table).await?.is_empty());

    warehouse.close();
    Ok(())
}

#[tokio::test]
async fn test_missing_table_read_is_an_error() -> SyncResult<()> {
    let (warehouse, _) = scratch_table("present").await?;
    let missing = TableRef::new("hubsync_test", "NO_SUCH_TABLE");

    let result = warehouse.read_ids(&missing).await;
    assert!(matches!(
        result,
        Err(SyncError::Warehouse(WarehouseError::ReadFailed { .. }))
    ));

    warehouse.close();
    Ok(())
}
