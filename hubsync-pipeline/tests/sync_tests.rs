//! End-to-end sync runs against the in-memory CRM and warehouse.

use hubsync_core::schema::target_columns;
use hubsync_core::{AccessToken, Completeness, FailurePolicy, SyncConfig};
use hubsync_pipeline::{run_sync, Transformer};
use hubsync_test_utils::*;

fn test_config() -> SyncConfig {
    let token = AccessToken::new("pat-test".to_string()).expect("token");
    let mut config = SyncConfig::new(token, "2-1234567");
    config.api_base_url = TEST_API_BASE.to_string();
    config.warehouse.table = test_table();
    config
}

fn ids_of(rows: &[TransformedRecord]) -> Vec<i64> {
    rows.iter().filter_map(TransformedRecord::id).collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn test_only_net_new_ids_are_fetched_and_loaded() -> SyncResult<()> {
    let crm = MockCrm::new()
        .with_listing(&[&[2, 3], &[4, 5]])
        .with_engagements([2, 3, 4, 5]);
    let warehouse = MockWarehouse::with_ids([1, 2, 3]);

    let report = run_sync(&test_config(), &crm, &warehouse).await?;

    assert_eq!(crm.posted_ids(), vec![vec![4, 5]]);
    assert_eq!(ids_of(&warehouse.rows()), vec![4, 5]);
    assert_eq!(report.remote_count, 4);
    assert_eq!(report.local_count, 3);
    assert_eq!(report.net_new_count, 2);
    assert_eq!(report.rows_inserted, 2);
    assert!(report.is_complete());
    assert_eq!(report.to_string(), "Inserted 2 rows (complete)");
    assert_eq!(warehouse.read_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_profile_score_lands_in_renamed_column() -> SyncResult<()> {
    let crm = MockCrm::new().with_listing(&[&[42]]).with_engagements([42]);
    let warehouse = MockWarehouse::new();

    run_sync(&test_config(), &crm, &warehouse).await?;

    let rows = warehouse.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("PROFILE_SCORE"),
        Some(&FieldValue::Text("87".to_string()))
    );
    assert!(rows[0].get("HUBSPOT_SCORE___PROFILE_SCORE").is_none());
    Ok(())
}

#[tokio::test]
async fn test_created_date_is_written_in_eastern_time() -> SyncResult<()> {
    let crm = MockCrm::new().with_listing(&[&[7]]).with_engagements([7]);
    let warehouse = MockWarehouse::new();

    run_sync(&test_config(), &crm, &warehouse).await?;

    let rows = warehouse.rows();
    let created = rows[0]
        .get("HS_CREATEDATE")
        .and_then(FieldValue::as_timestamp)
        .expect("converted timestamp");
    assert_eq!(
        created.format("%Y-%m-%d %H:%M:%S %z").to_string(),
        "2024-07-04 12:30:00 -0400"
    );
    Ok(())
}

#[test]
fn test_fixture_record_transforms_like_a_fetched_one() {
    let row = Transformer::new(chrono_tz::US::Eastern).transform_one(&engagement_record(7));

    assert_eq!(row.id(), Some(7));
    assert_eq!(row.get("PROFILE_SCORE"), Some(&FieldValue::Text("87".into())));
    assert_eq!(
        row.get("UPDATED_SCORE"),
        Some(&FieldValue::Text("2024-07-05".into()))
    );
    assert!(row.get("TAX_ID").is_some_and(FieldValue::is_null));
    assert!(row.get("SALESFORCE_LEAD_ID").is_some_and(FieldValue::is_null));
    assert!(row.get("HS_CREATEDATE").is_some_and(|v| !v.is_null()));
    assert!(row.get("HS_LASTMODIFIEDDATE").is_none());
}

#[tokio::test]
async fn test_failed_detail_batch_keeps_earlier_rows() -> SyncResult<()> {
    let remote: Vec<i64> = (1..=250).collect();
    let crm = MockCrm::new()
        .with_listing(&[remote.as_slice()])
        .with_engagements(remote.iter().copied())
        .fail_post_call(2, 500);
    let warehouse = MockWarehouse::new();

    let report = run_sync(&test_config(), &crm, &warehouse).await?;

    assert_eq!(crm.posted_ids().len(), 2);
    assert_eq!(warehouse.row_count(), 100);
    assert_eq!(report.rows_inserted, 100);
    assert!(report.listing.is_complete());
    assert!(matches!(
        report.details,
        Completeness::Partial {
            policy: FailurePolicy::AbortKeepPartialOnError,
            ..
        }
    ));
    assert!(report.to_string().starts_with("Inserted 100 rows (partial:"));
    Ok(())
}

#[tokio::test]
async fn test_zero_net_new_never_invokes_loader() -> SyncResult<()> {
    let crm = MockCrm::new().with_listing(&[&[1, 2, 3]]);
    let warehouse = MockWarehouse::with_ids([1, 2, 3]);

    let report = run_sync(&test_config(), &crm, &warehouse).await?;

    assert_eq!(report.rows_inserted, 0);
    assert_eq!(report.to_string(), "Inserted 0 rows (complete)");
    assert!(warehouse.append_sizes().is_empty());
    assert!(crm.post_bodies().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_ids_missing_from_crm_produce_no_rows() -> SyncResult<()> {
    let crm = MockCrm::new().with_listing(&[&[8, 9]]);
    let warehouse = MockWarehouse::new();

    let report = run_sync(&test_config(), &crm, &warehouse).await?;

    assert_eq!(crm.posted_ids(), vec![vec![8, 9]]);
    assert_eq!(report.fetched_count, 0);
    assert!(warehouse.append_sizes().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_partial_listing_still_loads_what_was_listed() -> SyncResult<()> {
    let crm = MockCrm::new()
        .with_listing(&[&[1, 2], &[3, 4]])
        .with_page_response(1, CrmResponse::new(502, serde_json::Value::Null))
        .with_engagements([1, 2, 3, 4]);
    let warehouse = MockWarehouse::new();

    let report = run_sync(&test_config(), &crm, &warehouse).await?;

    assert_eq!(ids_of(&warehouse.rows()), vec![1, 2]);
    assert!(!report.listing.is_complete());
    assert!(report.details.is_complete());
    assert!(!report.is_complete());
    Ok(())
}

#[tokio::test]
async fn test_rows_are_appended_in_bounded_chunks() -> SyncResult<()> {
    let remote: Vec<i64> = (1..=25).collect();
    let crm = MockCrm::new()
        .with_listing(&[remote.as_slice()])
        .with_engagements(remote.iter().copied());
    let warehouse = MockWarehouse::new();
    let mut config = test_config();
    config.load_chunk_size = 10;

    let report = run_sync(&config, &crm, &warehouse).await?;

    assert_eq!(warehouse.append_sizes(), vec![10, 10, 5]);
    assert_eq!(report.chunks_written, 3);
    assert_eq!(report.rows_inserted, 25);
    Ok(())
}

#[tokio::test]
async fn test_every_row_has_the_target_columns() -> SyncResult<()> {
    let crm = MockCrm::new()
        .with_listing(&[&[1, 2]])
        .with_engagements([1])
        .with_record(2, serde_json::Map::new());
    let warehouse = MockWarehouse::new();

    run_sync(&test_config(), &crm, &warehouse).await?;

    let expected = target_columns();
    for row in warehouse.rows() {
        let names: Vec<String> = row.column_names().map(str::to_string).collect();
        assert_eq!(names, expected);
    }
    Ok(())
}

#[tokio::test]
async fn test_second_run_is_a_no_op() -> SyncResult<()> {
    let crm = MockCrm::new()
        .with_listing(&[&[1, 2, 3]])
        .with_engagements([1, 2, 3]);
    let warehouse = MockWarehouse::new();

    let first = run_sync(&test_config(), &crm, &warehouse).await?;
    let posts_after_first = crm.post_bodies().len();
    let second = run_sync(&test_config(), &crm, &warehouse).await?;

    assert_eq!(first.rows_inserted, 3);
    assert_eq!(second.rows_inserted, 0);
    assert_eq!(crm.post_bodies().len(), posts_after_first);
    assert_eq!(warehouse.row_count(), 3);
    assert_eq!(warehouse.read_calls(), 2);
    assert_eq!(warehouse.ids(), [1, 2, 3].into_iter().collect::<LocalIdSet>());
    Ok(())
}

// ============================================================================
// FATAL ERRORS
// ============================================================================

#[tokio::test]
async fn test_local_id_read_failure_is_fatal() {
    let crm = MockCrm::new().with_listing(&[&[1]]).with_engagements([1]);
    let warehouse = MockWarehouse::new().failing_read();

    let result = run_sync(&test_config(), &crm, &warehouse).await;

    assert!(matches!(
        result,
        Err(SyncError::Warehouse(WarehouseError::ReadFailed { .. }))
    ));
    assert!(crm.post_bodies().is_empty());
    assert!(warehouse.append_sizes().is_empty());
    assert_eq!(warehouse.read_calls(), 1);
}

#[tokio::test]
async fn test_append_failure_is_fatal_and_keeps_earlier_chunks() {
    let remote: Vec<i64> = (1..=5).collect();
    let crm = MockCrm::new()
        .with_listing(&[remote.as_slice()])
        .with_engagements(remote.iter().copied());
    let warehouse = MockWarehouse::new().failing_append(2);
    let mut config = test_config();
    config.load_chunk_size = 2;

    let result = run_sync(&config, &crm, &warehouse).await;

    assert!(matches!(
        result,
        Err(SyncError::Warehouse(WarehouseError::AppendFailed { .. }))
    ));
    assert_eq!(ids_of(&warehouse.rows()), vec![1, 2]);
    assert_eq!(warehouse.append_sizes(), vec![2, 2]);
}
