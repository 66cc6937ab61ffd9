//! PostgreSQL-protocol warehouse backend
//!
//! Pooled connections via deadpool-postgres. Each `append_rows` call is one
//! transaction: a prepared single-row insert executed once per row, then
//! committed. Numeric columns are re-prepared with a text cast.

use crate::sql::{
    bind, insert_sql, insert_sql_for_types, needs_text_cast, select_ids_sql, SqlParam,
};
use async_trait::async_trait;
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use hubsync_core::{
    LocalIdSet, SyncResult, TableRef, TransformedRecord, WarehouseConfig, WarehouseError,
    WarehouseHandle,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tracing::{debug, error, info, instrument};

// ============================================================================
// CONNECTION POOL
// ============================================================================

/// Build a connection pool from configuration.
pub fn create_pool(config: &WarehouseConfig) -> Result<Pool, WarehouseError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.dbname = Some(config.dbname.clone());
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let mut pool_config = PoolConfig::new(config.max_size);
    pool_config.timeouts = Timeouts {
        wait: Some(config.timeout),
        create: Some(config.timeout),
        recycle: Some(config.timeout),
    };
    cfg.pool = Some(pool_config);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| WarehouseError::ConnectFailed {
            reason: format!("Failed to create pool: {}", e),
        })
}

// ============================================================================
// WAREHOUSE CLIENT
// ============================================================================

/// Warehouse handle over a PostgreSQL-protocol pool.
#[derive(Clone)]
pub struct PgWarehouse {
    pool: Pool,
}

impl PgWarehouse {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the pool and check out one connection so bad credentials or an
    /// unreachable host fail before any CRM traffic.
    #[instrument(level = "info", skip(config), fields(host = %config.host, dbname = %config.dbname))]
    pub async fn connect(config: &WarehouseConfig) -> SyncResult<Self> {
        let warehouse = Self::new(create_pool(config)?);
        warehouse.get_conn().await?;
        info!("Warehouse connection established");
        Ok(warehouse)
    }

    /// Underlying pool, for administrative statements.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Close the pool. Outstanding connections are dropped when returned.
    pub fn close(&self) {
        self.pool.close();
        debug!("Warehouse pool closed");
    }

    async fn get_conn(&self) -> Result<deadpool_postgres::Object, WarehouseError> {
        self.pool.get().await.map_err(|e| {
            error!("Connection pool error: {:?}", e);
            WarehouseError::ConnectFailed {
                reason: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl WarehouseHandle for PgWarehouse {
    #[instrument(level = "info", skip(self), fields(table = %table))]
    async fn read_ids(&self, table: &TableRef) -> SyncResult<LocalIdSet> {
        let read_failed = |e: tokio_postgres::Error| {
            error!("Warehouse read error: {:?}", e);
            WarehouseError::ReadFailed {
                table: table.to_string(),
                reason: e.to_string(),
            }
        };

        let conn = self.get_conn().await?;
        let rows = conn
            .query(select_ids_sql(table).as_str(), &[])
            .await
            .map_err(read_failed)?;

        let mut ids = LocalIdSet::with_capacity(rows.len());
        for row in &rows {
            if let Some(id) = row.try_get::<_, Option<i64>>(0).map_err(read_failed)? {
                ids.insert(id);
            }
        }

        info!(ids = ids.len(), "Loaded existing ids");
        Ok(ids)
    }

    #[instrument(level = "debug", skip(self, rows), fields(table = %table, rows = rows.len()))]
    async fn append_rows(&self, table: &TableRef, rows: &[TransformedRecord]) -> SyncResult<u64> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };

        let append_failed = |e: tokio_postgres::Error| {
            error!("Warehouse append error: {:?}", e);
            WarehouseError::AppendFailed {
                table: table.to_string(),
                reason: e.to_string(),
            }
        };

        let columns: Vec<&str> = first.column_names().collect();
        let sql = insert_sql(table, columns.iter().copied());

        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(append_failed)?;
        let mut statement = tx.prepare(&sql).await.map_err(append_failed)?;
        if statement.params().iter().any(needs_text_cast) {
            let cast_sql =
                insert_sql_for_types(table, columns.iter().copied(), statement.params());
            statement = tx.prepare(&cast_sql).await.map_err(append_failed)?;
        }
        let types = statement.params().to_vec();

        let mut written = 0u64;
        for row in rows {
            if row.len() != columns.len() || !row.column_names().eq(columns.iter().copied()) {
                return Err(WarehouseError::AppendFailed {
                    table: table.to_string(),
                    reason: format!("row {} does not match the chunk's column set", written),
                }
                .into());
            }

            let params = row
                .column_names()
                .zip(row.values())
                .zip(types.iter())
                .map(|((column, value), ty)| bind(column, value, ty))
                .collect::<Result<Vec<SqlParam>, _>>()?;
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();

            written += tx.execute(&statement, &refs).await.map_err(append_failed)?;
        }

        tx.commit().await.map_err(append_failed)?;
        Ok(written)
    }
}

impl std::fmt::Debug for PgWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgWarehouse")
            .field("pool_size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}
