use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::info;

use crate::error::Result;
use crate::schema::{column_definitions, validate_table_name, ColumnType, INDEXED_COLUMNS};

mod loader;
mod query;

pub use loader::{load_rows, LoadOptions, LoadSummary, MAX_BATCH_SIZE};
pub use query::{
    format_results, run_read_only, table_info, validate_read_only, PgBackend, QueryBackend,
    QueryResult, DEFAULT_QUERY_TIMEOUT, MAX_DISPLAY_ROWS,
};

pub type DbPool = Pool<Postgres>;

/// Opens the Postgres pool shared by the loader and the query commands.
pub async fn connect(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// `CREATE TABLE` plus one `CREATE INDEX` per indexed column, all idempotent.
pub fn create_table_statements(table: &str) -> Result<Vec<String>> {
    let table = validate_table_name(table)?;
    let columns = column_definitions(ColumnType::postgres).join(",\n    ");

    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    \
             id SERIAL PRIMARY KEY,\n    \
             {columns},\n    \
             created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\n\
         )"
    )];
    statements.extend(INDEXED_COLUMNS.iter().map(|column| {
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table} ({column})")
    }));
    Ok(statements)
}

pub async fn ensure_table(pool: &DbPool, table: &str) -> Result<()> {
    let statements = create_table_statements(table)?;
    let mut tx = pool.begin().await?;
    for statement in &statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!(table, "table ready");
    Ok(())
}
