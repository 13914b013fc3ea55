use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use tracing::{info, warn};

use super::{ensure_table, DbPool};
use crate::error::{PipelineError, Result};
use crate::schema::{column_names, validate_table_name, TIDY_COLUMNS};
use crate::tidy::TidyRow;

/// Largest batch whose bind parameters fit in one Postgres statement.
pub const MAX_BATCH_SIZE: usize = u16::MAX as usize / TIDY_COLUMNS.len();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub batch_size: usize,
    /// Run the idempotent table/index DDL before inserting.
    pub create_table: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            create_table: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub attempted: usize,
    pub inserted: usize,
    pub failed: usize,
    pub batches: usize,
}

/// Inserts tidy rows in multi-row batches.
///
/// A batch that fails as a whole is replayed one row at a time so a single bad record
/// only costs itself. Per-row failures are counted and logged, not returned.
pub async fn load_rows(
    pool: &DbPool,
    table: &str,
    rows: &[TidyRow],
    options: &LoadOptions,
) -> Result<LoadSummary> {
    let table = validate_table_name(table)?;
    if options.batch_size == 0 || options.batch_size > MAX_BATCH_SIZE {
        return Err(PipelineError::Validation(format!(
            "batch size must be between 1 and {MAX_BATCH_SIZE}"
        )));
    }
    if options.create_table {
        ensure_table(pool, table).await?;
    }

    let total_batches = rows.len().div_ceil(options.batch_size);
    let mut summary = LoadSummary {
        attempted: rows.len(),
        ..LoadSummary::default()
    };

    for (index, batch) in rows.chunks(options.batch_size).enumerate() {
        let number = index + 1;
        summary.batches += 1;

        match insert_batch(pool, table, batch).await {
            Ok(inserted) => {
                summary.inserted += inserted;
                info!(batch = number, total_batches, rows = inserted, "batch inserted");
            }
            Err(err) => {
                warn!(batch = number, error = %err, "batch insert failed; retrying row by row");
                for (offset, row) in batch.iter().enumerate() {
                    match insert_batch(pool, table, std::slice::from_ref(row)).await {
                        Ok(inserted) => summary.inserted += inserted,
                        Err(err) => {
                            summary.failed += 1;
                            warn!(
                                batch = number,
                                record = offset + 1,
                                store = %row.store_name,
                                error = %err,
                                "record insert failed"
                            );
                        }
                    }
                }
            }
        }
    }

    info!(
        table,
        attempted = summary.attempted,
        inserted = summary.inserted,
        failed = summary.failed,
        "load finished"
    );
    Ok(summary)
}

async fn insert_batch(pool: &DbPool, table: &str, rows: &[TidyRow]) -> sqlx::Result<usize> {
    let mut builder = insert_statement(table, rows);
    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected() as usize)
}

fn insert_statement<'args>(table: &str, rows: &'args [TidyRow]) -> QueryBuilder<'args, Postgres> {
    let columns: Vec<&str> = column_names().collect();
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("INSERT INTO {table} ({}) ", columns.join(", ")));

    builder.push_values(rows, |mut values, row| {
        values
            .push_bind(row.store_name.as_str())
            .push_bind(row.parameter.as_str())
            .push_bind(row.cafe_code.as_deref())
            .push_bind(row.region.as_deref())
            .push_bind(row.category.as_deref())
            .push_bind(row.for_ssg.as_deref())
            .push_bind(row.area_store)
            .push_bind(row.store_start_date)
            .push_bind(row.vintage.as_deref())
            .push_bind(row.month)
            .push_bind(row.value);
    });
    builder
}
