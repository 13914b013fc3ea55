use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row};
use tracing::debug;

use super::DbPool;
use crate::error::{PipelineError, Result};
use crate::schema::validate_table_name;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(120);
/// Rows printed by [`format_results`]; the rest are only counted.
pub const MAX_DISPLAY_ROWS: usize = 1000;
const COLUMN_WIDTH: usize = 15;
const SAMPLE_ROWS: usize = 5;

/// Column names plus every row rendered as text (`None` for SQL NULL).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// The one capability a store must offer to be queried: run SQL, return rows as text.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult>;
}

/// Postgres backend. Every statement runs in a read-only transaction that is rolled back.
#[derive(Clone)]
pub struct PgBackend {
    pool: DbPool,
    timeout: Duration,
}

impl PgBackend {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<PgRow>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        // Simple-protocol results arrive in text format, so any column type reads as a string.
        let rows = sqlx::Executor::fetch_all(&mut *tx, sqlx::raw_sql(sql)).await?;
        tx.rollback().await?;
        Ok(rows)
    }
}

#[async_trait]
impl QueryBackend for PgBackend {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let rows = tokio::time::timeout(self.timeout, self.fetch(sql))
            .await
            .map_err(|_| PipelineError::QueryTimeout {
                seconds: self.timeout.as_secs(),
            })??;

        let columns: Vec<String> = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                cells.push(row.try_get_unchecked::<Option<String>, _>(index)?);
            }
            decoded.push(cells);
        }

        debug!(rows = decoded.len(), "query executed");
        Ok(QueryResult {
            columns,
            rows: decoded,
        })
    }
}

/// Accepts a single SELECT or WITH statement and returns it without leading comments or
/// trailing semicolons.
pub fn validate_read_only(sql: &str) -> Result<&str> {
    let mut statement = strip_leading_comments(sql).trim_end();
    while let Some(stripped) = statement.strip_suffix(';') {
        statement = stripped.trim_end();
    }

    if statement.is_empty() {
        return Err(PipelineError::ReadOnlyViolation {
            reason: "query is empty".into(),
        });
    }
    if has_statement_separator(statement) {
        return Err(PipelineError::ReadOnlyViolation {
            reason: "multiple statements are not allowed".into(),
        });
    }

    let keyword = statement
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if keyword != "SELECT" && keyword != "WITH" {
        return Err(PipelineError::ReadOnlyViolation {
            reason: format!("statement starts with '{keyword}'"),
        });
    }

    Ok(statement)
}

fn strip_leading_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |end| &rest[end + 1..]);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |end| &rest[end + 2..]);
        } else {
            return sql;
        }
    }
}

/// True when a `;` appears outside quoted text and comments.
fn has_statement_separator(sql: &str) -> bool {
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                for next in chars.by_ref() {
                    if next == ch {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            ';' => return true,
            _ => {}
        }
    }
    false
}

/// Validates `sql` as read-only, runs it and formats the result.
pub async fn run_read_only<B>(backend: &B, sql: &str) -> Result<String>
where
    B: QueryBackend + ?Sized,
{
    let statement = validate_read_only(sql)?;
    let result = backend.execute(statement).await?;
    Ok(format_results(&result))
}

/// Renders rows as a right-aligned text table.
///
/// Cells are padded to 15 characters and separated by `" | "`, under a dash rule as wide
/// as the header. Only the first [`MAX_DISPLAY_ROWS`] rows are printed, followed by a
/// note about the remainder and the total count.
pub fn format_results(result: &QueryResult) -> String {
    if result.rows.is_empty() {
        return "No results found".to_string();
    }

    let header = join_padded(result.columns.iter().map(String::as_str));
    let rule = "-".repeat(header.chars().count());
    let mut lines = Vec::with_capacity(result.rows.len().min(MAX_DISPLAY_ROWS) + 6);
    lines.push(header);
    lines.push(rule);

    for row in result.rows.iter().take(MAX_DISPLAY_ROWS) {
        lines.push(join_padded(
            row.iter().map(|cell| cell.as_deref().unwrap_or("NULL")),
        ));
    }

    let total = result.rows.len();
    if total > MAX_DISPLAY_ROWS {
        lines.push(String::new());
        lines.push(format!("... and {} more rows", total - MAX_DISPLAY_ROWS));
    }
    lines.push(String::new());
    lines.push(format!("Total rows: {total}"));

    lines.join("\n")
}

fn join_padded<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .map(|cell| format!("{cell:>width$}", width = COLUMN_WIDTH))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Row count and a small sample of `table`.
pub async fn table_info<B>(backend: &B, table: &str) -> Result<String>
where
    B: QueryBackend + ?Sized,
{
    let table = validate_table_name(table)?;

    let count = backend
        .execute(&format!("SELECT COUNT(*) AS total_rows FROM {table}"))
        .await?;
    let total: u64 = count
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(|cell| cell.as_deref())
        .and_then(|cell| cell.trim().parse().ok())
        .ok_or_else(|| {
            PipelineError::Validation(format!("could not read row count for table {table}"))
        })?;

    let sample = backend
        .execute(&format!("SELECT * FROM {table} LIMIT {SAMPLE_ROWS}"))
        .await?;

    Ok(format!(
        "Table: {table}\nTotal rows: {}\nSample data:\n{}",
        group_thousands(total),
        format_results(&sample)
    ))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_accepts_select_and_with() {
        assert_eq!(validate_read_only("  select 1;  ").unwrap(), "select 1");
        assert!(validate_read_only("WITH t AS (SELECT 1) SELECT * FROM t").is_ok());
        assert!(validate_read_only("SELECT\n*\nFROM mis_long;;").is_ok());
    }

    #[test]
    fn guard_ignores_semicolons_in_literals_and_leading_comments() {
        assert_eq!(
            validate_read_only("SELECT * FROM mis_long WHERE store_name = 'A;B'").unwrap(),
            "SELECT * FROM mis_long WHERE store_name = 'A;B'"
        );
        assert!(validate_read_only(r#"SELECT 1 AS "a;b""#).is_ok());
        assert!(validate_read_only("SELECT 'it''s; fine'").is_ok());
        assert_eq!(
            validate_read_only("-- monthly revenue\nSELECT 1;").unwrap(),
            "SELECT 1"
        );
        assert_eq!(
            validate_read_only("/* note; here */ WITH t AS (SELECT 1) SELECT * FROM t").unwrap(),
            "WITH t AS (SELECT 1) SELECT * FROM t"
        );
        assert!(validate_read_only("SELECT 1 -- trailing; note\nFROM mis_long").is_ok());
    }

    #[test]
    fn guard_rejects_writes_and_batches() {
        for sql in [
            "",
            ";",
            "DELETE FROM mis_long",
            "drop table mis_long",
            "SELECT 1; DELETE FROM mis_long",
            "selectivity",
            "EXPLAIN ANALYZE DELETE FROM mis_long",
            "SELECT 1; COMMIT; DELETE FROM mis_long",
            "SELECT 'a'; DELETE FROM mis_long",
            "-- only a comment",
            "/* SELECT */ DELETE FROM mis_long",
        ] {
            assert!(
                matches!(
                    validate_read_only(sql),
                    Err(PipelineError::ReadOnlyViolation { .. })
                ),
                "accepted {sql:?}"
            );
        }
    }

    #[test]
    fn results_are_right_aligned_with_rule_and_total() {
        let result = QueryResult {
            columns: vec!["region".into(), "total".into()],
            rows: vec![
                vec![Some("South".into()), Some("3500.5".into())],
                vec![Some("West".into()), None],
            ],
        };

        let text = format_results(&result);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("{:>15} | {:>15}", "region", "total"));
        assert_eq!(lines[1], "-".repeat(33));
        assert_eq!(lines[2], format!("{:>15} | {:>15}", "South", "3500.5"));
        assert_eq!(lines[3], format!("{:>15} | {:>15}", "West", "NULL"));
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Total rows: 2");
    }

    #[test]
    fn long_results_are_capped() {
        let result = QueryResult {
            columns: vec!["n".into()],
            rows: (0..1005).map(|n| vec![Some(n.to_string())]).collect(),
        };
        let text = format_results(&result);
        assert_eq!(text.lines().count(), 2 + MAX_DISPLAY_ROWS + 4);
        assert!(text.contains("\n\n... and 5 more rows\n\nTotal rows: 1005"));
    }

    #[test]
    fn empty_results_have_fixed_message() {
        assert_eq!(format_results(&QueryResult::default()), "No results found");
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
