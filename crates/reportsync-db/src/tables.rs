//! Full-replace loading of a parsed report into its table.

use reportsync_core::{sanitize_identifier, CellValue, ColumnType, ParsedReport, ReportDefinition};
use sqlx::mysql::{MySql, MySqlConnection};
use sqlx::{Connection, QueryBuilder};

use crate::DbError;

/// MySQL caps prepared statements at 65 535 placeholders.
const MAX_BIND_PARAMS: usize = 65_535;

/// Upper bound on rows per `INSERT`, keeping statements under `max_allowed_packet`.
pub const MAX_ROWS_PER_INSERT: usize = 1_000;

/// `CREATE TABLE IF NOT EXISTS` with `columns` typed positionally by `types`.
///
/// `table` and `columns` must already be quoted identifiers.
#[must_use]
pub fn create_table_sql(table: &str, columns: &[String], types: &[ColumnType]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .zip(types)
        .map(|(column, ty)| format!("{column} {}", ty.sql()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        definitions.join(", ")
    )
}

/// Check that `report` fits the definition's positional schema.
///
/// # Errors
///
/// Returns [`DbError::Shape`] on a header-count or row-width mismatch.
pub fn validate_report(definition: &ReportDefinition, report: &ParsedReport) -> Result<(), DbError> {
    report
        .check_shape(definition.columns.len())
        .map_err(|source| DbError::Shape {
            table: definition.table_name.clone(),
            source,
        })
}

fn rows_per_statement(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
}

fn build_insert(
    table: &str,
    columns: &[String],
    rows: &[Vec<CellValue>],
) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {table} ({}) ",
        columns.join(", ")
    ));
    builder.push_values(rows, |mut b, row| {
        for cell in row {
            match cell {
                CellValue::Null => {
                    b.push_bind(None::<String>);
                }
                CellValue::Int(n) => {
                    b.push_bind(*n);
                }
                CellValue::Text(s) => {
                    b.push_bind(s.clone());
                }
            }
        }
    });
    builder
}

/// Replace the contents of the definition's table with `report`.
///
/// The report shape is validated before anything is dropped. The table is then
/// dropped, recreated with the fixed column types, and every coerced row is
/// inserted inside one transaction. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Shape`] for a malformed report, or [`DbError::Sqlx`]
/// if any statement fails. A failed insert rolls back all inserted rows; the
/// freshly created table stays empty.
pub async fn replace_table(
    conn: &mut MySqlConnection,
    definition: &ReportDefinition,
    report: &ParsedReport,
) -> Result<u64, DbError> {
    validate_report(definition, report)?;

    let table = sanitize_identifier(&definition.table_name);
    let columns = report.column_identifiers();

    sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
        .execute(&mut *conn)
        .await?;
    tracing::info!(table = %definition.table_name, "dropped existing table");

    sqlx::query(&create_table_sql(&table, &columns, &definition.columns))
        .execute(&mut *conn)
        .await?;

    let rows = report.coerced_rows();
    let mut tx = conn.begin().await?;
    let mut inserted = 0u64;
    for chunk in rows.chunks(rows_per_statement(columns.len())) {
        let result = build_insert(&table, &columns, chunk)
            .build()
            .execute(&mut *tx)
            .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;

    Ok(inserted)
}
