//! Live tests against a MySQL or MariaDB server.
//!
//! Ignored by default. Point `DB_HOST`, `DB_PORT`, `DB_USER` and `DB_PASSWORD`
//! at a server where the user may create databases, then run with
//! `--ignored`. The tests always use the `reportsync_test` database.

use reportsync_core::{
    load_app_config_from_env, DbConfig, ParsedReport, ReportDefinition, ReportKind,
};
use reportsync_db::{ensure_database, replace_table};
use sqlx::mysql::MySqlConnection;

const TEST_DATABASE: &str = "reportsync_test";

/// Each test loads its own table so they can run concurrently.
fn test_setup(table: &str) -> (DbConfig, ReportDefinition) {
    let mut config = load_app_config_from_env().expect("config from environment");
    config.db.database = TEST_DATABASE.to_string();
    let mut def = ReportDefinition::for_kind(ReportKind::BestSelling, &config);
    def.table_name = table.to_string();
    (config.db, def)
}

fn report(rows: &[[&str; 4]]) -> ParsedReport {
    ParsedReport {
        headers: ["Product Name", "Category", "Brand", "Units Sold"]
            .iter()
            .map(ToString::to_string)
            .collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(ToString::to_string).collect())
            .collect(),
    }
}

async fn fetch_all(
    conn: &mut MySqlConnection,
    table: &str,
) -> Vec<(String, Option<String>, Option<i32>)> {
    let sql = format!(
        "SELECT `Product_Name`, `Category`, `Units_Sold` FROM `{table}` ORDER BY `Product_Name`"
    );
    sqlx::query_as(&sql)
        .fetch_all(conn)
        .await
        .expect("select rows")
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn replace_table_inserts_coerced_rows() {
    let (db, def) = test_setup("live_insert_rows");
    let mut conn = ensure_database(&db).await.expect("connect");

    let inserted = replace_table(
        &mut conn,
        &def,
        &report(&[["Tea", "Drinks", "Acme", "12"], ["Mug", "", "Acme", ""]]),
    )
    .await
    .expect("replace");
    assert_eq!(inserted, 2);

    let rows = fetch_all(&mut conn, &def.table_name).await;
    assert_eq!(
        rows,
        vec![
            ("Mug".to_string(), None, None),
            ("Tea".to_string(), Some("Drinks".to_string()), Some(12)),
        ]
    );
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn second_load_replaces_previous_contents() {
    let (db, def) = test_setup("live_replace_rows");
    let mut conn = ensure_database(&db).await.expect("connect");

    replace_table(
        &mut conn,
        &def,
        &report(&[["Old", "x", "y", "1"], ["Older", "x", "y", "2"]]),
    )
    .await
    .expect("first load");
    replace_table(&mut conn, &def, &report(&[["New", "x", "y", "3"]]))
        .await
        .expect("second load");

    let rows = fetch_all(&mut conn, &def.table_name).await;
    assert_eq!(rows, vec![("New".to_string(), Some("x".to_string()), Some(3))]);
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn ensure_database_is_idempotent() {
    let (db, _) = test_setup("live_unused");
    let first = ensure_database(&db).await.expect("first connect");
    reportsync_db::close_quietly(first).await;
    let mut second = ensure_database(&db).await.expect("second connect");

    let current: Option<String> = sqlx::query_scalar("SELECT DATABASE()")
        .fetch_one(&mut second)
        .await
        .expect("select database");
    assert_eq!(current.as_deref(), Some(TEST_DATABASE));
}
