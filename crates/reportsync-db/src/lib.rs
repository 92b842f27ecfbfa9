mod tables;

use reportsync_core::{sanitize_identifier, DbConfig, ShapeError};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use thiserror::Error;

pub use tables::{create_table_sql, replace_table, validate_report, MAX_ROWS_PER_INSERT};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DB_NAME is empty")]
    MissingDatabaseName,
    #[error("report does not fit table {table}: {source}")]
    Shape {
        table: String,
        #[source]
        source: ShapeError,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connection options for the server itself, with no database selected.
fn server_options(config: &DbConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
}

/// Make sure the configured database exists and return a connection bound to it.
///
/// Connects without selecting a database, lists databases, creates the target
/// if it is missing, then reconnects with the target selected.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseName`] if no database is configured, or
/// [`DbError::Sqlx`] if connecting, listing, or creating fails.
pub async fn ensure_database(config: &DbConfig) -> Result<MySqlConnection, DbError> {
    let database = config.database.trim();
    if database.is_empty() {
        return Err(DbError::MissingDatabaseName);
    }

    let mut conn = MySqlConnection::connect_with(&server_options(config)).await?;

    // Raw bytes: some server versions report SHOW output with a binary collation.
    let names: Vec<Vec<u8>> = sqlx::query_scalar("SHOW DATABASES")
        .fetch_all(&mut conn)
        .await?;
    let exists = names
        .iter()
        .any(|name| String::from_utf8_lossy(name) == database);

    if !exists {
        let sql = format!("CREATE DATABASE IF NOT EXISTS {}", sanitize_identifier(database));
        sqlx::query(&sql).execute(&mut conn).await?;
        tracing::info!(database, "created database");
    }
    conn.close().await?;

    let conn = MySqlConnection::connect_with(&server_options(config).database(database)).await?;
    tracing::debug!(database, host = %config.host, "connected to database");
    Ok(conn)
}

/// Close a connection, logging instead of failing: the data is already committed.
pub async fn close_quietly(conn: MySqlConnection) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "failed to close database connection cleanly");
    }
}
