//! One report run: token, fetch, parse, connect, load.
//!
//! Every stage is wrapped in the report's [`RetryPolicy`]. The acquisition
//! half (token, fetch, parse) restarts from the token stage when the parsed
//! report has no data rows or cannot be parsed, since the same bytes would
//! fail again. A failed load drops its connection and the next load attempt
//! reconnects.

use anyhow::bail;
use reportsync_analytics::AnalyticsClient;
use reportsync_core::{
    parse_report, AccessToken, AppConfig, DbConfig, ParsedReport, ReportDefinition, ReportKind,
    RetryPolicy, Sleeper,
};
use sqlx::mysql::MySqlConnection;
use tokio::sync::Mutex;
use tracing::Instrument;

/// Where report bytes come from.
pub(crate) trait ReportSource {
    async fn access_token(&self) -> anyhow::Result<AccessToken>;

    async fn report_bytes(
        &self,
        definition: &ReportDefinition,
        token: &AccessToken,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Where parsed reports end up.
pub(crate) trait ReportSink {
    type Connection;

    async fn connect(&self) -> anyhow::Result<Self::Connection>;

    /// Replace the definition's table with `report`; returns rows inserted.
    async fn replace(
        &self,
        conn: &mut Self::Connection,
        definition: &ReportDefinition,
        report: &ParsedReport,
    ) -> anyhow::Result<u64>;

    async fn close(&self, conn: Self::Connection);
}

impl ReportSource for AnalyticsClient {
    async fn access_token(&self) -> anyhow::Result<AccessToken> {
        Ok(self.fetch_access_token().await?)
    }

    async fn report_bytes(
        &self,
        definition: &ReportDefinition,
        token: &AccessToken,
    ) -> anyhow::Result<Vec<u8>> {
        Ok(self.fetch_report(definition, token).await?)
    }
}

pub(crate) struct MySqlSink {
    db: DbConfig,
}

impl MySqlSink {
    pub(crate) fn new(db: DbConfig) -> Self {
        Self { db }
    }
}

impl ReportSink for MySqlSink {
    type Connection = MySqlConnection;

    async fn connect(&self) -> anyhow::Result<MySqlConnection> {
        Ok(reportsync_db::ensure_database(&self.db).await?)
    }

    async fn replace(
        &self,
        conn: &mut MySqlConnection,
        definition: &ReportDefinition,
        report: &ParsedReport,
    ) -> anyhow::Result<u64> {
        Ok(reportsync_db::replace_table(conn, definition, report).await?)
    }

    async fn close(&self, conn: MySqlConnection) {
        reportsync_db::close_quietly(conn).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub report: ReportKind,
    pub table: String,
    pub rows_loaded: u64,
}

/// Run the production pipeline for `kind`, retrying forever.
pub(crate) async fn run_report(kind: ReportKind, config: &AppConfig) -> anyhow::Result<RunSummary> {
    let definition = ReportDefinition::for_kind(kind, config);
    let client = AnalyticsClient::new(config)?;
    let sink = MySqlSink::new(config.db.clone());
    let policy = RetryPolicy::forever(definition.retry_delay);
    run_pipeline(&definition, &client, &sink, &policy).await
}

/// Drive one report through every stage.
///
/// # Errors
///
/// Only a bounded `policy` can make this return an error, once a stage has
/// used up its attempts.
pub(crate) async fn run_pipeline<Src, Snk, S>(
    definition: &ReportDefinition,
    source: &Src,
    sink: &Snk,
    policy: &RetryPolicy<S>,
) -> anyhow::Result<RunSummary>
where
    Src: ReportSource,
    Snk: ReportSink,
    S: Sleeper,
{
    let span = tracing::info_span!("pipeline", report = definition.label);
    async move {
        tracing::info!(table = %definition.table_name, "starting run");

        let report = acquire_report(definition, source, policy).await?;
        tracing::info!(
            columns = report.headers.len(),
            rows = report.rows.len(),
            "report parsed"
        );

        let conn = policy.run("connect", || sink.connect()).await?;
        tracing::info!("database connected");

        // Emptied when a load fails, so the next attempt starts on a fresh connection.
        let slot = Mutex::new(Some(conn));
        let rows_loaded = {
            let (slot, report) = (&slot, &report);
            policy
                .run("load", || async move {
                    report.check_shape(definition.columns.len())?;
                    let mut slot = slot.lock().await;
                    let mut conn = match slot.take() {
                        Some(conn) => conn,
                        None => {
                            tracing::info!("reconnecting to database before retrying load");
                            sink.connect().await?
                        }
                    };
                    let rows = sink.replace(&mut conn, definition, report).await?;
                    *slot = Some(conn);
                    Ok::<_, anyhow::Error>(rows)
                })
                .await?
        };
        if let Some(conn) = slot.into_inner() {
            sink.close(conn).await;
        }

        tracing::info!(rows_loaded, table = %definition.table_name, "table replaced");
        Ok::<_, anyhow::Error>(RunSummary {
            report: definition.kind,
            table: definition.table_name.clone(),
            rows_loaded,
        })
    }
    .instrument(span)
    .await
}

/// Token, fetch and parse until a report with at least one data row comes back.
async fn acquire_report<Src, S>(
    definition: &ReportDefinition,
    source: &Src,
    policy: &RetryPolicy<S>,
) -> anyhow::Result<ParsedReport>
where
    Src: ReportSource,
    S: Sleeper,
{
    let report = policy
        .run("parse", || async move {
            let token = policy.run("token", || source.access_token()).await?;
            tracing::info!("access token acquired");

            let bytes = policy
                .run("fetch", || source.report_bytes(definition, &token))
                .await?;
            tracing::info!(bytes = bytes.len(), "report fetched");

            let report = parse_report(&bytes, definition.row_limit)?;
            if report.is_empty() {
                bail!("report has headers but no data rows");
            }
            Ok::<_, anyhow::Error>(report)
        })
        .await?;
    Ok(report)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
