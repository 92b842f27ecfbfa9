//! Report definitions: everything that differs between the two synced reports.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::app_config::{AppConfig, ReportSource};
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Analytics,
    BestSelling,
}

impl ReportKind {
    pub const ALL: [ReportKind; 2] = [ReportKind::Analytics, ReportKind::BestSelling];

    /// Name used on the command line and in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Analytics => "analytics",
            ReportKind::BestSelling => "best-selling",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analytics" => Ok(ReportKind::Analytics),
            "best-selling" | "best_selling" | "bestselling" => Ok(ReportKind::BestSelling),
            _ => Err(ConfigError::UnknownReport(s.to_string())),
        }
    }
}

/// How the report body is obtained from the analytics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// One GET returns the CSV body.
    Sync,
    /// One GET creates a bulk export job, a second GET downloads its CSV.
    Job,
}

/// Prefix used in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    ZohoOauthToken,
}

impl AuthScheme {
    #[must_use]
    pub fn header_value(self, token: &str) -> String {
        match self {
            AuthScheme::Bearer => format!("Bearer {token}"),
            AuthScheme::ZohoOauthToken => format!("Zoho-oauthtoken {token}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Varchar(u16),
    Int,
}

impl ColumnType {
    #[must_use]
    pub fn sql(self) -> String {
        match self {
            ColumnType::Varchar(len) => format!("VARCHAR({len})"),
            ColumnType::Int => "INT".to_string(),
        }
    }
}

const TEXT: ColumnType = ColumnType::Varchar(255);

const ANALYTICS_COLUMNS: [ColumnType; 6] = [TEXT, TEXT, TEXT, ColumnType::Int, TEXT, TEXT];
const BEST_SELLING_COLUMNS: [ColumnType; 4] = [TEXT, TEXT, TEXT, ColumnType::Int];

const ANALYTICS_RETRY_DELAY: Duration = Duration::from_secs(3600);
const BEST_SELLING_RETRY_DELAY: Duration = Duration::from_secs(5);
const BEST_SELLING_ROW_LIMIT: usize = 5;

/// Immutable description of one report pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDefinition {
    pub kind: ReportKind,
    /// Human-readable name carried on every log line of a run.
    pub label: &'static str,
    pub source: ReportSource,
    pub export_mode: ExportMode,
    pub auth_scheme: AuthScheme,
    pub table_name: String,
    /// Column types matched positionally to the report headers.
    pub columns: Vec<ColumnType>,
    pub row_limit: Option<usize>,
    pub snapshot_path: PathBuf,
    pub retry_delay: Duration,
}

impl ReportDefinition {
    /// Build the definition for `kind` from the loaded configuration.
    #[must_use]
    pub fn for_kind(kind: ReportKind, config: &AppConfig) -> Self {
        match kind {
            ReportKind::Analytics => Self {
                kind,
                label: "Zoho Analytics",
                source: config.analytics.clone(),
                export_mode: ExportMode::Job,
                auth_scheme: AuthScheme::Bearer,
                table_name: "zoho_analytics_data".to_string(),
                columns: ANALYTICS_COLUMNS.to_vec(),
                row_limit: None,
                snapshot_path: config.snapshot_dir.join("test_warehouse.csv"),
                retry_delay: ANALYTICS_RETRY_DELAY,
            },
            ReportKind::BestSelling => Self {
                kind,
                label: "Best Selling",
                source: config.best_selling.clone(),
                export_mode: ExportMode::Sync,
                auth_scheme: AuthScheme::ZohoOauthToken,
                table_name: "best_selling_prod".to_string(),
                columns: BEST_SELLING_COLUMNS.to_vec(),
                row_limit: Some(BEST_SELLING_ROW_LIMIT),
                snapshot_path: config.snapshot_dir.join("best_selling_product.csv"),
                retry_delay: BEST_SELLING_RETRY_DELAY,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::build_app_config;

    fn config() -> AppConfig {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ZOHO_WORKSPACE_ID_1", "ws-a"),
            ("ZOHO_VIEW_ID_ZOHOANALYTICS", "view-a"),
            ("ZOHO_WORKSPACE_ID", "ws-b"),
            ("ZOHO_VIEW_ID_BESTSELLING", "view-b"),
            ("REPORTSYNC_SNAPSHOT_DIR", "/var/lib/reportsync"),
        ]);
        build_app_config(|k| {
            env.get(k)
                .map(|v| (*v).to_string())
                .ok_or(std::env::VarError::NotPresent)
        })
        .unwrap()
    }

    #[test]
    fn report_kind_round_trips_through_str() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
        assert_eq!(
            "Best_Selling".parse::<ReportKind>().unwrap(),
            ReportKind::BestSelling
        );
    }

    #[test]
    fn unknown_report_is_rejected() {
        let err = "inventory".parse::<ReportKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownReport(ref s) if s == "inventory"));
    }

    #[test]
    fn analytics_definition() {
        let def = ReportDefinition::for_kind(ReportKind::Analytics, &config());
        assert_eq!(def.source.workspace_id, "ws-a");
        assert_eq!(def.source.view_id, "view-a");
        assert_eq!(def.export_mode, ExportMode::Job);
        assert_eq!(def.auth_scheme, AuthScheme::Bearer);
        assert_eq!(def.table_name, "zoho_analytics_data");
        assert_eq!(def.columns.len(), 6);
        assert_eq!(def.columns[3], ColumnType::Int);
        assert_eq!(def.row_limit, None);
        assert_eq!(
            def.snapshot_path,
            PathBuf::from("/var/lib/reportsync/test_warehouse.csv")
        );
        assert_eq!(def.retry_delay, Duration::from_secs(3600));
    }

    #[test]
    fn best_selling_definition() {
        let def = ReportDefinition::for_kind(ReportKind::BestSelling, &config());
        assert_eq!(def.source.workspace_id, "ws-b");
        assert_eq!(def.export_mode, ExportMode::Sync);
        assert_eq!(def.auth_scheme, AuthScheme::ZohoOauthToken);
        assert_eq!(def.table_name, "best_selling_prod");
        assert_eq!(
            def.columns,
            vec![
                ColumnType::Varchar(255),
                ColumnType::Varchar(255),
                ColumnType::Varchar(255),
                ColumnType::Int
            ]
        );
        assert_eq!(def.row_limit, Some(5));
        assert_eq!(def.retry_delay, Duration::from_secs(5));
    }

    #[test]
    fn auth_scheme_header_values() {
        assert_eq!(AuthScheme::Bearer.header_value("T"), "Bearer T");
        assert_eq!(
            AuthScheme::ZohoOauthToken.header_value("T"),
            "Zoho-oauthtoken T"
        );
    }

    #[test]
    fn column_type_sql() {
        assert_eq!(ColumnType::Varchar(255).sql(), "VARCHAR(255)");
        assert_eq!(ColumnType::Int.sql(), "INT");
    }
}
