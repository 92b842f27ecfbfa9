pub mod app_config;
pub mod config;
pub mod parse;
pub mod report;
pub mod retry;
pub mod types;

pub use app_config::{AnalyticsCredentials, AppConfig, DbConfig, ReportSource, ScheduleConfig};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use parse::{parse_report, ParseError};
pub use report::{AuthScheme, ColumnType, ExportMode, ReportDefinition, ReportKind};
pub use retry::{RetryExhausted, RetryPolicy, Sleeper, TokioSleeper};
pub use types::{coerce_cell, sanitize_identifier, AccessToken, CellValue, ParsedReport, ShapeError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("unknown report \"{0}\" (expected one of: analytics, best-selling)")]
    UnknownReport(String),
}
