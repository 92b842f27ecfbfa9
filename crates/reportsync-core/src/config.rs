use std::path::PathBuf;

use chrono::NaiveTime;

use crate::app_config::{AnalyticsCredentials, AppConfig, DbConfig, ReportSource, ScheduleConfig};
use crate::ConfigError;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.com";
pub const DEFAULT_API_URL: &str = "https://analyticsapi.zoho.com";
pub const DEFAULT_ANALYTICS_AT: &str = "15:22";
pub const DEFAULT_BEST_SELLING_AT: &str = "15:23";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a present value cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a present value cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Credentials and identifiers default to empty strings when unset; only
/// values that are present but malformed are rejected here.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for an unparseable port, timeout, or
/// clock time.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u16 = |var: &str, default: &str| -> Result<u16, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u16>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_time = |var: &str, default: &str| -> Result<NaiveTime, ConfigError> {
        let raw = or_default(var, default);
        parse_clock_time(&raw).map_err(|reason| invalid(var, reason))
    };

    let credentials = AnalyticsCredentials {
        client_id: or_default("ZOHO_CLIENT_ID", ""),
        client_secret: or_default("ZOHO_CLIENT_SECRET", ""),
        refresh_token: or_default("ZOHO_REFRESH_TOKEN", ""),
        org_id: or_default("ZOHO_ANALYTICS_ORGID", ""),
    };

    let analytics = ReportSource {
        workspace_id: or_default("ZOHO_WORKSPACE_ID_1", ""),
        view_id: or_default("ZOHO_VIEW_ID_ZOHOANALYTICS", ""),
    };
    let best_selling = ReportSource {
        workspace_id: or_default("ZOHO_WORKSPACE_ID", ""),
        view_id: or_default("ZOHO_VIEW_ID_BESTSELLING", ""),
    };

    let db = DbConfig {
        host: or_default("DB_HOST", "localhost"),
        user: or_default("DB_USER", ""),
        password: or_default("DB_PASSWORD", ""),
        database: or_default("DB_NAME", ""),
        port: parse_u16("DB_PORT", "3306")?,
    };

    let schedule = ScheduleConfig {
        analytics_at: parse_time("SCHEDULE_ANALYTICS_AT", DEFAULT_ANALYTICS_AT)?,
        best_selling_at: parse_time("SCHEDULE_BEST_SELLING_AT", DEFAULT_BEST_SELLING_AT)?,
    };

    let http_timeout_secs = parse_u64("REPORTSYNC_HTTP_TIMEOUT_SECS", "30")?;
    if http_timeout_secs == 0 {
        return Err(invalid(
            "REPORTSYNC_HTTP_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        credentials,
        accounts_url: or_default("ZOHO_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
        api_url: or_default("ZOHO_ANALYTICS_API_URL", DEFAULT_API_URL),
        analytics,
        best_selling,
        db,
        schedule,
        log_level: or_default("REPORTSYNC_LOG_LEVEL", "info"),
        snapshot_dir: PathBuf::from(or_default("REPORTSYNC_SNAPSHOT_DIR", ".")),
        log_dir: PathBuf::from(or_default("REPORTSYNC_LOG_DIR", "logs")),
        http_timeout_secs,
        cli_bin: lookup("REPORTSYNC_CLI_BIN").ok().map(PathBuf::from),
    })
}

/// Parse an `HH:MM` wall-clock time.
///
/// # Errors
///
/// Returns a human-readable reason when `raw` is not a valid 24-hour time.
pub fn parse_clock_time(raw: &str) -> Result<NaiveTime, String> {
    let trimmed = raw.trim();
    let well_formed = trimmed.len() == 5
        && trimmed.as_bytes()[2] == b':'
        && trimmed
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 2 || b.is_ascii_digit());
    if !well_formed {
        return Err(format!("expected HH:MM, got \"{raw}\""));
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M").map_err(|e| format!("\"{raw}\": {e}"))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
