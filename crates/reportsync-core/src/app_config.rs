use std::path::PathBuf;

use chrono::NaiveTime;

/// OAuth client credentials shared by every report.
#[derive(Clone, Default)]
pub struct AnalyticsCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub org_id: String,
}

impl std::fmt::Debug for AnalyticsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("org_id", &self.org_id)
            .finish()
    }
}

/// Workspace and view identifiers locating one report in the analytics API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSource {
    pub workspace_id: String,
    pub view_id: String,
}

#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"[redacted]")
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

/// Daily wall-clock times at which the scheduler dispatches each report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub analytics_at: NaiveTime,
    pub best_selling_at: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: AnalyticsCredentials,
    pub accounts_url: String,
    pub api_url: String,
    pub analytics: ReportSource,
    pub best_selling: ReportSource,
    pub db: DbConfig,
    pub schedule: ScheduleConfig,
    pub log_level: String,
    pub snapshot_dir: PathBuf,
    pub log_dir: PathBuf,
    pub http_timeout_secs: u64,
    /// Binary dispatched by the scheduler. `None` means the `reportsync-cli`
    /// sitting next to the running executable.
    pub cli_bin: Option<PathBuf>,
}

impl AppConfig {
    /// Names of settings that are empty after loading.
    ///
    /// Empty settings are not fatal at startup: they surface later as
    /// authentication or connection failures inside the retry loops.
    #[must_use]
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let checks = [
            ("ZOHO_CLIENT_ID", &self.credentials.client_id),
            ("ZOHO_CLIENT_SECRET", &self.credentials.client_secret),
            ("ZOHO_REFRESH_TOKEN", &self.credentials.refresh_token),
            ("ZOHO_ANALYTICS_ORGID", &self.credentials.org_id),
            ("ZOHO_WORKSPACE_ID_1", &self.analytics.workspace_id),
            ("ZOHO_VIEW_ID_ZOHOANALYTICS", &self.analytics.view_id),
            ("ZOHO_WORKSPACE_ID", &self.best_selling.workspace_id),
            ("ZOHO_VIEW_ID_BESTSELLING", &self.best_selling.view_id),
            ("DB_USER", &self.db.user),
            ("DB_NAME", &self.db.database),
        ];

        checks
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}
