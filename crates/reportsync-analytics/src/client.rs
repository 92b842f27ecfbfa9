//! HTTP client for the Zoho Analytics REST v2 API.
//!
//! Covers the two calls a report run needs: exchanging the long-lived refresh
//! token for an access token, and exporting a view as CSV (either directly or
//! through a bulk export job).

use std::time::Duration;

use reportsync_core::{
    AccessToken, AnalyticsCredentials, AppConfig, ExportMode, ReportDefinition,
};
use reqwest::{Client, Response, Url};

use crate::error::AnalyticsError;
use crate::snapshot::write_snapshot;
use crate::types::{ExportJobResponse, TokenResponse};

const ORG_ID_HEADER: &str = "ZANALYTICS-ORGID";
const CSV_EXPORT_CONFIG: &str = r#"{"responseFormat":"csv"}"#;
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Client for the analytics API and its OAuth token endpoint.
///
/// Use [`AnalyticsClient::new`] for production or
/// [`AnalyticsClient::with_base_urls`] to point at a mock server in tests.
pub struct AnalyticsClient {
    client: Client,
    credentials: AnalyticsCredentials,
    accounts_url: Url,
    api_url: Url,
}

impl AnalyticsClient {
    /// Creates a client from the loaded application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`AnalyticsError::InvalidBaseUrl`] if a
    /// configured base URL does not parse.
    pub fn new(config: &AppConfig) -> Result<Self, AnalyticsError> {
        Self::with_base_urls(
            config.credentials.clone(),
            &config.accounts_url,
            &config.api_url,
            config.http_timeout_secs,
        )
    }

    /// Creates a client with explicit base URLs (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`AnalyticsError::InvalidBaseUrl`] if either
    /// base URL is not an absolute http(s) URL.
    pub fn with_base_urls(
        credentials: AnalyticsCredentials,
        accounts_url: &str,
        api_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, AnalyticsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reportsync/0.1 (report-sync)")
            .build()?;

        Ok(Self {
            client,
            credentials,
            accounts_url: parse_base_url(accounts_url)?,
            api_url: parse_base_url(api_url)?,
        })
    }

    /// Exchanges the configured refresh token for a short-lived access token.
    ///
    /// # Errors
    ///
    /// - [`AnalyticsError::Http`] on network failure.
    /// - [`AnalyticsError::UnexpectedStatus`] on a non-2xx status.
    /// - [`AnalyticsError::Deserialize`] if the body is not JSON.
    /// - [`AnalyticsError::TokenRejected`] if the body carries no access token.
    pub async fn fetch_access_token(&self) -> Result<AccessToken, AnalyticsError> {
        let url = endpoint(&self.accounts_url, &["oauth", "v2", "token"])?;
        let response = self
            .client
            .post(url)
            .query(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await?;
        let response = ensure_success(response, "oauth/v2/token").await?;

        let body = response.text().await?;
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AnalyticsError::Deserialize {
                context: "token response".to_string(),
                source: e,
            })?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
            _ => Err(AnalyticsError::TokenRejected(
                parsed
                    .error
                    .unwrap_or_else(|| "response has no access_token".to_string()),
            )),
        }
    }

    /// Downloads the report described by `definition` as raw CSV bytes and
    /// overwrites the report's local snapshot file with them.
    ///
    /// # Errors
    ///
    /// - [`AnalyticsError::Http`] on network failure.
    /// - [`AnalyticsError::UnexpectedStatus`] on a non-2xx status from any call.
    /// - [`AnalyticsError::Deserialize`] if the export-job response lacks a job id.
    /// - [`AnalyticsError::Snapshot`] if the snapshot cannot be written.
    pub async fn fetch_report(
        &self,
        definition: &ReportDefinition,
        token: &AccessToken,
    ) -> Result<Vec<u8>, AnalyticsError> {
        let bytes = match definition.export_mode {
            ExportMode::Sync => self.fetch_sync(definition, token).await?,
            ExportMode::Job => self.fetch_via_export_job(definition, token).await?,
        };
        write_snapshot(&definition.snapshot_path, &bytes).await?;
        Ok(bytes)
    }

    async fn fetch_sync(
        &self,
        definition: &ReportDefinition,
        token: &AccessToken,
    ) -> Result<Vec<u8>, AnalyticsError> {
        let url = self.view_data_url(definition, false)?;
        let response = self.authorized_get(url, definition, token).await?;
        let response = ensure_success(response, "view data").await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Creates a bulk export job and immediately downloads its result.
    ///
    /// The job is assumed to be complete as soon as it is created; its status
    /// is not polled before the download request.
    async fn fetch_via_export_job(
        &self,
        definition: &ReportDefinition,
        token: &AccessToken,
    ) -> Result<Vec<u8>, AnalyticsError> {
        let url = self.view_data_url(definition, true)?;
        let response = self.authorized_get(url, definition, token).await?;
        let response = ensure_success(response, "bulk export job").await?;
        let body = response.text().await?;
        let job: ExportJobResponse =
            serde_json::from_str(&body).map_err(|e| AnalyticsError::Deserialize {
                context: format!("export job for view {}", definition.source.view_id),
                source: e,
            })?;
        let job_id = job.data.job_id.into_string();
        tracing::debug!(job_id = %job_id, "export job created");

        let url = self.export_download_url(definition, &job_id)?;
        let response = self.authorized_get(url, definition, token).await?;
        let response = ensure_success(response, "export job data").await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn authorized_get(
        &self,
        url: Url,
        definition: &ReportDefinition,
        token: &AccessToken,
    ) -> Result<Response, AnalyticsError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::AUTHORIZATION,
                definition.auth_scheme.header_value(token.as_str()),
            )
            .header(ORG_ID_HEADER, &self.credentials.org_id)
            .send()
            .await?;
        Ok(response)
    }

    /// `.../workspaces/{ws}/views/{view}/data`, under `bulk/` with a CSV
    /// response config when `bulk` is set.
    fn view_data_url(
        &self,
        definition: &ReportDefinition,
        bulk: bool,
    ) -> Result<Url, AnalyticsError> {
        let source = &definition.source;
        let mut segments = vec!["restapi", "v2"];
        if bulk {
            segments.push("bulk");
        }
        segments.extend([
            "workspaces",
            source.workspace_id.as_str(),
            "views",
            source.view_id.as_str(),
            "data",
        ]);
        let mut url = endpoint(&self.api_url, &segments)?;
        if bulk {
            url.query_pairs_mut()
                .append_pair("CONFIG", CSV_EXPORT_CONFIG);
        }
        Ok(url)
    }

    fn export_download_url(
        &self,
        definition: &ReportDefinition,
        job_id: &str,
    ) -> Result<Url, AnalyticsError> {
        endpoint(
            &self.api_url,
            &[
                "restapi",
                "v2",
                "bulk",
                "workspaces",
                definition.source.workspace_id.as_str(),
                "exportjobs",
                job_id,
                "data",
            ],
        )
    }
}

fn parse_base_url(raw: &str) -> Result<Url, AnalyticsError> {
    let invalid = |reason: String| AnalyticsError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid("expected an absolute http(s) URL".to_string()));
    }
    Ok(url)
}

/// Appends percent-encoded path segments to `base`, keeping any base path.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, AnalyticsError> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|()| AnalyticsError::InvalidBaseUrl {
            url: base.to_string(),
            reason: "URL cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turns a non-2xx response into [`AnalyticsError::UnexpectedStatus`] with a
/// truncated body excerpt.
async fn ensure_success(response: Response, endpoint: &str) -> Result<Response, AnalyticsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    Err(AnalyticsError::UnexpectedStatus {
        status: status.as_u16(),
        endpoint: endpoint.to_string(),
        body,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
