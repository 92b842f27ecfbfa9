use serde::Deserialize;

/// OAuth token endpoint response.
///
/// A rejected refresh token still comes back as HTTP 200 with an `error`
/// field and no `access_token`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: Option<String>,
    pub(crate) error: Option<String>,
}

/// Envelope returned when a bulk export job is created.
#[derive(Debug, Deserialize)]
pub(crate) struct ExportJobResponse {
    pub(crate) data: ExportJobData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportJobData {
    #[serde(rename = "jobId")]
    pub(crate) job_id: JobId,
}

/// Job ids are documented as strings but some regions send numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum JobId {
    Text(String),
    Number(u64),
}

impl JobId {
    pub(crate) fn into_string(self) -> String {
        match self {
            JobId::Text(s) => s,
            JobId::Number(n) => n.to_string(),
        }
    }
}
