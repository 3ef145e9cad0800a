use crate::config::AppConfig;
use crate::export::ExportPayload;
use crate::form::{FormError, ProductionForm};
use log::{error, info};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no workflow endpoint is configured")]
    NotConfigured,
    #[error(transparent)]
    MissingHeader(#[from] FormError),
    #[error("could not serialize form: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("workflow endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// A form snapshot ready to send, detached from the form it came from.
#[derive(Debug, Clone)]
pub struct Submission {
    pub form_id: String,
    pub body: serde_json::Value,
}

impl Submission {
    /// Validate the header and build the export payload.
    pub fn prepare(form: &ProductionForm) -> Result<Self, SubmitError> {
        form.validate_header()?;
        Ok(Submission {
            form_id: form.id.clone(),
            body: serde_json::to_value(ExportPayload::new(form))?,
        })
    }
}

/// Posts form snapshots to the remote workflow endpoint.
#[derive(Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
    url: Option<String>,
}

impl WorkflowClient {
    pub fn new(config: &AppConfig) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("prodlog/", env!("CARGO_PKG_VERSION")))
            .timeout(config.submit_timeout)
            .build()?;
        Ok(Self {
            http,
            url: config.submit_url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Single POST attempt; any non-2xx answer is an error.
    pub async fn submit(&self, submission: &Submission) -> Result<(), SubmitError> {
        let url = self.url.as_deref().ok_or(SubmitError::NotConfigured)?;

        let resp = self.http.post(url).json(&submission.body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(
                "submission of form {} rejected with {}: {}",
                submission.form_id, status, body
            );
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("form {} submitted", submission.form_id);
        Ok(())
    }
}
