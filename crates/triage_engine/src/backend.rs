use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use triage_logging::{triage_debug, triage_warn};
use url::Url;

use crate::{BackendError, BackendErrorKind, BulkOutcome, ProgressReport, RemoteItem, UploadFile};

/// Multipart field the backend reads uploaded files from.
pub const UPLOAD_FIELD: &str = "screenshots[]";

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Submissions carry whole files and get a longer budget than regular calls.
    pub upload_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

#[async_trait::async_trait]
pub trait TriageBackend: Send + Sync {
    async fn fetch_items(&self) -> Result<Vec<RemoteItem>, BackendError>;
    async fn dismiss(&self, id: &str) -> Result<(), BackendError>;
    async fn restore(&self, id: &str) -> Result<(), BackendError>;
    async fn defer(&self, id: &str, hours: u32) -> Result<(), BackendError>;
    async fn dismiss_all(&self) -> Result<BulkOutcome, BackendError>;
    async fn restore_dismissed(&self) -> Result<BulkOutcome, BackendError>;
    async fn has_dismissed(&self) -> Result<bool, BackendError>;
    async fn cleanup_session(&self) -> Result<BulkOutcome, BackendError>;
    /// Returns the number of files the backend will process.
    async fn submit_batch(&self, files: Vec<UploadFile>) -> Result<u32, BackendError>;
    async fn poll_progress(&self) -> Result<ProgressReport, BackendError>;
}

#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    count: Option<u32>,
}

impl Ack {
    fn into_outcome(self) -> Result<BulkOutcome, BackendError> {
        if !self.success {
            let message = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "request was not accepted".to_string());
            return Err(BackendError::new(BackendErrorKind::Rejected, message));
        }
        Ok(BulkOutcome {
            message: self.message,
            count: self.count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DismissedStatus {
    has_dismissed: bool,
}

#[derive(Debug, Deserialize)]
struct SubmitAck {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    total_files: Option<u32>,
    #[serde(default)]
    count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    #[serde(default)]
    processed: u32,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default)]
    in_progress: Option<bool>,
}

impl From<RawProgress> for ProgressReport {
    fn from(raw: RawProgress) -> Self {
        let completed = raw
            .completed
            .or(raw.in_progress.map(|running| !running))
            .unwrap_or(false);
        Self {
            processed: raw.processed,
            total: raw.total,
            completed,
        }
    }
}

/// Body of an error answer; the backend uses either key.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: BackendSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, BackendError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| BackendError::new(BackendErrorKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::new(
                BackendErrorKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| BackendError::new(BackendErrorKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, route: &str) -> Result<Url, BackendError> {
        self.base
            .join(route)
            .map_err(|err| BackendError::new(BackendErrorKind::InvalidUrl, err.to_string()))
    }

    fn item_endpoint(&self, action: &str, id: &str) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&format!("api/{action}/"))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::new(BackendErrorKind::InvalidUrl, "base url has no path"))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, BackendError> {
        let url = self.endpoint(route)?;
        triage_debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response).await
    }

    async fn post_ack(&self, url: Url, body: Option<serde_json::Value>) -> Result<Ack, BackendError> {
        triage_debug!("POST {url}");
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        decode(response).await
    }
}

#[async_trait::async_trait]
impl TriageBackend for ReqwestBackend {
    async fn fetch_items(&self) -> Result<Vec<RemoteItem>, BackendError> {
        self.get_json("api/screenshots").await
    }

    async fn dismiss(&self, id: &str) -> Result<(), BackendError> {
        let url = self.item_endpoint("dismiss", id)?;
        self.post_ack(url, None).await?.into_outcome().map(|_| ())
    }

    async fn restore(&self, id: &str) -> Result<(), BackendError> {
        let url = self.item_endpoint("restore", id)?;
        self.post_ack(url, None).await?.into_outcome().map(|_| ())
    }

    async fn defer(&self, id: &str, hours: u32) -> Result<(), BackendError> {
        let url = self.item_endpoint("defer", id)?;
        let body = json!({ "minutes": u64::from(hours) * 60 });
        self.post_ack(url, Some(body))
            .await?
            .into_outcome()
            .map(|_| ())
    }

    async fn dismiss_all(&self) -> Result<BulkOutcome, BackendError> {
        let url = self.endpoint("api/dismiss-all")?;
        self.post_ack(url, None).await?.into_outcome()
    }

    async fn restore_dismissed(&self) -> Result<BulkOutcome, BackendError> {
        let url = self.endpoint("api/restore-dismissed")?;
        self.post_ack(url, None).await?.into_outcome()
    }

    async fn has_dismissed(&self) -> Result<bool, BackendError> {
        let status: DismissedStatus = self.get_json("api/has-dismissed-screenshots").await?;
        Ok(status.has_dismissed)
    }

    async fn cleanup_session(&self) -> Result<BulkOutcome, BackendError> {
        let url = self.endpoint("api/cleanup-session")?;
        self.post_ack(url, None).await?.into_outcome()
    }

    async fn submit_batch(&self, files: Vec<UploadFile>) -> Result<u32, BackendError> {
        let url = self.endpoint("api/upload")?;
        let submitted = u32::try_from(files.len()).unwrap_or(u32::MAX);
        let form = files.into_iter().fold(Form::new(), |form, file| {
            form.part(UPLOAD_FIELD, Part::bytes(file.bytes).file_name(file.file_name))
        });

        triage_debug!("POST {url} with {submitted} file(s)");
        let response = self
            .client
            .post(url)
            .timeout(self.settings.upload_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let ack: SubmitAck = decode(response).await?;
        if !ack.success {
            let message = ack
                .error
                .or(ack.message)
                .unwrap_or_else(|| "upload was not accepted".to_string());
            return Err(BackendError::new(BackendErrorKind::Rejected, message));
        }
        Ok(ack.total_files.or(ack.count).unwrap_or(submitted))
    }

    async fn poll_progress(&self) -> Result<ProgressReport, BackendError> {
        let raw: RawProgress = self.get_json("api/upload-progress").await?;
        Ok(raw.into())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, response).await);
    }
    let body = response.text().await.map_err(map_reqwest_error)?;
    serde_json::from_str(&body)
        .map_err(|err| BackendError::new(BackendErrorKind::Decode, err.to_string()))
}

async fn status_error(status: StatusCode, response: Response) -> BackendError {
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let message = parsed
        .error
        .or(parsed.message)
        .unwrap_or_else(|| status.to_string());
    triage_warn!("backend answered {status}: {message}");
    BackendError::new(BackendErrorKind::HttpStatus(status.as_u16()), message)
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        return BackendError::new(BackendErrorKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return BackendError::new(BackendErrorKind::Decode, err.to_string());
    }
    BackendError::new(BackendErrorKind::Network, err.to_string())
}
