use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use url::Url;
use vidtrack_core::{RemoteId, SelectedFile};

use crate::{UploadError, UploadFailureKind, UploadReceipt};

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub endpoint: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl UploadSettings {
    /// Resolve `upload_path` against the server base URL.
    pub fn for_server(server: &Url, upload_path: &str) -> Result<Self, UploadError> {
        let endpoint = server
            .join(upload_path)
            .map_err(|err| UploadError::new(UploadFailureKind::InvalidEndpoint, err.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(UploadError::new(
                UploadFailureKind::InvalidEndpoint,
                format!("unsupported scheme {}", endpoint.scheme()),
            ));
        }
        Ok(Self {
            endpoint,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
        })
    }
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, file: &SelectedFile) -> Result<UploadReceipt, UploadError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    process_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Streams the file as multipart field `file` and reads `process_id` back.
#[derive(Debug, Clone)]
pub struct ReqwestUploader {
    settings: UploadSettings,
}

impl ReqwestUploader {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, UploadError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| UploadError::new(UploadFailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Uploader for ReqwestUploader {
    async fn upload(&self, file: &SelectedFile) -> Result<UploadReceipt, UploadError> {
        let source = tokio::fs::File::open(&file.source)
            .await
            .map_err(|err| UploadError::new(UploadFailureKind::Io, err.to_string()))?;
        let length = source
            .metadata()
            .await
            .map_err(|err| UploadError::new(UploadFailureKind::Io, err.to_string()))?
            .len();
        engine_debug!("Streaming {} bytes from {:?} for upload", length, file.source);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(source));
        let part = reqwest::multipart::Part::stream_with_length(body, length)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|err| UploadError::new(UploadFailureKind::InvalidFile, err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let client = self.build_client()?;
        let response = client
            .post(self.settings.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::new(
                UploadFailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|err| UploadError::new(UploadFailureKind::Malformed, err.to_string()))?;
        let process_id = body
            .process_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                UploadError::new(UploadFailureKind::Malformed, "response has no process_id")
            })?;

        engine_info!("Upload of {} accepted as {}", file.name, process_id);
        Ok(UploadReceipt {
            remote_id: RemoteId::from(process_id),
            message: body.message,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> UploadError {
    if err.is_timeout() {
        return UploadError::new(UploadFailureKind::Timeout, err.to_string());
    }
    UploadError::new(UploadFailureKind::Network, err.to_string())
}
