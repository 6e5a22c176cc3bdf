use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};

use crate::config::ApiConfig;
use crate::types::{GENERIC_FAILURE_MESSAGE, MALFORMED_RESULT_MESSAGE};
use crate::{ConversionError, EngineEvent, FailureKind, UploadJob, UploadOutput};

/// Produces the `?t=` token appended to every conversion request.
pub type CacheBustFn = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct UploadSettings {
    pub connect_timeout: Duration,
    /// `None` waits for the server indefinitely.
    pub request_timeout: Option<Duration>,
    pub max_bytes: u64,
    /// Granularity of measured upload progress.
    pub chunk_size: usize,
    pub cache_bust: CacheBustFn,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            max_bytes: 100 * 1024 * 1024,
            chunk_size: 64 * 1024,
            cache_bust: Arc::new(unix_millis),
        }
    }
}

fn unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        job: UploadJob,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<UploadOutput, ConversionError>;
}

#[derive(Clone)]
pub struct ReqwestUploader {
    api: ApiConfig,
    settings: UploadSettings,
}

impl ReqwestUploader {
    pub fn new(api: ApiConfig, settings: UploadSettings) -> Self {
        Self { api, settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, ConversionError> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.settings.connect_timeout);
        if let Some(timeout) = self.settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|err| ConversionError::new(FailureKind::Transport, err.to_string()))
    }

    /// Multipart form with the file streamed in chunks so progress reflects
    /// what the transport has actually pulled.
    fn build_form(
        &self,
        job: UploadJob,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Form, ConversionError> {
        let request_id = job.request_id;
        let total = job.bytes.len() as u64;
        let data = Bytes::from(job.bytes);
        let chunk_size = self.settings.chunk_size.max(1);
        let chunks: Vec<Bytes> = (0..data.len())
            .step_by(chunk_size)
            .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
            .collect();

        let mut sent = 0u64;
        let stream = futures_util::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            sink.emit(EngineEvent::UploadProgress {
                request_id,
                sent,
                total,
            });
            if sent == total {
                sink.emit(EngineEvent::UploadFinished { request_id });
            }
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let mut part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(job.file_name.clone());
        if let Some(mime) = job.mime_type.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|err| ConversionError::new(FailureKind::UnreadableFile, err.to_string()))?;
        }

        let mut form = Form::new().part("file", part);
        for (name, value) in job.fields {
            form = form.text(name, value);
        }
        Ok(form)
    }
}

#[async_trait::async_trait]
impl Uploader for ReqwestUploader {
    async fn upload(
        &self,
        job: UploadJob,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<UploadOutput, ConversionError> {
        let request_id = job.request_id;
        let token = (self.settings.cache_bust)();
        let url = self
            .api
            .endpoint_url(&job.endpoint, Some(&token))
            .map_err(|err| ConversionError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = self.build_client()?;

        let total = job.bytes.len();
        engine_info!(
            "Upload start request_id={} url={} file={} bytes={}",
            request_id,
            url,
            job.file_name,
            total
        );
        let form = self.build_form(job, sink.clone())?;

        let response = client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = parse_error_detail(&body);
            engine_warn!(
                "Upload rejected request_id={} status={} detail={:?}",
                request_id,
                status,
                detail
            );
            return Err(ConversionError::new(
                FailureKind::Rejected {
                    status: status.as_u16(),
                },
                detail.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            ));
        }

        if total == 0 {
            sink.emit(EngineEvent::UploadFinished { request_id });
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(ConversionError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "The converted file is too large to download.",
                ));
            }
        }

        let content_type = header_string(&response, CONTENT_TYPE);
        let content_disposition = header_string(&response, CONTENT_DISPOSITION);

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            // Headers already arrived, so a broken body is not a transport failure.
            let chunk = chunk
                .map_err(|err| ConversionError::new(FailureKind::Malformed, err.to_string()))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(ConversionError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "The converted file is too large to download.",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ConversionError::new(
                FailureKind::Malformed,
                MALFORMED_RESULT_MESSAGE,
            ));
        }

        engine_debug!(
            "Upload complete request_id={} status={} bytes={}",
            request_id,
            status,
            bytes.len()
        );
        Ok(UploadOutput {
            status: status.as_u16(),
            bytes,
            content_type,
            content_disposition,
        })
    }
}

fn header_string(
    response: &reqwest::Response,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Extracts a string `detail` from a JSON error body.
///
/// Validation errors carry a list under `detail`; those fall back to the generic message.
pub fn parse_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|detail| detail.as_str())
        .map(str::trim)
        .filter(|detail| !detail.is_empty())
        .map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> ConversionError {
    if err.is_timeout() {
        engine_warn!("Upload timed out: {}", err);
        return ConversionError::new(FailureKind::Timeout, crate::types::NETWORK_ERROR_MESSAGE);
    }
    engine_warn!("Upload transport failure: {}", err);
    ConversionError::transport()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_read_from_json() {
        assert_eq!(
            parse_error_detail(r#"{"detail":"Unsupported format"}"#).as_deref(),
            Some("Unsupported format")
        );
    }

    #[test]
    fn non_string_or_missing_detail_is_none() {
        assert_eq!(parse_error_detail(r#"{"detail":[{"loc":["file"]}]}"#), None);
        assert_eq!(parse_error_detail(r#"{"message":"x"}"#), None);
        assert_eq!(parse_error_detail("<html>502</html>"), None);
        assert_eq!(parse_error_detail(r#"{"detail":"  "}"#), None);
    }

    #[test]
    fn default_token_is_numeric() {
        let token = (UploadSettings::default().cache_bust)();
        assert!(token.chars().all(|c| c.is_ascii_digit()));
    }
}
