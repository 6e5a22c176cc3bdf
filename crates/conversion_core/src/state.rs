use std::path::PathBuf;

use crate::progress::{ProgressEstimator, ProgressSource, SyntheticRamp};
use crate::tool::{ToolOptions, ToolSpec};
use crate::view_model::SessionViewModel;

pub type RequestId = u64;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Conversion failed";

/// A user-selected file. The core never reads it; only the engine does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime_type: Option<String>,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Uploading,
    Processing,
    Done,
    Error,
}

impl SessionStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, SessionStatus::Uploading | SessionStatus::Processing)
    }
}

/// A materialized conversion result, owned by exactly one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultHandle {
    pub object_url: String,
    pub filename: String,
    pub byte_len: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No HTTP response was received at all.
    Transport,
    /// The server answered with a non-success status.
    Rejected { status: u16 },
    /// Success status, but the body was not a usable result.
    Malformed,
    /// The request could not be built (unreadable file, bad endpoint URL).
    InvalidInput,
}

impl FailureKind {
    pub fn is_transport(self) -> bool {
        matches!(self, FailureKind::Transport)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: FailureKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport() -> Self {
        Self::new(FailureKind::Transport, NETWORK_ERROR_MESSAGE)
    }

    /// Uses the server's `detail` when present, the generic message otherwise.
    pub fn rejected(status: u16, detail: Option<String>) -> Self {
        let message = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        Self::new(FailureKind::Rejected { status }, message)
    }
}

/// One single-file conversion session.
///
/// Invariant: `result` is only set in `Done`, `error` only in `Error`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState<E = SyntheticRamp> {
    tool: ToolSpec,
    options: ToolOptions,
    file: Option<FileRef>,
    status: SessionStatus,
    progress: u8,
    progress_source: ProgressSource,
    result: Option<ResultHandle>,
    error: Option<ErrorInfo>,
    next_request_id: RequestId,
    in_flight: Option<RequestId>,
    estimator: E,
    dirty: bool,
}

impl SessionState<SyntheticRamp> {
    pub fn new(tool: ToolSpec) -> Self {
        Self::with_estimator(tool, SyntheticRamp::default())
    }
}

impl<E: ProgressEstimator> SessionState<E> {
    pub fn with_estimator(tool: ToolSpec, estimator: E) -> Self {
        Self {
            tool,
            options: ToolOptions::None,
            file: None,
            status: SessionStatus::Idle,
            progress: 0,
            progress_source: ProgressSource::None,
            result: None,
            error: None,
            next_request_id: 1,
            in_flight: None,
            estimator,
            dirty: false,
        }
    }

    pub fn tool(&self) -> &ToolSpec {
        &self.tool
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    pub fn file(&self) -> Option<&FileRef> {
        self.file.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn progress_source(&self) -> ProgressSource {
        self.progress_source
    }

    pub fn result(&self) -> Option<&ResultHandle> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    pub fn view(&self) -> SessionViewModel {
        SessionViewModel::from_parts(
            self.status,
            self.progress,
            self.progress_source,
            self.file.as_ref(),
            self.result.as_ref(),
            self.error.as_ref(),
            self.dirty,
        )
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_current(&self, request_id: RequestId) -> bool {
        self.in_flight == Some(request_id)
    }

    pub(crate) fn set_options(&mut self, options: ToolOptions) {
        self.options = options;
        self.mark_dirty();
    }

    pub(crate) fn select_file(&mut self, file: FileRef) -> Option<ResultHandle> {
        let released = self.clear_outcome();
        self.file = Some(file);
        self.mark_dirty();
        released
    }

    pub(crate) fn remove_file(&mut self) {
        self.file = None;
        self.mark_dirty();
    }

    /// Moves to `Uploading` with a fresh request id; returns the id.
    pub(crate) fn begin_upload(&mut self) -> RequestId {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(request_id);
        self.status = SessionStatus::Uploading;
        self.progress = 0;
        self.progress_source = ProgressSource::None;
        self.mark_dirty();
        request_id
    }

    pub(crate) fn apply_upload_progress(&mut self, sent: u64, total: u64) {
        let next = self.estimator.upload(sent, total);
        self.raise_progress(next, ProgressSource::Measured);
    }

    pub(crate) fn enter_processing(&mut self) {
        self.status = SessionStatus::Processing;
        let floor = self.estimator.processing_floor();
        self.raise_progress(floor, ProgressSource::Estimated);
        self.mark_dirty();
    }

    pub(crate) fn apply_processing_tick(&mut self, increment: u8) {
        let next = self.estimator.processing_tick(self.progress, increment);
        self.raise_progress(next, ProgressSource::Estimated);
    }

    pub(crate) fn complete(&mut self, result: ResultHandle) {
        self.in_flight = None;
        self.status = SessionStatus::Done;
        let complete = self.estimator.complete();
        self.raise_progress(complete, ProgressSource::Complete);
        self.error = None;
        self.result = Some(result);
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, error: ErrorInfo) {
        self.in_flight = None;
        self.status = SessionStatus::Error;
        self.result = None;
        self.error = Some(error);
        self.mark_dirty();
    }

    /// Back to `Idle`; hands back the result that must now be revoked.
    pub(crate) fn reset(&mut self) -> Option<ResultHandle> {
        let released = self.clear_outcome();
        self.mark_dirty();
        released
    }

    fn clear_outcome(&mut self) -> Option<ResultHandle> {
        self.status = SessionStatus::Idle;
        self.progress = 0;
        self.progress_source = ProgressSource::None;
        self.error = None;
        self.result.take()
    }

    fn raise_progress(&mut self, next: u8, source: ProgressSource) {
        if next > self.progress {
            self.progress = next.min(100);
            self.progress_source = source;
            self.mark_dirty();
        }
    }
}
