use crate::batch::{BatchItemStatus, ItemId};
use crate::progress::{stage_label, ProgressSource};
use crate::{ErrorInfo, FileRef, ResultHandle, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionViewModel {
    pub status: SessionStatus,
    pub progress: u8,
    pub progress_source: ProgressSource,
    /// "Uploading...", "Processing..." or "Almost done..." while in flight.
    pub stage_label: Option<&'static str>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    /// `(object_url, download filename)` once done.
    pub download: Option<(String, String)>,
    pub error_message: Option<String>,
    pub can_submit: bool,
    pub can_reset: bool,
    pub dirty: bool,
}

impl SessionViewModel {
    pub(crate) fn from_parts(
        status: SessionStatus,
        progress: u8,
        progress_source: ProgressSource,
        file: Option<&FileRef>,
        result: Option<&ResultHandle>,
        error: Option<&ErrorInfo>,
        dirty: bool,
    ) -> Self {
        Self {
            status,
            progress,
            progress_source,
            stage_label: status.is_in_flight().then(|| stage_label(progress)),
            file_name: file.map(|f| f.name.clone()),
            file_size: file.map(|f| format_megabytes(f.size)),
            download: result.map(|r| (r.object_url.clone(), r.filename.clone())),
            error_message: error.map(|e| e.message.clone()),
            can_submit: status == SessionStatus::Idle && file.is_some(),
            can_reset: matches!(status, SessionStatus::Done | SessionStatus::Error),
            dirty,
        }
    }
}

/// Size with two decimals, e.g. `2.00 MB`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRowView {
    pub id: ItemId,
    pub file_name: String,
    pub status: BatchItemStatus,
    pub progress: u8,
    pub download: Option<(String, String)>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchViewModel {
    pub rows: Vec<BatchRowView>,
    pub completed_count: usize,
    pub error_count: usize,
    pub running: bool,
    pub can_download_all: bool,
    pub dirty: bool,
}
