use std::fmt;
use std::path::PathBuf;

pub type RequestId = u64;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Conversion failed";
pub const MALFORMED_RESULT_MESSAGE: &str = "The server returned an unreadable result.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    UploadProgress {
        request_id: RequestId,
        sent: u64,
        total: u64,
    },
    UploadFinished {
        request_id: RequestId,
    },
    ProcessingTick {
        request_id: RequestId,
        increment: u8,
    },
    Completed {
        request_id: RequestId,
        result: Result<MaterializedResult, ConversionError>,
    },
    WorkersDeregistered {
        count: usize,
    },
}

/// A conversion request as the engine receives it: the file is still on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitJob {
    pub request_id: RequestId,
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub endpoint: String,
    pub fields: Vec<(String, String)>,
    /// Download name used when the response carries no usable filename.
    pub fallback_filename: String,
}

/// One file upload as the transport sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub request_id: RequestId,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub endpoint: String,
    pub fields: Vec<(String, String)>,
}

/// Raw successful response before it is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutput {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

/// A response body held in the blob store, addressable by its object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedResult {
    pub object_url: String,
    pub filename: String,
    pub byte_len: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ConversionError {
    pub kind: FailureKind,
    /// User-facing text.
    pub message: String,
}

impl ConversionError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn transport() -> Self {
        Self::new(FailureKind::Transport, NETWORK_ERROR_MESSAGE)
    }

    /// No HTTP response at all; these trigger cache-worker remediation.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, FailureKind::Transport | FailureKind::Timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    UnreadableFile,
    Transport,
    Timeout,
    Rejected { status: u16 },
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::UnreadableFile => write!(f, "unreadable file"),
            FailureKind::Transport => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Rejected { status } => write!(f, "rejected with status {status}"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Malformed => write!(f, "malformed response"),
        }
    }
}
