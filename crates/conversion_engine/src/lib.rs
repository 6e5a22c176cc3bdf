//! Conversion engine: uploads, result blobs and the offline cache worker.
mod auth;
mod blob;
mod config;
mod engine;
mod filename;
mod persist;
mod ticker;
mod types;
mod upload;
pub mod worker;

pub use auth::{AuthClient, AuthError, AuthSession, AuthUser};
pub use blob::{Blob, BlobStore};
pub use config::{ApiConfig, API_URL_ENV, DEFAULT_API_BASE};
pub use engine::{EngineConfig, EngineHandle};
pub use filename::{download_filename, filename_from_content_disposition, sanitize_filename};
pub use persist::{ensure_output_dir, save_result, AtomicFileWriter, PersistError};
pub use ticker::{start_ticker, TickerHandle, TickerSettings};
pub use types::{
    ConversionError, EngineEvent, FailureKind, MaterializedResult, RequestId, SubmitJob,
    UploadJob, UploadOutput, GENERIC_FAILURE_MESSAGE, MALFORMED_RESULT_MESSAGE,
    NETWORK_ERROR_MESSAGE,
};
pub use upload::{
    parse_error_detail, CacheBustFn, ChannelProgressSink, ProgressSink, ReqwestUploader,
    UploadSettings, Uploader,
};
