//! Conversion core: pure session state machines, tool catalogue and progress policy.
mod batch;
mod effect;
mod msg;
mod progress;
mod state;
mod tool;
mod update;
mod view_model;

pub use batch::{update_batch, BatchItem, BatchItemStatus, BatchMsg, BatchState, ItemId};
pub use effect::{Effect, UploadRequest};
pub use msg::Msg;
pub use progress::{stage_label, ProgressEstimator, ProgressSource, SyntheticRamp};
pub use state::{
    ErrorInfo, FailureKind, FileRef, RequestId, ResultHandle, SessionState, SessionStatus,
    GENERIC_FAILURE_MESSAGE, NETWORK_ERROR_MESSAGE,
};
pub use tool::{
    catalogue, find_tool, CompressionLevel, FormField, NumberPosition, OutputNaming, ToolOptions,
    ToolSpec,
};
pub use update::update;
pub use view_model::{format_megabytes, BatchRowView, BatchViewModel, SessionViewModel};
