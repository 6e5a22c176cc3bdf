use crate::{ErrorInfo, FileRef, RequestId, ResultHandle, ToolOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked (or dropped) a file.
    FileSelected(FileRef),
    /// User removed the selected file before submitting.
    FileRemoved,
    /// User edited the tool's auxiliary inputs.
    OptionsChanged(ToolOptions),
    /// User asked to convert the selected file.
    SubmitClicked,
    /// Transport handed `sent` of `total` request bytes to the network.
    UploadProgress {
        request_id: RequestId,
        sent: u64,
        total: u64,
    },
    /// The whole request body was sent; the server is now working.
    UploadFinished { request_id: RequestId },
    /// Synthetic processing timer fired.
    ProcessingTick { request_id: RequestId, increment: u8 },
    ConversionSucceeded {
        request_id: RequestId,
        result: ResultHandle,
    },
    ConversionFailed {
        request_id: RequestId,
        error: ErrorInfo,
    },
    /// "Convert another" / "Try again".
    ResetClicked,
    NoOp,
}
