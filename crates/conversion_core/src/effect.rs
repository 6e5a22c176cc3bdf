use crate::{FileRef, FormField, OutputNaming, RequestId};

/// Everything the engine needs to issue one conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub request_id: RequestId,
    pub file: FileRef,
    pub endpoint: String,
    pub fields: Vec<FormField>,
    pub naming: OutputNaming,
}

impl UploadRequest {
    /// Name used when the response does not carry one.
    pub fn fallback_filename(&self) -> String {
        self.naming.apply(&self.file.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartUpload(UploadRequest),
    StartProcessingTicker { request_id: RequestId },
    StopProcessingTicker { request_id: RequestId },
    /// Release the in-memory blob behind a result.
    RevokeResult { object_url: String },
    /// Best-effort removal of registered cache workers after a transport failure.
    DeregisterWorkers,
    BatchFinished { completed: usize, failed: usize },
}
