use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use conversion_core::{BatchMsg, Effect, ErrorInfo, FailureKind, Msg, ResultHandle, UploadRequest};
use conversion_engine::worker::WorkerDeregistrar;
use conversion_engine::{
    BlobStore, ConversionError, EngineConfig, EngineEvent, EngineHandle, MaterializedResult,
    SubmitJob,
};
use engine_logging::{engine_debug, engine_info, engine_warn, set_active_request};

/// Executes core effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: EngineConfig, deregistrar: Arc<dyn WorkerDeregistrar>) -> Self {
        Self {
            engine: EngineHandle::new(config, deregistrar),
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        self.engine.blobs()
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartUpload(request) => {
                    set_active_request(request.request_id);
                    engine_info!(
                        "StartUpload request_id={} endpoint={} file={}",
                        request.request_id,
                        request.endpoint,
                        request.file.name
                    );
                    self.engine.submit(submit_job(request));
                }
                Effect::StartProcessingTicker { request_id } => {
                    self.engine.start_ticker(request_id);
                }
                Effect::StopProcessingTicker { request_id } => {
                    self.engine.stop_ticker(request_id);
                }
                Effect::RevokeResult { object_url } => {
                    if !self.engine.revoke(&object_url) {
                        engine_debug!("Revoke of unknown object url {}", object_url);
                    }
                }
                Effect::DeregisterWorkers => {
                    engine_warn!(
                        "Network failure on request {}; deregistering cache workers",
                        engine_logging::active_request()
                    );
                    self.engine.deregister_workers();
                }
                Effect::BatchFinished { completed, failed } => {
                    engine_info!("Batch finished: {} converted, {} failed", completed, failed);
                }
            }
        }
    }

    /// Next engine event translated for a single-file session. Events with no
    /// session counterpart come back as `Msg::NoOp`.
    pub fn next_msg(&self, timeout: Duration) -> Result<Msg, RecvTimeoutError> {
        self.engine.recv_timeout(timeout).map(session_msg)
    }

    /// Next engine event, `None` when it does not concern a batch run.
    pub fn next_batch_msg(&self, timeout: Duration) -> Result<Option<BatchMsg>, RecvTimeoutError> {
        self.engine.recv_timeout(timeout).map(batch_msg)
    }
}

fn submit_job(request: UploadRequest) -> SubmitJob {
    let fallback_filename = request.fallback_filename();
    SubmitJob {
        request_id: request.request_id,
        path: request.file.path,
        file_name: request.file.name,
        mime_type: request.file.mime_type,
        endpoint: request.endpoint,
        fields: request
            .fields
            .into_iter()
            .map(|field| (field.name, field.value))
            .collect(),
        fallback_filename,
    }
}

fn session_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UploadProgress {
            request_id,
            sent,
            total,
        } => Msg::UploadProgress {
            request_id,
            sent,
            total,
        },
        EngineEvent::UploadFinished { request_id } => Msg::UploadFinished { request_id },
        EngineEvent::ProcessingTick {
            request_id,
            increment,
        } => Msg::ProcessingTick {
            request_id,
            increment,
        },
        EngineEvent::Completed { request_id, result } => match result {
            Ok(result) => Msg::ConversionSucceeded {
                request_id,
                result: map_result(result),
            },
            Err(err) => Msg::ConversionFailed {
                request_id,
                error: map_error(err),
            },
        },
        EngineEvent::WorkersDeregistered { .. } => Msg::NoOp,
    }
}

fn batch_msg(event: EngineEvent) -> Option<BatchMsg> {
    match event {
        EngineEvent::Completed { request_id, result } => Some(match result {
            Ok(result) => BatchMsg::ItemSucceeded {
                id: request_id,
                result: map_result(result),
            },
            Err(err) => BatchMsg::ItemFailed {
                id: request_id,
                error: map_error(err),
            },
        }),
        _ => None,
    }
}

fn map_result(result: MaterializedResult) -> ResultHandle {
    ResultHandle {
        object_url: result.object_url,
        filename: result.filename,
        byte_len: result.byte_len,
        content_type: result.content_type,
    }
}

fn map_error(err: ConversionError) -> ErrorInfo {
    use conversion_engine::FailureKind as Engine;

    let kind = match err.kind {
        Engine::Transport | Engine::Timeout => FailureKind::Transport,
        Engine::Rejected { status } => FailureKind::Rejected { status },
        Engine::Malformed | Engine::TooLarge { .. } => FailureKind::Malformed,
        Engine::InvalidUrl | Engine::UnreadableFile => FailureKind::InvalidInput,
    };
    ErrorInfo::new(kind, err.message)
}
