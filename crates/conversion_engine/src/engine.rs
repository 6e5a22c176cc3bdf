use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};

use crate::blob::BlobStore;
use crate::config::ApiConfig;
use crate::filename::download_filename;
use crate::ticker::{start_ticker, TickerHandle, TickerSettings};
use crate::upload::{ChannelProgressSink, ProgressSink, ReqwestUploader, UploadSettings, Uploader};
use crate::worker::WorkerDeregistrar;
use crate::{
    ConversionError, EngineEvent, FailureKind, MaterializedResult, RequestId, SubmitJob, UploadJob,
};

#[derive(Clone, Default)]
pub struct EngineConfig {
    pub api: ApiConfig,
    pub upload: UploadSettings,
    pub ticker: TickerSettings,
    /// Origin embedded in object URLs.
    pub blob_origin: Option<String>,
}

enum EngineCommand {
    Submit(SubmitJob),
    StartTicker { request_id: RequestId },
    StopTicker { request_id: RequestId },
    DeregisterWorkers,
}

/// Runs uploads, progress tickers and worker cleanup on a background runtime.
/// Clones share the same engine thread and event stream.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
    blobs: BlobStore,
}

impl EngineHandle {
    pub fn new(config: EngineConfig, deregistrar: Arc<dyn WorkerDeregistrar>) -> Self {
        let uploader: Arc<dyn Uploader> =
            Arc::new(ReqwestUploader::new(config.api.clone(), config.upload.clone()));
        Self::with_uploader(config, uploader, deregistrar)
    }

    pub fn with_uploader(
        config: EngineConfig,
        uploader: Arc<dyn Uploader>,
        deregistrar: Arc<dyn WorkerDeregistrar>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let blobs = match config.blob_origin.as_deref() {
            Some(origin) => BlobStore::new(origin),
            None => BlobStore::default(),
        };

        let worker = EngineWorker {
            uploader,
            deregistrar,
            blobs: blobs.clone(),
            ticker: config.ticker,
            event_tx,
        };
        thread::spawn(move || worker.run(cmd_rx));

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            blobs,
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn submit(&self, job: SubmitJob) {
        self.send(EngineCommand::Submit(job));
    }

    pub fn start_ticker(&self, request_id: RequestId) {
        self.send(EngineCommand::StartTicker { request_id });
    }

    pub fn stop_ticker(&self, request_id: RequestId) {
        self.send(EngineCommand::StopTicker { request_id });
    }

    /// Fire-and-forget; the outcome arrives as `WorkersDeregistered`.
    pub fn deregister_workers(&self) {
        self.send(EngineCommand::DeregisterWorkers);
    }

    pub fn revoke(&self, object_url: &str) -> bool {
        self.blobs.revoke_object_url(object_url)
    }

    /// `Disconnected` means the engine thread has stopped.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv_timeout(timeout)
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_error!("Engine thread is gone; command dropped");
        }
    }
}

struct EngineWorker {
    uploader: Arc<dyn Uploader>,
    deregistrar: Arc<dyn WorkerDeregistrar>,
    blobs: BlobStore,
    ticker: TickerSettings,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl EngineWorker {
    fn run(self, cmd_rx: mpsc::Receiver<EngineCommand>) {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(err) => {
                engine_error!("Failed to start engine runtime: {}", err);
                return;
            }
        };
        let mut tickers: HashMap<RequestId, TickerHandle> = HashMap::new();

        while let Ok(command) = cmd_rx.recv() {
            match command {
                EngineCommand::Submit(job) => {
                    let uploader = self.uploader.clone();
                    let blobs = self.blobs.clone();
                    let event_tx = self.event_tx.clone();
                    runtime.spawn(async move {
                        let request_id = job.request_id;
                        let sink: Arc<dyn ProgressSink> =
                            Arc::new(ChannelProgressSink::new(event_tx.clone()));
                        let result = run_submit(uploader.as_ref(), &blobs, job, sink).await;
                        let _ = event_tx.send(EngineEvent::Completed { request_id, result });
                    });
                }
                EngineCommand::StartTicker { request_id } => {
                    let sink: Arc<dyn ProgressSink> =
                        Arc::new(ChannelProgressSink::new(self.event_tx.clone()));
                    let handle = start_ticker(runtime.handle(), request_id, self.ticker, sink);
                    tickers.insert(request_id, handle);
                }
                EngineCommand::StopTicker { request_id } => {
                    if tickers.remove(&request_id).is_some() {
                        engine_debug!("Ticker stopped request_id={}", request_id);
                    }
                }
                EngineCommand::DeregisterWorkers => {
                    let deregistrar = self.deregistrar.clone();
                    let event_tx = self.event_tx.clone();
                    runtime.spawn(async move {
                        let count = deregistrar.unregister_all().await;
                        engine_info!("Worker deregistration removed {} registration(s)", count);
                        let _ = event_tx.send(EngineEvent::WorkersDeregistered { count });
                    });
                }
            }
        }

        tickers.clear();
        runtime.shutdown_timeout(Duration::from_millis(200));
    }
}

/// Reads the file, uploads it and keeps the response body behind an object URL.
pub(crate) async fn run_submit(
    uploader: &dyn Uploader,
    blobs: &BlobStore,
    job: SubmitJob,
    sink: Arc<dyn ProgressSink>,
) -> Result<MaterializedResult, ConversionError> {
    let bytes = tokio::fs::read(&job.path).await.map_err(|err| {
        engine_warn!("Cannot read {}: {}", job.path.display(), err);
        ConversionError::new(
            FailureKind::UnreadableFile,
            format!("Could not read {}: {}", job.file_name, err),
        )
    })?;

    let upload = UploadJob {
        request_id: job.request_id,
        file_name: job.file_name,
        mime_type: job.mime_type,
        bytes,
        endpoint: job.endpoint,
        fields: job.fields,
    };
    let output = uploader.upload(upload, sink).await?;

    let filename = download_filename(output.content_disposition.as_deref(), &job.fallback_filename);
    let byte_len = output.bytes.len() as u64;
    let content_type = output.content_type.clone();
    let object_url = blobs.create_object_url(output.bytes, output.content_type);
    engine_info!(
        "Result ready request_id={} file={} bytes={}",
        job.request_id,
        filename,
        byte_len
    );
    Ok(MaterializedResult {
        object_url,
        filename,
        byte_len,
        content_type,
    })
}
