//! Timer that drives the estimated progress while the server is processing.

use std::sync::Arc;
use std::time::Duration;

use engine_logging::engine_trace;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, ProgressSink, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerSettings {
    pub interval: Duration,
    /// Each tick adds a random increment in `1..=max_increment`.
    pub max_increment: u8,
}

impl Default for TickerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(300),
            max_increment: 10,
        }
    }
}

/// Owns one running ticker task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct TickerHandle {
    token: CancellationToken,
}

impl TickerHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawns the ticker on the given runtime.
pub fn start_ticker(
    runtime: &tokio::runtime::Handle,
    request_id: RequestId,
    settings: TickerSettings,
    sink: Arc<dyn ProgressSink>,
) -> TickerHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();
    let max_increment = settings.max_increment.max(1);

    runtime.spawn(async move {
        let mut interval = tokio::time::interval(settings.interval);
        // The first tick of a tokio interval fires immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = interval.tick() => {
                    let increment = rand::rng().random_range(1..=max_increment);
                    engine_trace!(
                        "Processing tick request_id={} increment={}",
                        request_id,
                        increment
                    );
                    sink.emit(EngineEvent::ProcessingTick { request_id, increment });
                }
            }
        }
    });

    TickerHandle { token }
}
