//! Batch variant: many independent items, converted one at a time in order.
//!
//! There is no aggregate state machine. Counts are derived from the items.

use crate::view_model::{BatchRowView, BatchViewModel};
use crate::{
    Effect, ErrorInfo, FileRef, OutputNaming, RequestId, ResultHandle, ToolSpec, UploadRequest,
};

pub type ItemId = RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchItemStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub id: ItemId,
    pub file: FileRef,
    pub status: BatchItemStatus,
    pub progress: u8,
    pub result: Option<ResultHandle>,
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchMsg {
    FilesAdded(Vec<FileRef>),
    ItemRemoved(ItemId),
    ProcessClicked,
    ItemSucceeded { id: ItemId, result: ResultHandle },
    ItemFailed { id: ItemId, error: ErrorInfo },
    Cleared,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchState {
    tool: ToolSpec,
    items: Vec<BatchItem>,
    next_id: ItemId,
    in_flight: Option<ItemId>,
    running: bool,
    dirty: bool,
}

impl BatchState {
    pub fn new(tool: ToolSpec) -> Self {
        Self {
            tool,
            items: Vec::new(),
            next_id: 1,
            in_flight: None,
            running: false,
            dirty: false,
        }
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_count(&self) -> usize {
        self.count(BatchItemStatus::Completed)
    }

    pub fn error_count(&self) -> usize {
        self.count(BatchItemStatus::Error)
    }

    /// Results available for "download all".
    pub fn downloadable(&self) -> Vec<&ResultHandle> {
        self.items
            .iter()
            .filter(|item| item.status == BatchItemStatus::Completed)
            .filter_map(|item| item.result.as_ref())
            .collect()
    }

    pub fn view(&self) -> BatchViewModel {
        BatchViewModel {
            rows: self
                .items
                .iter()
                .map(|item| BatchRowView {
                    id: item.id,
                    file_name: item.file.name.clone(),
                    status: item.status,
                    progress: item.progress,
                    download: item
                        .result
                        .as_ref()
                        .map(|r| (r.object_url.clone(), r.filename.clone())),
                    error_message: item.error.as_ref().map(|e| e.message.clone()),
                })
                .collect(),
            completed_count: self.completed_count(),
            error_count: self.error_count(),
            running: self.running,
            can_download_all: self.completed_count() > 0 && !self.running,
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn count(&self, status: BatchItemStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    fn item_mut(&mut self, id: ItemId) -> Option<&mut BatchItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Starts the next item that is not yet completed, or finishes the run.
    fn advance(&mut self) -> Effect {
        let next = self
            .items
            .iter_mut()
            .find(|item| item.status == BatchItemStatus::Pending);
        match next {
            Some(item) => {
                item.status = BatchItemStatus::Processing;
                item.progress = 0;
                item.error = None;
                let request = UploadRequest {
                    request_id: item.id,
                    file: item.file.clone(),
                    endpoint: self.tool.endpoint.clone(),
                    fields: Vec::new(),
                    naming: OutputNaming::prefixed("converted_", "pdf"),
                };
                self.in_flight = Some(item.id);
                Effect::StartUpload(request)
            }
            None => {
                self.in_flight = None;
                self.running = false;
                Effect::BatchFinished {
                    completed: self.completed_count(),
                    failed: self.error_count(),
                }
            }
        }
    }
}

/// Pure update function for the batch variant.
pub fn update_batch(mut state: BatchState, msg: BatchMsg) -> (BatchState, Vec<Effect>) {
    let effects = match msg {
        BatchMsg::FilesAdded(files) => {
            if files.is_empty() {
                return (state, Vec::new());
            }
            for file in files {
                let id = state.next_id;
                state.next_id += 1;
                state.items.push(BatchItem {
                    id,
                    file,
                    status: BatchItemStatus::Pending,
                    progress: 0,
                    result: None,
                    error: None,
                });
            }
            state.dirty = true;
            Vec::new()
        }
        BatchMsg::ItemRemoved(id) => {
            if state.in_flight == Some(id) {
                return (state, Vec::new());
            }
            let Some(index) = state.items.iter().position(|item| item.id == id) else {
                return (state, Vec::new());
            };
            let removed = state.items.remove(index);
            state.dirty = true;
            removed
                .result
                .map(|r| Effect::RevokeResult {
                    object_url: r.object_url,
                })
                .into_iter()
                .collect()
        }
        BatchMsg::ProcessClicked => {
            if state.running || state.items.is_empty() {
                return (state, Vec::new());
            }
            // Completed items are kept; failed ones get another attempt.
            for item in state.items.iter_mut() {
                if item.status == BatchItemStatus::Error {
                    item.status = BatchItemStatus::Pending;
                }
            }
            state.running = true;
            state.dirty = true;
            vec![state.advance()]
        }
        BatchMsg::ItemSucceeded { id, result } => {
            if state.in_flight != Some(id) {
                return (state, Vec::new());
            }
            if let Some(item) = state.item_mut(id) {
                item.status = BatchItemStatus::Completed;
                item.progress = 100;
                item.result = Some(result);
            }
            state.dirty = true;
            vec![state.advance()]
        }
        BatchMsg::ItemFailed { id, error } => {
            if state.in_flight != Some(id) {
                return (state, Vec::new());
            }
            let transport = error.kind.is_transport();
            if let Some(item) = state.item_mut(id) {
                item.status = BatchItemStatus::Error;
                item.error = Some(error);
            }
            state.dirty = true;
            let mut effects = Vec::with_capacity(2);
            if transport {
                effects.push(Effect::DeregisterWorkers);
            }
            effects.push(state.advance());
            effects
        }
        BatchMsg::Cleared => {
            if state.running {
                return (state, Vec::new());
            }
            state.dirty = true;
            state
                .items
                .drain(..)
                .filter_map(|item| item.result)
                .map(|r| Effect::RevokeResult {
                    object_url: r.object_url,
                })
                .collect()
        }
    };

    (state, effects)
}
