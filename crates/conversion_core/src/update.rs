use crate::progress::ProgressEstimator;
use crate::{Effect, Msg, SessionState, SessionStatus, UploadRequest};

/// Pure update function: applies a message to state and returns any effects.
pub fn update<E: ProgressEstimator>(
    mut state: SessionState<E>,
    msg: Msg,
) -> (SessionState<E>, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(file) => {
            if state.status().is_in_flight() {
                return (state, Vec::new());
            }
            match state.select_file(file) {
                Some(released) => vec![Effect::RevokeResult {
                    object_url: released.object_url,
                }],
                None => Vec::new(),
            }
        }
        Msg::FileRemoved => {
            if state.status() == SessionStatus::Idle {
                state.remove_file();
            }
            Vec::new()
        }
        Msg::OptionsChanged(options) => {
            if !state.status().is_in_flight() {
                state.set_options(options);
            }
            Vec::new()
        }
        Msg::SubmitClicked => {
            if state.status() != SessionStatus::Idle {
                return (state, Vec::new());
            }
            let Some(file) = state.file().cloned() else {
                return (state, Vec::new());
            };
            let request_id = state.begin_upload();
            vec![Effect::StartUpload(UploadRequest {
                request_id,
                file,
                endpoint: state.tool().endpoint.clone(),
                fields: state.options().form_fields(),
                naming: state.tool().naming.clone(),
            })]
        }
        Msg::UploadProgress {
            request_id,
            sent,
            total,
        } => {
            if state.is_current(request_id) && state.status() == SessionStatus::Uploading {
                state.apply_upload_progress(sent, total);
            }
            Vec::new()
        }
        Msg::UploadFinished { request_id } => {
            if state.is_current(request_id) && state.status() == SessionStatus::Uploading {
                state.enter_processing();
                vec![Effect::StartProcessingTicker { request_id }]
            } else {
                Vec::new()
            }
        }
        Msg::ProcessingTick {
            request_id,
            increment,
        } => {
            if state.is_current(request_id) && state.status() == SessionStatus::Processing {
                state.apply_processing_tick(increment);
            }
            Vec::new()
        }
        Msg::ConversionSucceeded { request_id, result } => {
            if !state.is_current(request_id) {
                return (state, Vec::new());
            }
            // Small payloads can answer before the upload-finished signal lands.
            if state.status() == SessionStatus::Uploading {
                state.enter_processing();
            }
            state.complete(result);
            vec![Effect::StopProcessingTicker { request_id }]
        }
        Msg::ConversionFailed { request_id, error } => {
            if !state.is_current(request_id) {
                return (state, Vec::new());
            }
            let transport = error.kind.is_transport();
            state.fail(error);
            let mut effects = vec![Effect::StopProcessingTicker { request_id }];
            if transport {
                effects.push(Effect::DeregisterWorkers);
            }
            effects
        }
        Msg::ResetClicked => match state.status() {
            SessionStatus::Done | SessionStatus::Error => match state.reset() {
                Some(released) => vec![Effect::RevokeResult {
                    object_url: released.object_url,
                }],
                None => Vec::new(),
            },
            SessionStatus::Idle | SessionStatus::Uploading | SessionStatus::Processing => {
                Vec::new()
            }
        },
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
