use crate::{AppState, Effect, Msg, WatchOutcome};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesChosen(files) => {
            let accepted = state.intake_files(files);
            accepted
                .into_iter()
                .map(|(job_id, spec)| Effect::StartUpload {
                    job_id,
                    source: spec.source,
                    filename: spec.filename,
                })
                .collect()
        }
        Msg::RestoreDocuments(snapshots) => {
            state.restore_documents(snapshots);
            Vec::new()
        }
        Msg::AdoptDocument {
            document_id,
            filename,
        } => {
            state.adopt_document(document_id, filename);
            Vec::new()
        }
        Msg::UploadProgress { job_id, percent } => {
            state.apply_upload_progress(job_id, percent);
            Vec::new()
        }
        Msg::UploadFinished { job_id, result } => {
            match state.apply_upload_finished(job_id, result) {
                // Processing starts as soon as the server has the file.
                Some(document_id) => vec![Effect::BeginProcessing {
                    job_id,
                    document_id,
                    engines: state.engines(),
                }],
                None => Vec::new(),
            }
        }
        Msg::ProcessingRequested { job_id, engines } => match state.begin_processing(job_id) {
            Some(document_id) => vec![Effect::BeginProcessing {
                job_id,
                document_id,
                engines,
            }],
            None => Vec::new(),
        },
        Msg::ProcessingStarted { job_id, result } => {
            match state.apply_processing_started(job_id, result) {
                Some(document_id) => vec![Effect::WatchStatus {
                    job_id,
                    document_id,
                }],
                None => Vec::new(),
            }
        }
        Msg::WatchRequested { job_id } => match state.begin_watch(job_id) {
            Some(document_id) => vec![Effect::WatchStatus {
                job_id,
                document_id,
            }],
            None => Vec::new(),
        },
        Msg::StatusObserved {
            job_id,
            observation,
        } => {
            state.apply_observation(job_id, observation);
            Vec::new()
        }
        Msg::WatchFinished { job_id, outcome } => {
            let error = match outcome {
                WatchOutcome::Terminal | WatchOutcome::Cancelled => None,
                WatchOutcome::Failed(message) => Some(message),
            };
            state.apply_watch_finished(job_id, error);
            Vec::new()
        }
        Msg::QuerySubmitted {
            question,
            document_ids,
            top_k,
        } => vec![Effect::RunQuery {
            question,
            document_ids,
            top_k,
        }],
        Msg::QueryFinished { result } => {
            state.apply_query_finished(result);
            Vec::new()
        }
        Msg::RefreshRequested { skip, limit } => vec![Effect::LoadDocuments { skip, limit }],
        Msg::DocumentsLoaded { result } => {
            match result {
                Ok(listed) => state.replace_with_listing(listed),
                Err(message) => state.apply_query_finished(Err(message)),
            }
            Vec::new()
        }
        Msg::ShutdownRequested => state
            .polling_jobs()
            .into_iter()
            .map(|job_id| Effect::CancelWatch { job_id })
            .collect(),
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
