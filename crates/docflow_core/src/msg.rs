use crate::{
    AnswerRecord, DocumentSnapshot, FileSpec, JobId, ListedDocument, StatusObservation,
    UploadOutcome,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked files for upload; intake validation happens here.
    FilesChosen(Vec<FileSpec>),
    /// Restore previously completed documents from persisted state.
    RestoreDocuments(Vec<DocumentSnapshot>),
    /// Track an existing server-side document without re-uploading it.
    AdoptDocument {
        document_id: String,
        filename: Option<String>,
    },
    /// Transfer progress for an upload, as an integer percentage.
    UploadProgress { job_id: JobId, percent: u8 },
    /// Upload resolved; `Err` carries the user-facing message.
    UploadFinished {
        job_id: JobId,
        result: Result<UploadOutcome, String>,
    },
    /// User asked to (re)start pipeline processing for a row.
    ProcessingRequested { job_id: JobId, engines: Vec<String> },
    /// The start-processing call resolved.
    ProcessingStarted {
        job_id: JobId,
        result: Result<(), String>,
    },
    /// User asked to watch status for a row that is not being processed
    /// through this session (e.g. an adopted document).
    WatchRequested { job_id: JobId },
    /// One status poll observation for a watched row.
    StatusObserved {
        job_id: JobId,
        observation: StatusObservation,
    },
    /// The status poll loop for a row ended.
    WatchFinished { job_id: JobId, outcome: WatchOutcome },
    /// User submitted a question; empty `document_ids` spans everything.
    QuerySubmitted {
        question: String,
        document_ids: Vec<String>,
        top_k: u32,
    },
    /// The question-answering call resolved.
    QueryFinished {
        result: Result<AnswerRecord, String>,
    },
    /// User asked for the remote document list.
    RefreshRequested { skip: u32, limit: u32 },
    /// The document list call resolved.
    DocumentsLoaded {
        result: Result<Vec<ListedDocument>, String>,
    },
    /// Teardown: stop every outstanding status watch.
    ShutdownRequested,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

/// How a status poll loop ended, as seen by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A terminal status was observed; the final state arrived via
    /// `Msg::StatusObserved`.
    Terminal,
    /// The watch was cancelled before reaching a terminal status.
    Cancelled,
    /// A status fetch failed; carries the user-facing message.
    Failed(String),
}
