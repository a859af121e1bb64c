use crate::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartUpload {
        job_id: JobId,
        source: String,
        filename: String,
    },
    BeginProcessing {
        job_id: JobId,
        document_id: String,
        engines: Vec<String>,
    },
    WatchStatus {
        job_id: JobId,
        document_id: String,
    },
    CancelWatch {
        job_id: JobId,
    },
    RunQuery {
        question: String,
        document_ids: Vec<String>,
        top_k: u32,
    },
    LoadDocuments {
        skip: u32,
        limit: u32,
    },
}
