use crate::state::{AnswerRecord, IntakeStats, JobId};
use crate::status::{DocumentStatus, StageRow};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub documents: Vec<DocumentRowView>,
    pub history: Vec<AnswerRecord>,
    pub last_intake: Option<IntakeStats>,
    pub last_session_error: Option<String>,
    /// True when no row has outstanding uploads or poll loops.
    pub all_settled: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRowView {
    pub job_id: JobId,
    pub filename: String,
    pub document_id: Option<String>,
    pub percent: Option<u8>,
    pub status: Option<DocumentStatus>,
    /// Rendered fresh from the canonical stage table on every view.
    pub stages: Vec<StageRow>,
    pub page_count: u32,
    pub table_count: u32,
    pub processing_secs: Option<f64>,
    pub polling: bool,
    pub error: Option<String>,
}
