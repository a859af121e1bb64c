use std::collections::BTreeMap;
use std::fmt;

use crate::status::{DocumentStatus, StageRow};
use crate::view_model::{AppViewModel, DocumentRowView};

pub type JobId = u64;

/// Upload constraints enforced before any transfer effect is issued.
/// The transfer layer itself performs no validation.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
pub const ACCEPTED_EXTENSIONS: [&str; 6] = ["pdf", "jpg", "jpeg", "png", "tif", "tiff"];

/// One file the user picked for upload. `source` is an opaque locator
/// the platform layer resolves (a filesystem path for the CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub source: String,
    pub filename: String,
    pub size_bytes: u64,
}

/// Why a picked file was not enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    UnsupportedType { extension: String },
    TooLarge { size_bytes: u64 },
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeError::UnsupportedType { extension } => {
                write!(f, "unsupported file type .{extension}")
            }
            IntakeError::TooLarge { size_bytes } => {
                write!(
                    f,
                    "file is {size_bytes} bytes, over the {MAX_UPLOAD_BYTES} byte limit"
                )
            }
        }
    }
}

/// Outcome of the last intake, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntakeStats {
    pub accepted: usize,
    pub rejected: Vec<(String, IntakeError)>,
}

/// Checks a picked file against the accepted set. Extension matching is
/// case-insensitive; a missing extension is unsupported.
pub fn validate_intake(filename: &str, size_bytes: u64) -> Result<(), IntakeError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(IntakeError::UnsupportedType { extension });
    }
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(IntakeError::TooLarge { size_bytes });
    }
    Ok(())
}

/// Server-assigned identity delivered when an upload resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub document_id: String,
}

/// Status-relevant fields of one poll observation.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusObservation {
    pub status: DocumentStatus,
    pub page_count: u32,
    pub table_count: u32,
    pub processing_secs: Option<f64>,
    pub error_message: Option<String>,
}

/// A completed document restored from persisted session state.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub document_id: String,
    pub filename: String,
    pub page_count: u32,
    pub table_count: u32,
    pub processing_secs: Option<f64>,
}

/// One entry of the remote document listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedDocument {
    pub document_id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub status: DocumentStatus,
    pub page_count: u32,
    pub table_count: u32,
}

/// An answered question, kept for the session history view.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    pub processing_secs: f64,
    pub citations: Vec<CitationView>,
}

/// A pointer from an answer back to its supporting source.
#[derive(Debug, Clone, PartialEq)]
pub struct CitationView {
    pub document_id: String,
    pub page_number: u32,
    pub table_id: Option<String>,
    pub snippet: String,
    pub confidence: f64,
}

/// Everything the session knows about one document job.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    pub job_id: JobId,
    pub source: Option<String>,
    pub filename: String,
    pub size_bytes: u64,
    pub percent: Option<u8>,
    pub document_id: Option<String>,
    pub status: Option<DocumentStatus>,
    /// Highest non-terminal status ever observed; drives the stage view
    /// when the pipeline ends in `failed`.
    pub high_water: Option<DocumentStatus>,
    pub page_count: u32,
    pub table_count: u32,
    pub processing_secs: Option<f64>,
    pub polling: bool,
    pub error: Option<String>,
}

impl DocumentRow {
    fn new(job_id: JobId, filename: String) -> Self {
        Self {
            job_id,
            source: None,
            filename,
            size_bytes: 0,
            percent: None,
            document_id: None,
            status: None,
            high_water: None,
            page_count: 0,
            table_count: 0,
            processing_secs: None,
            polling: false,
            error: None,
        }
    }

    /// A settled row needs no further session activity.
    pub(crate) fn is_settled(&self) -> bool {
        if self.polling {
            return false;
        }
        self.error.is_some() || self.status.map_or(false, DocumentStatus::is_terminal)
    }

    pub(crate) fn stage_view(&self) -> Vec<StageRow> {
        match self.status {
            Some(status) => crate::status::stage_rows(status, self.high_water),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    next_job_id: JobId,
    documents: BTreeMap<JobId, DocumentRow>,
    /// Pipeline engines applied when processing starts automatically
    /// after an upload; empty means the server default.
    engines: Vec<String>,
    history: Vec<AnswerRecord>,
    last_intake: Option<IntakeStats>,
    last_session_error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with a fixed engine selection for automatic processing.
    pub fn with_engines(engines: Vec<String>) -> Self {
        Self {
            engines,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            documents: self
                .documents
                .values()
                .map(|row| DocumentRowView {
                    job_id: row.job_id,
                    filename: row.filename.clone(),
                    document_id: row.document_id.clone(),
                    percent: row.percent,
                    status: row.status,
                    stages: row.stage_view(),
                    page_count: row.page_count,
                    table_count: row.table_count,
                    processing_secs: row.processing_secs,
                    polling: row.polling,
                    error: row.error.clone(),
                })
                .collect(),
            history: self.history.clone(),
            last_intake: self.last_intake.clone(),
            last_session_error: self.last_session_error.clone(),
            all_settled: self.documents.values().all(DocumentRow::is_settled),
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is pending and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        let was = self.dirty;
        self.dirty = false;
        was
    }

    pub(crate) fn engines(&self) -> Vec<String> {
        self.engines.clone()
    }

    fn next_id(&mut self) -> JobId {
        self.next_job_id += 1;
        self.next_job_id
    }

    /// Validates picked files and enqueues the accepted ones. Returns the
    /// rows to upload.
    pub(crate) fn intake_files(&mut self, files: Vec<FileSpec>) -> Vec<(JobId, FileSpec)> {
        let mut stats = IntakeStats::default();
        let mut accepted = Vec::new();
        for spec in files {
            match validate_intake(&spec.filename, spec.size_bytes) {
                Ok(()) => {
                    let job_id = self.next_id();
                    let mut row = DocumentRow::new(job_id, spec.filename.clone());
                    row.source = Some(spec.source.clone());
                    row.size_bytes = spec.size_bytes;
                    row.percent = Some(0);
                    self.documents.insert(job_id, row);
                    stats.accepted += 1;
                    accepted.push((job_id, spec));
                }
                Err(reason) => stats.rejected.push((spec.filename, reason)),
            }
        }
        self.last_intake = Some(stats);
        self.dirty = true;
        accepted
    }

    pub(crate) fn restore_documents(&mut self, snapshots: Vec<DocumentSnapshot>) {
        for snapshot in snapshots {
            let job_id = self.next_id();
            let mut row = DocumentRow::new(job_id, snapshot.filename);
            row.document_id = Some(snapshot.document_id);
            row.status = Some(DocumentStatus::Completed);
            row.page_count = snapshot.page_count;
            row.table_count = snapshot.table_count;
            row.processing_secs = snapshot.processing_secs;
            self.documents.insert(job_id, row);
        }
        self.dirty = true;
    }

    pub(crate) fn adopt_document(&mut self, document_id: String, filename: Option<String>) -> JobId {
        let job_id = self.next_id();
        let mut row = DocumentRow::new(job_id, filename.unwrap_or_else(|| document_id.clone()));
        row.document_id = Some(document_id);
        self.documents.insert(job_id, row);
        self.dirty = true;
        job_id
    }

    pub(crate) fn replace_with_listing(&mut self, listed: Vec<ListedDocument>) {
        self.documents.clear();
        self.next_job_id = 0;
        for doc in listed {
            let job_id = self.next_id();
            let mut row = DocumentRow::new(job_id, doc.filename);
            row.document_id = Some(doc.document_id);
            row.size_bytes = doc.size_bytes;
            row.status = Some(doc.status);
            row.page_count = doc.page_count;
            row.table_count = doc.table_count;
            self.documents.insert(job_id, row);
        }
        self.dirty = true;
    }

    /// Upload percent advances monotonically; stale ticks are dropped.
    pub(crate) fn apply_upload_progress(&mut self, job_id: JobId, percent: u8) {
        if let Some(row) = self.documents.get_mut(&job_id) {
            let percent = percent.min(100);
            if row.percent.map_or(true, |prev| percent > prev) {
                row.percent = Some(percent);
                self.dirty = true;
            }
        }
    }

    pub(crate) fn apply_upload_finished(
        &mut self,
        job_id: JobId,
        result: Result<UploadOutcome, String>,
    ) -> Option<String> {
        let row = self.documents.get_mut(&job_id)?;
        self.dirty = true;
        match result {
            Ok(outcome) => {
                // Transfer completion does not imply 100 was ever observed
                // from the transport; force it here.
                row.percent = Some(100);
                row.status = Some(DocumentStatus::Uploaded);
                row.document_id = Some(outcome.document_id.clone());
                row.error = None;
                Some(outcome.document_id)
            }
            Err(message) => {
                // Percent is left as last reported; the row stays
                // retryable.
                row.error = Some(message);
                None
            }
        }
    }

    /// Gate for the begin-processing effect. Refuses rows that are
    /// already polling (one poll loop per document) or have no server id.
    pub(crate) fn begin_processing(&mut self, job_id: JobId) -> Option<String> {
        let row = self.documents.get_mut(&job_id)?;
        if row.polling {
            return None;
        }
        let document_id = row.document_id.clone()?;
        row.error = None;
        self.dirty = true;
        Some(document_id)
    }

    pub(crate) fn apply_processing_started(
        &mut self,
        job_id: JobId,
        result: Result<(), String>,
    ) -> Option<String> {
        let row = self.documents.get_mut(&job_id)?;
        self.dirty = true;
        match result {
            Ok(()) => {
                row.polling = true;
                row.document_id.clone()
            }
            Err(message) => {
                row.error = Some(message);
                None
            }
        }
    }

    /// Marks a row as watched and returns its server id, refusing rows
    /// already being polled.
    pub(crate) fn begin_watch(&mut self, job_id: JobId) -> Option<String> {
        let row = self.documents.get_mut(&job_id)?;
        if row.polling {
            return None;
        }
        let document_id = row.document_id.clone()?;
        row.polling = true;
        self.dirty = true;
        Some(document_id)
    }

    /// Applies one poll observation. The status only ever advances
    /// forward; a stale observation is dropped wholesale.
    pub(crate) fn apply_observation(&mut self, job_id: JobId, observation: StatusObservation) {
        let Some(row) = self.documents.get_mut(&job_id) else {
            return;
        };
        let incoming = observation.status;
        let regressed = match (row.status.and_then(DocumentStatus::progress_rank), incoming.progress_rank()) {
            (Some(current), Some(new)) => new < current,
            // A jump to `failed` (no rank) is always terminal progress.
            _ => false,
        };
        if regressed {
            return;
        }
        row.status = Some(incoming);
        if !incoming.is_terminal() {
            let reached = row.high_water.and_then(DocumentStatus::progress_rank);
            if incoming.progress_rank() > reached {
                row.high_water = Some(incoming);
            }
        }
        row.page_count = observation.page_count;
        row.table_count = observation.table_count;
        row.processing_secs = observation.processing_secs;
        if incoming == DocumentStatus::Failed {
            row.error = Some(
                observation
                    .error_message
                    .unwrap_or_else(|| "processing failed".to_string()),
            );
        }
        if incoming.is_terminal() {
            row.polling = false;
        }
        self.dirty = true;
    }

    pub(crate) fn apply_watch_finished(&mut self, job_id: JobId, error: Option<String>) {
        if let Some(row) = self.documents.get_mut(&job_id) {
            row.polling = false;
            if let Some(message) = error {
                row.error = Some(message);
            }
            self.dirty = true;
        }
    }

    /// Job ids of every row with an outstanding poll loop.
    pub(crate) fn polling_jobs(&self) -> Vec<JobId> {
        self.documents
            .values()
            .filter(|row| row.polling)
            .map(|row| row.job_id)
            .collect()
    }

    pub(crate) fn apply_query_finished(&mut self, result: Result<AnswerRecord, String>) {
        match result {
            Ok(record) => {
                self.history.push(record);
                self.last_session_error = None;
            }
            Err(message) => self.last_session_error = Some(message),
        }
        self.dirty = true;
    }

    /// Completed rows with a server id, for session persistence.
    pub fn completed_snapshots(&self) -> Vec<DocumentSnapshot> {
        self.documents
            .values()
            .filter(|row| row.status == Some(DocumentStatus::Completed))
            .filter_map(|row| {
                row.document_id.as_ref().map(|document_id| DocumentSnapshot {
                    document_id: document_id.clone(),
                    filename: row.filename.clone(),
                    page_count: row.page_count,
                    table_count: row.table_count,
                    processing_secs: row.processing_secs,
                })
            })
            .collect()
    }
}
