use std::time::SystemTime;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Closed status set of the processing pipeline. An unrecognized string
/// in a response is a protocol error at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Preprocessing,
    OcrProcessing,
    TableExtraction,
    EmbeddingGeneration,
    Completed,
    Failed,
}

impl DocumentStatus {
    /// No further pipeline progress will occur from a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

/// OCR engines the backend can be asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngine {
    Tesseract,
    Paddleocr,
    Easyocr,
}

/// File metadata the server keeps alongside a document record. Server
/// timestamps are timezone-less ISO-8601, always UTC by convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub original_filename: String,
    pub file_size: u64,
    pub mime_type: String,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub table_count: u32,
    pub upload_date: NaiveDateTime,
}

/// One document's backend job record, as returned by the upload and
/// listing endpoints. The server owns it; this copy is read-only and
/// replaced wholesale by fresh responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentJob {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub user_id: String,
    pub metadata: DocumentMetadata,
    pub status: DocumentStatus,
    #[serde(default)]
    pub table_count: u32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Acknowledgement of a start-processing request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessingAck {
    pub message: String,
    pub document_id: String,
    pub status: String,
}

/// Status endpoint response: the status-relevant subset of a job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusReport {
    pub document_id: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub table_count: u32,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A timestamped copy of one poll cycle's status fields, delivered to
/// the poll callback. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PollObservation {
    pub observed_at: SystemTime,
    pub status: DocumentStatus,
    pub page_count: u32,
    pub table_count: u32,
    pub processing_time: Option<f64>,
    pub error_message: Option<String>,
}

impl PollObservation {
    pub(crate) fn from_report(report: &StatusReport) -> Self {
        Self {
            observed_at: SystemTime::now(),
            status: report.status,
            page_count: report.page_count,
            table_count: report.table_count,
            processing_time: report.processing_time,
            error_message: report.error_message.clone(),
        }
    }
}

/// Per-page output of one OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub engine: OcrEngine,
    pub text: String,
    pub confidence: f64,
    pub processing_time: f64,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One extracted table with its cell grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub table_id: String,
    pub page_number: u32,
    pub bounding_box: BoundingBox,
    pub rows: u32,
    pub columns: u32,
    pub data: Vec<Vec<String>>,
    pub confidence: f64,
    pub extraction_method: String,
}

/// Full results of a completed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResults {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub user_id: String,
    pub metadata: DocumentMetadata,
    pub status: DocumentStatus,
    #[serde(default)]
    pub ocr_results: Vec<OcrResult>,
    #[serde(default)]
    pub tables: Vec<TableData>,
    #[serde(default)]
    pub embeddings_generated: bool,
    #[serde(default)]
    pub processing_time: Option<f64>,
}

/// A natural-language question over the caller's completed documents.
/// `document_ids: None` leaves the scope unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub document_ids: Option<Vec<String>>,
    pub top_k: u32,
}

pub const DEFAULT_TOP_K: u32 = 5;

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            document_ids: None,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// A pointer from an answer back to the page/table/snippet supporting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub page_number: u32,
    #[serde(default)]
    pub table_id: Option<String>,
    pub text_snippet: String,
    pub confidence: f64,
}

/// Answer record for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub query: String,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: f64,
    pub processing_time: f64,
}

impl QueryAnswer {
    /// Range checks the documented shape cannot express. `top_k` bounds
    /// retrieved chunks, not citations, so the citation count is free.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("answer confidence {} outside [0, 1]", self.confidence));
        }
        for citation in &self.citations {
            if citation.page_number < 1 {
                return Err(format!(
                    "citation for {} has page number {}",
                    citation.document_id, citation.page_number
                ));
            }
        }
        Ok(())
    }
}
