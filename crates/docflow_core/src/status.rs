use std::fmt;

/// Closed set of backend pipeline statuses for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Preprocessing => "preprocessing",
            DocumentStatus::OcrProcessing => "ocr_processing",
            DocumentStatus::TableExtraction => "table_extraction",
            DocumentStatus::EmbeddingGeneration => "embedding_generation",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// No further pipeline progress will occur from a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }

    /// Position in the forward progress order. `Failed` is a side state
    /// with no position; a jump to it is always accepted as terminal.
    pub(crate) fn progress_rank(self) -> Option<u8> {
        match self {
            DocumentStatus::Uploaded => Some(0),
            DocumentStatus::Preprocessing => Some(1),
            DocumentStatus::OcrProcessing => Some(2),
            DocumentStatus::TableExtraction => Some(3),
            DocumentStatus::EmbeddingGeneration => Some(4),
            DocumentStatus::Completed => Some(5),
            DocumentStatus::Failed => None,
        }
    }

    /// Rank among the four processing stages; statuses outside the
    /// pipeline have none.
    fn pipeline_rank(self) -> Option<usize> {
        STAGES
            .iter()
            .take(PIPELINE_STAGE_COUNT)
            .position(|stage| stage.status == self)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the canonical pipeline table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub name: &'static str,
    pub status: DocumentStatus,
}

/// Number of leading `STAGES` entries that are processing stages.
const PIPELINE_STAGE_COUNT: usize = 4;

/// Canonical pipeline order. Single source of truth for every
/// ahead-of/behind comparison; no other status ordering may exist.
pub const STAGES: [StageDescriptor; 5] = [
    StageDescriptor {
        name: "Preprocessing",
        status: DocumentStatus::Preprocessing,
    },
    StageDescriptor {
        name: "OCR",
        status: DocumentStatus::OcrProcessing,
    },
    StageDescriptor {
        name: "Table extraction",
        status: DocumentStatus::TableExtraction,
    },
    StageDescriptor {
        name: "Embedding generation",
        status: DocumentStatus::EmbeddingGeneration,
    },
    StageDescriptor {
        name: "Completed",
        status: DocumentStatus::Completed,
    },
];

/// Render-ready flags for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRow {
    pub name: &'static str,
    pub is_active: bool,
    pub is_completed: bool,
}

/// Maps a status onto the canonical stage list.
///
/// `high_water` is the highest non-terminal status ever observed for the
/// document. It decides which stages count as passed when `current` is
/// `failed`: stages strictly before the high-water stage were finished,
/// the high-water stage itself is where the pipeline died, and nothing at
/// or past it is completed. With no high-water mark, nothing is completed.
pub fn stage_rows(current: DocumentStatus, high_water: Option<DocumentStatus>) -> Vec<StageRow> {
    STAGES
        .iter()
        .map(|stage| {
            let is_active = current == stage.status;
            let is_completed = match current {
                DocumentStatus::Completed => true,
                DocumentStatus::Failed => match (
                    high_water.and_then(DocumentStatus::pipeline_rank),
                    stage.status.pipeline_rank(),
                ) {
                    (Some(reached), Some(rank)) => rank < reached,
                    _ => false,
                },
                _ => match (current.pipeline_rank(), stage.status.pipeline_rank()) {
                    (Some(active), Some(rank)) => rank < active,
                    _ => false,
                },
            };
            StageRow {
                name: stage.name,
                is_active,
                is_completed,
            }
        })
        .collect()
}
