//! Docflow core: pure state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod status;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{Msg, WatchOutcome};
pub use state::{
    validate_intake, AnswerRecord, AppState, CitationView, DocumentRow, DocumentSnapshot,
    FileSpec, IntakeError, IntakeStats, JobId, ListedDocument, StatusObservation, UploadOutcome,
    ACCEPTED_EXTENSIONS, MAX_UPLOAD_BYTES,
};
pub use status::{stage_rows, DocumentStatus, StageDescriptor, StageRow, STAGES};
pub use update::update;
pub use view_model::{AppViewModel, DocumentRowView};
