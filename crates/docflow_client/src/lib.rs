//! Docflow client engine: REST transport, upload tracking, status
//! polling and query execution.
mod error;
mod export;
mod handle;
mod poll;
mod query;
mod transport;
mod types;
mod upload;

pub use error::ClientError;
pub use export::{ensure_export_dir, AtomicWriter, ExportError};
pub use handle::{ClientCommand, ClientEvent, ClientHandle, JobId};
pub use poll::{StatusPoller, DEFAULT_POLL_INTERVAL};
pub use query::QueryClient;
pub use transport::{ApiSettings, DocumentApi, ReqwestApi, TransferSink};
pub use types::{
    BoundingBox, Citation, DocumentJob, DocumentMetadata, DocumentResults, DocumentStatus,
    OcrEngine, OcrResult, PollObservation, ProcessingAck, QueryAnswer, QueryRequest, StatusReport,
    TableData, DEFAULT_TOP_K,
};
pub use upload::{mime_for_extension, UploadFile, UploadTracker};
