use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::transport::{DocumentApi, TransferSink};
use crate::{ClientError, DocumentJob};

/// A file prepared for upload. Validation against the accepted set
/// happens before one of these is built; the tracker transfers whatever
/// it is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, deriving the MIME type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::Transfer(format!("{} has no file name", path.display())))?;
        let bytes = std::fs::read(path)
            .map_err(|err| ClientError::Transfer(format!("{}: {err}", path.display())))?;
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Ok(Self::new(filename, mime_for_extension(&extension), bytes))
    }
}

/// MIME type for the accepted upload extensions.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Rounded integer percentage of a transfer. An empty file is complete
/// the moment the request is sent.
pub(crate) fn percent_of(bytes_sent: u64, bytes_total: u64) -> u8 {
    if bytes_total == 0 {
        return 100;
    }
    ((bytes_sent.min(bytes_total) * 100 + bytes_total / 2) / bytes_total) as u8
}

struct PercentState<F> {
    emit: F,
    last: Option<u8>,
}

/// Adapts raw byte ticks to the 0..=100 percent stream. The cumulative
/// byte counter makes the emitted sequence non-decreasing; unchanged
/// values are suppressed.
struct PercentSink<F> {
    state: Mutex<PercentState<F>>,
}

impl<F: FnMut(u8) + Send> TransferSink for PercentSink<F> {
    fn emit(&self, bytes_sent: u64, bytes_total: u64) {
        let percent = percent_of(bytes_sent, bytes_total);
        if let Ok(mut state) = self.state.lock() {
            if state.last.map_or(true, |last| percent > last) {
                state.last = Some(percent);
                (state.emit)(percent);
            }
        }
    }
}

/// Wraps a single file transfer, reporting progress as an integer
/// percentage and returning the created job record.
pub struct UploadTracker {
    api: Arc<dyn DocumentApi>,
}

impl UploadTracker {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self { api }
    }

    /// Transfers `file`, invoking `on_percent` as bytes reach the
    /// transport. A resolved transfer does not imply 100 was observed;
    /// the caller forces the final value after this returns.
    pub async fn upload<F>(
        &self,
        file: UploadFile,
        on_percent: F,
    ) -> Result<DocumentJob, ClientError>
    where
        F: FnMut(u8) + Send + 'static,
    {
        let sink = Arc::new(PercentSink {
            state: Mutex::new(PercentState {
                emit: on_percent,
                last: None,
            }),
        });
        self.api.upload(file, sink).await
    }
}
