use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use client_logging::{client_error, client_info, client_warn};
use docflow_client::{AtomicWriter, DocumentResults, ExportError};
use docflow_core::DocumentSnapshot;
use serde::{Deserialize, Serialize};

const SESSION_FILENAME: &str = ".docflow_session.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedDocument {
    document_id: String,
    filename: String,
    page_count: u32,
    table_count: u32,
    processing_secs: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSession {
    saved_at: Option<String>,
    completed: Vec<PersistedDocument>,
}

pub(crate) fn load_session(dir: &Path) -> Vec<DocumentSnapshot> {
    let path = dir.join(SESSION_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Vec::new();
        }
        Err(err) => {
            client_warn!("Failed to read session state from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let session: PersistedSession = match ron::from_str(&content) {
        Ok(session) => session,
        Err(err) => {
            client_warn!("Failed to parse session state from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let completed = session
        .completed
        .into_iter()
        .map(|doc| DocumentSnapshot {
            document_id: doc.document_id,
            filename: doc.filename,
            page_count: doc.page_count,
            table_count: doc.table_count,
            processing_secs: doc.processing_secs,
        })
        .collect();

    client_info!("Loaded session state from {:?}", path);
    completed
}

pub(crate) fn save_session(dir: &Path, completed: &[DocumentSnapshot]) {
    let session = PersistedSession {
        saved_at: Some(Utc::now().to_rfc3339()),
        completed: completed
            .iter()
            .map(|doc| PersistedDocument {
                document_id: doc.document_id.clone(),
                filename: doc.filename.clone(),
                page_count: doc.page_count,
                table_count: doc.table_count,
                processing_secs: doc.processing_secs,
            })
            .collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&session, pretty) {
        Ok(text) => text,
        Err(err) => {
            client_error!("Failed to serialize session state: {}", err);
            return;
        }
    };

    let writer = AtomicWriter::new(dir.to_path_buf());
    if let Err(err) = writer.write_str(SESSION_FILENAME, &content) {
        client_error!("Failed to write session state to {:?}: {}", dir, err);
    }
}

/// Exports a completed document's results as pretty JSON.
pub(crate) fn export_results(
    dir: &Path,
    results: &DocumentResults,
) -> Result<PathBuf, ExportError> {
    let writer = AtomicWriter::new(dir.to_path_buf());
    writer.write_json(&format!("{}_results.json", results.id), results)
}
