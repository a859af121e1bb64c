use std::sync::Once;

use docflow_core::{
    update, AppState, DocumentStatus, Effect, FileSpec, Msg, UploadOutcome,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

fn spec(source: &str, filename: &str, size_bytes: u64) -> FileSpec {
    FileSpec {
        source: source.to_string(),
        filename: filename.to_string(),
        size_bytes,
    }
}

fn choose(state: AppState, files: Vec<FileSpec>) -> (AppState, Vec<Effect>) {
    update(state, Msg::FilesChosen(files))
}

#[test]
fn accepted_files_enqueue_upload_effects() {
    init_logging();
    let state = AppState::new();
    let (mut state, effects) = choose(
        state,
        vec![
            spec("/tmp/report.pdf", "report.pdf", 2 * 1024 * 1024),
            spec("/tmp/scan.png", "scan.png", 1024),
        ],
    );

    assert_eq!(
        effects,
        vec![
            Effect::StartUpload {
                job_id: 1,
                source: "/tmp/report.pdf".to_string(),
                filename: "report.pdf".to_string(),
            },
            Effect::StartUpload {
                job_id: 2,
                source: "/tmp/scan.png".to_string(),
                filename: "scan.png".to_string(),
            },
        ]
    );
    let view = state.view();
    assert_eq!(view.documents.len(), 2);
    assert_eq!(view.documents[0].percent, Some(0));
    assert_eq!(view.last_intake.as_ref().unwrap().accepted, 2);
    assert!(state.consume_dirty());
}

#[test]
fn rejected_files_produce_no_effects() {
    init_logging();
    let state = AppState::new();
    let (state, effects) = choose(
        state,
        vec![
            spec("/tmp/notes.docx", "notes.docx", 1024),
            spec("/tmp/huge.pdf", "huge.pdf", 51 * 1024 * 1024),
        ],
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert!(view.documents.is_empty());
    let intake = view.last_intake.unwrap();
    assert_eq!(intake.accepted, 0);
    assert_eq!(intake.rejected.len(), 2);
}

#[test]
fn upload_percent_is_monotonic() {
    init_logging();
    let state = AppState::new();
    let (state, _effects) = choose(state, vec![spec("/tmp/a.pdf", "a.pdf", 100)]);

    let (state, _) = update(state, Msg::UploadProgress { job_id: 1, percent: 40 });
    assert_eq!(state.view().documents[0].percent, Some(40));

    // A stale tick never moves the percent backwards.
    let (state, _) = update(state, Msg::UploadProgress { job_id: 1, percent: 25 });
    assert_eq!(state.view().documents[0].percent, Some(40));

    let (state, _) = update(state, Msg::UploadProgress { job_id: 1, percent: 90 });
    assert_eq!(state.view().documents[0].percent, Some(90));
}

#[test]
fn upload_success_forces_full_percent_and_starts_processing() {
    init_logging();
    let state = AppState::with_engines(vec!["tesseract".to_string()]);
    let (state, _effects) = choose(state, vec![spec("/tmp/a.pdf", "a.pdf", 100)]);
    let (state, _) = update(state, Msg::UploadProgress { job_id: 1, percent: 87 });

    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            job_id: 1,
            result: Ok(UploadOutcome {
                document_id: "doc-1".to_string(),
            }),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::BeginProcessing {
            job_id: 1,
            document_id: "doc-1".to_string(),
            engines: vec!["tesseract".to_string()],
        }]
    );
    let row = &state.view().documents[0];
    assert_eq!(row.percent, Some(100));
    assert_eq!(row.status, Some(DocumentStatus::Uploaded));
    assert_eq!(row.document_id.as_deref(), Some("doc-1"));
}

#[test]
fn upload_failure_keeps_last_percent_and_records_message() {
    init_logging();
    let state = AppState::new();
    let (state, _effects) = choose(state, vec![spec("/tmp/a.pdf", "a.pdf", 100)]);
    let (state, _) = update(state, Msg::UploadProgress { job_id: 1, percent: 55 });

    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            job_id: 1,
            result: Err("File type .pdf not allowed".to_string()),
        },
    );

    assert!(effects.is_empty());
    let row = &state.view().documents[0];
    assert_eq!(row.percent, Some(55));
    assert_eq!(row.status, None);
    assert_eq!(row.error.as_deref(), Some("File type .pdf not allowed"));
    // A failed upload row counts as settled so the session can end.
    assert!(state.view().all_settled);
}
