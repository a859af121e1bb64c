use std::sync::{Arc, Mutex};

use docflow_client::{
    ApiSettings, ClientError, DocumentStatus, ReqwestApi, UploadFile, UploadTracker,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn job_body(id: &str, filename: &str, size: usize) -> String {
    format!(
        r#"{{
            "_id": "{id}",
            "user_id": "user-1",
            "metadata": {{
                "filename": "srv_{filename}",
                "original_filename": "{filename}",
                "file_size": {size},
                "mime_type": "application/pdf",
                "page_count": 0,
                "table_count": 0,
                "upload_date": "2026-08-01T09:15:00"
            }},
            "status": "uploaded",
            "created_at": "2026-08-01T09:15:00",
            "updated_at": "2026-08-01T09:15:00"
        }}"#
    )
}

fn api(server: &MockServer) -> Arc<ReqwestApi> {
    let settings = ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    };
    Arc::new(ReqwestApi::new(settings).expect("client"))
}

#[tokio::test]
async fn upload_reports_increasing_percent_and_returns_job() {
    let server = MockServer::start().await;
    let bytes = vec![0u8; 2 * 1024 * 1024];
    Mock::given(method("POST"))
        .and(path("/api/upload/"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_raw(job_body("doc-1", "report.pdf", bytes.len()), "application/json"),
        )
        .mount(&server)
        .await;

    let tracker = UploadTracker::new(api(&server));
    let percents: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = percents.clone();

    let file = UploadFile::new("report.pdf", "application/pdf", bytes);
    let job = tracker
        .upload(file, move |percent| sink.lock().unwrap().push(percent))
        .await
        .expect("upload ok");

    assert_eq!(job.id, "doc-1");
    assert_eq!(job.status, DocumentStatus::Uploaded);
    assert_eq!(job.metadata.original_filename, "report.pdf");

    let percents = percents.lock().unwrap();
    assert!(!percents.is_empty());
    assert_eq!(*percents.first().unwrap(), 0);
    assert_eq!(*percents.last().unwrap(), 100);
    // Duplicates are suppressed, so the sequence is strictly increasing.
    assert!(percents.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn upload_failure_surfaces_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload/"))
        .respond_with(ResponseTemplate::new(400).set_body_raw(
            r#"{"detail": "File type .bmp not allowed. Allowed types: pdf,jpg,jpeg,png,tif,tiff"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let tracker = UploadTracker::new(api(&server));
    let file = UploadFile::new("photo.bmp", "image/bmp", vec![1, 2, 3]);
    let err = tracker.upload(file, |_| {}).await.unwrap_err();

    assert_eq!(
        err,
        ClientError::Transfer(
            "File type .bmp not allowed. Allowed types: pdf,jpg,jpeg,png,tif,tiff".to_string()
        )
    );
}

#[tokio::test]
async fn upload_failure_without_detail_gets_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tracker = UploadTracker::new(api(&server));
    let file = UploadFile::new("report.pdf", "application/pdf", vec![0; 128]);
    let err = tracker.upload(file, |_| {}).await.unwrap_err();

    match err {
        ClientError::Transfer(message) => assert!(message.contains("500")),
        other => panic!("expected Transfer, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_job_record_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload/"))
        .respond_with(
            ResponseTemplate::new(201).set_body_raw(r#"{"unexpected": true}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let tracker = UploadTracker::new(api(&server));
    let file = UploadFile::new("report.pdf", "application/pdf", vec![0; 128]);
    let err = tracker.upload(file, |_| {}).await.unwrap_err();

    assert!(matches!(err, ClientError::Protocol(_)));
}

#[test]
fn mime_types_cover_the_accepted_extensions() {
    assert_eq!(docflow_client::mime_for_extension("pdf"), "application/pdf");
    assert_eq!(docflow_client::mime_for_extension("jpeg"), "image/jpeg");
    assert_eq!(docflow_client::mime_for_extension("tif"), "image/tiff");
    assert_eq!(
        docflow_client::mime_for_extension("zip"),
        "application/octet-stream"
    );
}
