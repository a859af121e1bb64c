use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docflow_client::{
    ApiSettings, ClientError, DocumentStatus, PollObservation, ReqwestApi, StatusPoller,
    DEFAULT_POLL_INTERVAL,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn status_body(status: &str, pages: u32, extra: &str) -> String {
    format!(
        r#"{{"document_id": "doc-1", "status": "{status}", "page_count": {pages}, "table_count": 0{extra}}}"#
    )
}

/// Serves one canned response per fetch, repeating the last one.
struct StatusSequence {
    responses: Vec<ResponseTemplate>,
    hits: AtomicUsize,
}

impl StatusSequence {
    fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            hits: AtomicUsize::new(0),
        }
    }
}

impl Respond for StatusSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let hit = self.hits.fetch_add(1, Ordering::SeqCst);
        self.responses[hit.min(self.responses.len() - 1)].clone()
    }
}

fn api(server: &MockServer) -> Arc<ReqwestApi> {
    let settings = ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    };
    Arc::new(ReqwestApi::new(settings).expect("client"))
}

fn json(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/json")
}

fn collect(observations: &Arc<Mutex<Vec<PollObservation>>>) -> impl FnMut(PollObservation) {
    let sink = observations.clone();
    move |observation| sink.lock().unwrap().push(observation)
}

#[tokio::test]
async fn poller_delivers_observations_until_completed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ocr/doc-1/status"))
        .respond_with(StatusSequence::new(vec![
            json(status_body("preprocessing", 0, "")),
            json(status_body("ocr_processing", 4, "")),
            json(status_body(
                "completed",
                4,
                r#", "processing_time": 12.5"#,
            )),
        ]))
        .mount(&server)
        .await;

    let poller = StatusPoller::with_interval(api(&server), Duration::from_millis(20));
    let observations = Arc::new(Mutex::new(Vec::new()));
    let token = CancellationToken::new();

    let report = poller
        .run("doc-1", &token, collect(&observations))
        .await
        .expect("poll ok");

    assert_eq!(report.status, DocumentStatus::Completed);
    assert!(report.processing_time.unwrap() > 0.0);

    let observed: Vec<_> = observations
        .lock()
        .unwrap()
        .iter()
        .map(|obs| obs.status)
        .collect();
    assert_eq!(
        observed,
        vec![
            DocumentStatus::Preprocessing,
            DocumentStatus::OcrProcessing,
            DocumentStatus::Completed,
        ]
    );
    // Two non-terminal observations cost exactly three fetches.
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn failed_status_is_a_terminal_observation_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ocr/doc-1/status"))
        .respond_with(StatusSequence::new(vec![json(status_body(
            "failed",
            0,
            r#", "error_message": "OCR engine crashed""#,
        ))]))
        .mount(&server)
        .await;

    let poller = StatusPoller::with_interval(api(&server), Duration::from_millis(20));
    let observations = Arc::new(Mutex::new(Vec::new()));
    let token = CancellationToken::new();

    let report = poller
        .run("doc-1", &token, collect(&observations))
        .await
        .expect("terminal failed still resolves");

    assert_eq!(report.status, DocumentStatus::Failed);
    assert_eq!(report.error_message.as_deref(), Some("OCR engine crashed"));
    assert_eq!(observations.lock().unwrap().len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn fetch_failure_stops_the_loop_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ocr/doc-1/status"))
        .respond_with(StatusSequence::new(vec![
            json(status_body("preprocessing", 0, "")),
            ResponseTemplate::new(502),
        ]))
        .mount(&server)
        .await;

    let poller = StatusPoller::with_interval(api(&server), Duration::from_millis(20));
    let observations = Arc::new(Mutex::new(Vec::new()));
    let token = CancellationToken::new();

    let err = poller
        .run("doc-1", &token, collect(&observations))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::PollFetch(_)));
    assert_eq!(observations.lock().unwrap().len(), 1);
    // The failed fetch is the last one; nothing is retried.
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn cancellation_between_observations_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ocr/doc-1/status"))
        .respond_with(StatusSequence::new(vec![json(status_body(
            "preprocessing",
            0,
            "",
        ))]))
        .mount(&server)
        .await;

    let poller = StatusPoller::with_interval(api(&server), Duration::from_secs(30));
    let token = CancellationToken::new();
    let cancel = token.clone();

    let err = poller
        .run("doc-1", &token, move |_| cancel.cancel())
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::Cancelled);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_token_fetches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ocr/doc-1/status"))
        .respond_with(json(status_body("preprocessing", 0, "")))
        .mount(&server)
        .await;

    let poller = StatusPoller::with_interval(api(&server), Duration::from_millis(20));
    let token = CancellationToken::new();
    token.cancel();

    let err = poller.run("doc-1", &token, |_| {}).await.unwrap_err();

    assert_eq!(err, ClientError::Cancelled);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_status_string_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ocr/doc-1/status"))
        .respond_with(json(status_body("exploding", 0, "")))
        .mount(&server)
        .await;

    let poller = StatusPoller::with_interval(api(&server), Duration::from_millis(20));
    let token = CancellationToken::new();

    let err = poller.run("doc-1", &token, |_| {}).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
}

#[test]
fn default_interval_bounds_the_request_rate() {
    assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_millis(2000));
}
