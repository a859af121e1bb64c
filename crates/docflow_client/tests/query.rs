use std::sync::Arc;

use docflow_client::{ApiSettings, ClientError, QueryClient, ReqwestApi};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> Arc<ReqwestApi> {
    let settings = ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    };
    Arc::new(ReqwestApi::new(settings).expect("client"))
}

fn answer_body(confidence: f64) -> String {
    format!(
        r#"{{
            "query": "What was the total revenue?",
            "answer": "Total revenue was 4.2M, per the summary table.",
            "citations": [
                {{
                    "document_id": "doc-1",
                    "page_number": 3,
                    "table_id": "table-7",
                    "text_snippet": "Revenue: 4.2M",
                    "confidence": 0.91
                }},
                {{
                    "document_id": "doc-2",
                    "page_number": 1,
                    "table_id": null,
                    "text_snippet": "revenue grew",
                    "confidence": 0.64
                }}
            ],
            "confidence": {confidence},
            "processing_time": 1.8
        }}"#
    )
}

#[tokio::test]
async fn unrestricted_query_sends_null_scope_and_parses_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query/"))
        .and(body_json(serde_json::json!({
            "query": "What was the total revenue?",
            "document_ids": null,
            "top_k": 5
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(answer_body(0.82), "application/json"),
        )
        .mount(&server)
        .await;

    let client = QueryClient::new(api(&server));
    let answer = client
        .ask("What was the total revenue?", None, 5)
        .await
        .expect("query ok");

    assert!((0.0..=1.0).contains(&answer.confidence));
    assert_eq!(answer.citations.len(), 2);
    assert!(answer.citations.iter().all(|c| c.page_number >= 1));
    assert_eq!(answer.citations[0].table_id.as_deref(), Some("table-7"));
    assert_eq!(answer.citations[1].table_id, None);
}

#[tokio::test]
async fn scoped_query_sends_document_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query/"))
        .and(body_json(serde_json::json!({
            "query": "What was the total revenue?",
            "document_ids": ["doc-1", "doc-2"],
            "top_k": 3
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(answer_body(0.5), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = QueryClient::new(api(&server));
    client
        .ask(
            "What was the total revenue?",
            Some(vec!["doc-1".to_string(), "doc-2".to_string()]),
            3,
        )
        .await
        .expect("query ok");
}

#[tokio::test]
async fn out_of_range_confidence_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(answer_body(1.5), "application/json"),
        )
        .mount(&server)
        .await;

    let client = QueryClient::new(api(&server));
    let err = client
        .ask("What was the total revenue?", None, 5)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Protocol(_)));
}

#[tokio::test]
async fn query_failure_surfaces_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query/"))
        .respond_with(ResponseTemplate::new(429).set_body_raw(
            r#"{"detail": "Query limit reached"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = QueryClient::new(api(&server));
    let err = client.ask("anything", None, 5).await.unwrap_err();

    assert_eq!(err, ClientError::Query("Query limit reached".to_string()));
}
