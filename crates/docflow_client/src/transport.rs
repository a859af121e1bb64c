use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{server_message, ClientError};
use crate::upload::UploadFile;
use crate::{
    DocumentJob, DocumentResults, OcrEngine, ProcessingAck, QueryAnswer, QueryRequest,
    StatusReport,
};

/// Bytes handed to the transport per progress tick during an upload.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Receives cumulative byte counts while an upload body is streamed.
pub trait TransferSink: Send + Sync {
    fn emit(&self, bytes_sent: u64, bytes_total: u64);
}

/// The REST surface this client consumes. Injected everywhere so tests
/// can substitute a fake.
#[async_trait::async_trait]
pub trait DocumentApi: Send + Sync {
    async fn upload(
        &self,
        file: UploadFile,
        sink: Arc<dyn TransferSink>,
    ) -> Result<DocumentJob, ClientError>;

    async fn list_documents(&self, skip: u32, limit: u32)
        -> Result<Vec<DocumentJob>, ClientError>;

    async fn start_processing(
        &self,
        document_id: &str,
        engines: &[OcrEngine],
    ) -> Result<ProcessingAck, ClientError>;

    async fn fetch_status(&self, document_id: &str) -> Result<StatusReport, ClientError>;

    async fn fetch_results(&self, document_id: &str) -> Result<DocumentResults, ClientError>;

    async fn query(&self, request: &QueryRequest) -> Result<QueryAnswer, ClientError>;
}

#[derive(Serialize)]
struct ProcessBody<'a> {
    engines: Option<&'a [OcrEngine]>,
}

/// Production `DocumentApi` over reqwest. Stateless apart from the
/// connection pool; one instance is shared by every component.
#[derive(Debug, Clone)]
pub struct ReqwestApi {
    client: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ClientError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ClientError::Settings(format!("{}: {err}", settings.base_url)))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::Settings(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            bearer_token: settings.bearer_token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Settings(format!("{path}: {err}")))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request, surfacing failures through `wrap` with the
    /// server's `detail` message when the response carries one.
    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        wrap: fn(String) -> ClientError,
    ) -> Result<Bytes, ClientError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|err| wrap(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| wrap(err.to_string()))?;
        if !status.is_success() {
            return Err(wrap(server_message(status, &body)));
        }
        Ok(body)
    }

    /// Boundary validation: a body that does not match the documented
    /// shape is a protocol error, distinct from the transport kinds.
    fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
        serde_json::from_slice(body).map_err(|err| ClientError::Protocol(err.to_string()))
    }
}

#[async_trait::async_trait]
impl DocumentApi for ReqwestApi {
    async fn upload(
        &self,
        file: UploadFile,
        sink: Arc<dyn TransferSink>,
    ) -> Result<DocumentJob, ClientError> {
        let total = file.bytes.len() as u64;
        sink.emit(0, total);

        // Chunked body so the sink sees cumulative bytes as the transport
        // pulls them.
        let chunks: Vec<Bytes> = file
            .bytes
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(Bytes::copy_from_slice)
            .collect();
        let sent = AtomicU64::new(0);
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            let so_far = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            sink.emit(so_far, total);
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let part =
            reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
                .file_name(file.filename.clone())
                .mime_str(&file.mime_type)
                .map_err(|err| ClientError::Transfer(err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let builder = self
            .client
            .post(self.endpoint("api/upload/")?)
            .multipart(form);
        let body = self.execute(builder, ClientError::Transfer).await?;
        Self::parse(&body)
    }

    async fn list_documents(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<DocumentJob>, ClientError> {
        let builder = self
            .client
            .get(self.endpoint("api/upload/my-documents")?)
            .query(&[("skip", skip), ("limit", limit)]);
        let body = self.execute(builder, ClientError::Request).await?;
        Self::parse(&body)
    }

    async fn start_processing(
        &self,
        document_id: &str,
        engines: &[OcrEngine],
    ) -> Result<ProcessingAck, ClientError> {
        let payload = ProcessBody {
            engines: if engines.is_empty() {
                None
            } else {
                Some(engines)
            },
        };
        let builder = self
            .client
            .post(self.endpoint(&format!("api/ocr/{document_id}/process"))?)
            .json(&payload);
        let body = self.execute(builder, ClientError::Request).await?;
        Self::parse(&body)
    }

    async fn fetch_status(&self, document_id: &str) -> Result<StatusReport, ClientError> {
        let builder = self
            .client
            .get(self.endpoint(&format!("api/ocr/{document_id}/status"))?);
        let body = self.execute(builder, ClientError::PollFetch).await?;
        Self::parse(&body)
    }

    async fn fetch_results(&self, document_id: &str) -> Result<DocumentResults, ClientError> {
        let builder = self
            .client
            .get(self.endpoint(&format!("api/ocr/{document_id}/results"))?);
        let body = self.execute(builder, ClientError::Request).await?;
        Self::parse(&body)
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryAnswer, ClientError> {
        let builder = self
            .client
            .post(self.endpoint("api/query/")?)
            .json(request);
        let body = self.execute(builder, ClientError::Query).await?;
        let answer: QueryAnswer = Self::parse(&body)?;
        answer.validate().map_err(ClientError::Protocol)?;
        Ok(answer)
    }
}
