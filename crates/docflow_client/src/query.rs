use std::sync::Arc;

use crate::transport::DocumentApi;
use crate::{ClientError, QueryAnswer, QueryRequest};

/// Fires a single question against the caller's completed documents.
///
/// Stateless across calls: the backend is time-varying, so identical
/// inputs may legitimately yield different answers and nothing is cached
/// or deduplicated here. History lives with the caller.
pub struct QueryClient {
    api: Arc<dyn DocumentApi>,
}

impl QueryClient {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self { api }
    }

    /// `document_ids: None` spans every completed document the caller
    /// owns; the scope filter is simply omitted.
    pub async fn ask(
        &self,
        question: impl Into<String>,
        document_ids: Option<Vec<String>>,
        top_k: u32,
    ) -> Result<QueryAnswer, ClientError> {
        let request = QueryRequest {
            query: question.into(),
            document_ids,
            top_k,
        };
        self.api.query(&request).await
    }
}
