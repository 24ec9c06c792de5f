use crate::error::FetchError;
use flowlens_core::RawGraph;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Explanation {
    pub summary: String,
    pub execution_flow: String,
    pub dependencies: String,
    pub variables: String,
    pub improvements: String,
    pub confidence_score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub file_path: String,
    #[serde(default)]
    pub content: String,
}

/// Remote analysis service the viewer talks to.
///
/// Session ids are opaque and passed through unchanged.
pub trait GraphBackend: Send + Sync {
    fn fetch_graph<'a>(
        &'a self,
        session_id: &'a str,
        function_name: &'a str,
    ) -> BoxFuture<'a, Result<RawGraph, FetchError>>;

    fn explain_function<'a>(
        &'a self,
        session_id: &'a str,
        function_name: &'a str,
    ) -> BoxFuture<'a, Result<Explanation, FetchError>>;

    fn read_file<'a>(
        &'a self,
        session_id: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, Result<FileContent, FetchError>>;

    /// Returns the backend's indexing report as-is.
    fn index_repository<'a>(
        &'a self,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, FetchError>>;
}

#[derive(Serialize)]
struct ExplainFunctionRequest<'a> {
    session_id: &'a str,
    function_name: &'a str,
}

/// [`GraphBackend`] over the analysis service's HTTP API.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::from)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, FetchError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl GraphBackend for HttpBackend {
    fn fetch_graph<'a>(
        &'a self,
        session_id: &'a str,
        function_name: &'a str,
    ) -> BoxFuture<'a, Result<RawGraph, FetchError>> {
        Box::pin(async move {
            let mut url = reqwest::Url::parse(&self.url("graph"))
                .map_err(|e| FetchError::Network(e.to_string()))?;
            url.path_segments_mut()
                .map_err(|_| FetchError::Network(format!("Invalid base URL: {}", self.base_url)))?
                .push(function_name);
            tracing::debug!("Fetching graph for '{}'", function_name);
            let response = self
                .client
                .get(url)
                .query(&[("session_id", session_id)])
                .send()
                .await?;
            Self::decode(response).await
        })
    }

    fn explain_function<'a>(
        &'a self,
        session_id: &'a str,
        function_name: &'a str,
    ) -> BoxFuture<'a, Result<Explanation, FetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url("explain_function"))
                .json(&ExplainFunctionRequest {
                    session_id,
                    function_name,
                })
                .send()
                .await?;
            Self::decode(response).await
        })
    }

    fn read_file<'a>(
        &'a self,
        session_id: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, Result<FileContent, FetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url("file"))
                .query(&[("session_id", session_id), ("path", path)])
                .send()
                .await?;
            Self::decode(response).await
        })
    }

    fn index_repository<'a>(
        &'a self,
        session_id: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, FetchError>> {
        Box::pin(async move {
            let mut url = reqwest::Url::parse(&self.url("sessions"))
                .map_err(|e| FetchError::Network(e.to_string()))?;
            url.path_segments_mut()
                .map_err(|_| FetchError::Network(format!("Invalid base URL: {}", self.base_url)))?
                .push(session_id)
                .push("index");
            let response = self.client.post(url).send().await?;
            Self::decode(response).await
        })
    }
}
