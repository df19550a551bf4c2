//! HTTP remote implementation.
//!
//! [`RestRemote`] speaks the PostgREST dialect: one endpoint per table under
//! `{base_url}/rest/v1/`, filters in the query string, JSON bodies. The HTTP
//! library itself sits behind [`HttpClient`] so tests can swap in a canned
//! client.

use crate::auth::AuthContext;
use crate::config::RemoteConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteStore;
use async_trait::async_trait;
use repairsync_core::EntityKind;
use repairsync_sync_protocol::{Filter, RemoteRow};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Headers.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implementations report network-level failures as `Err(message)`. Any
/// response that arrived, whatever its status, is `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// PostgREST-style remote store.
pub struct RestRemote<C: HttpClient> {
    config: RemoteConfig,
    client: C,
}

impl<C: HttpClient> RestRemote<C> {
    /// Creates a remote over `client`.
    pub fn new(config: RemoteConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, kind.table_name())
    }

    fn request(
        &self,
        method: Method,
        url: String,
        query: Vec<(String, String)>,
        auth: &AuthContext,
    ) -> HttpRequest {
        let bearer = auth.bearer(&self.config.service_key);
        HttpRequest {
            method,
            url,
            query,
            headers: vec![
                ("apikey".to_owned(), self.config.service_key.clone()),
                ("Authorization".to_owned(), format!("Bearer {bearer}")),
            ],
            body: None,
        }
    }

    fn with_body(mut request: HttpRequest, row: &RemoteRow, prefer: &str) -> SyncResult<HttpRequest> {
        let body = serde_json::to_vec(row).map_err(|e| SyncError::Decode(e.to_string()))?;
        request
            .headers
            .push(("Content-Type".to_owned(), "application/json".to_owned()));
        request
            .headers
            .push(("Prefer".to_owned(), prefer.to_owned()));
        request.body = Some(body);
        Ok(request)
    }

    async fn execute(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();

        let response = self
            .client
            .send(request)
            .await
            .map_err(SyncError::Transport)?;

        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body).into_owned();
            tracing::debug!(?method, %url, status = response.status, "remote request rejected");
            return Err(SyncError::remote(response.status, message));
        }
        Ok(response)
    }

    fn decode_rows(response: &HttpResponse) -> SyncResult<Vec<RemoteRow>> {
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&response.body).map_err(|e| SyncError::Decode(e.to_string()))
    }

    fn first_row(response: &HttpResponse, sent: RemoteRow) -> SyncResult<RemoteRow> {
        Ok(Self::decode_rows(response)?.into_iter().next().unwrap_or(sent))
    }
}

fn id_filter(id: &str) -> (String, String) {
    Filter::eq("id", id).query_pair()
}

#[async_trait]
impl<C: HttpClient> RemoteStore for RestRemote<C> {
    async fn select(
        &self,
        kind: EntityKind,
        filters: &[Filter],
        auth: &AuthContext,
    ) -> SyncResult<Vec<RemoteRow>> {
        let mut query = vec![("select".to_owned(), "*".to_owned())];
        query.extend(filters.iter().map(Filter::query_pair));

        let request = self.request(Method::Get, self.table_url(kind), query, auth);
        let response = self.execute(request).await?;
        Self::decode_rows(&response)
    }

    async fn create(
        &self,
        kind: EntityKind,
        row: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<RemoteRow> {
        let request = self.request(Method::Post, self.table_url(kind), Vec::new(), auth);
        let request = Self::with_body(request, &row, "return=representation")?;
        let response = self.execute(request).await?;
        Self::first_row(&response, row)
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<()> {
        let request = self.request(
            Method::Patch,
            self.table_url(kind),
            vec![id_filter(id)],
            auth,
        );
        let request = Self::with_body(request, &patch, "return=minimal")?;
        self.execute(request).await?;
        Ok(())
    }

    async fn upsert(
        &self,
        kind: EntityKind,
        row: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<RemoteRow> {
        let request = self.request(Method::Post, self.table_url(kind), Vec::new(), auth);
        let request = Self::with_body(
            request,
            &row,
            "resolution=merge-duplicates,return=representation",
        )?;
        let response = self.execute(request).await?;
        Self::first_row(&response, row)
    }

    async fn delete(&self, kind: EntityKind, id: &str, auth: &AuthContext) -> SyncResult<()> {
        let request = self.request(
            Method::Delete,
            self.table_url(kind),
            vec![id_filter(id)],
            auth,
        );
        self.execute(request).await?;
        Ok(())
    }

    async fn health(&self) -> SyncResult<()> {
        let url = format!("{}/rest/v1/", self.config.base_url);
        let request = self.request(Method::Get, url, Vec::new(), &AuthContext::service());
        self.execute(request).await?;
        Ok(())
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_client::ReqwestClient;

#[cfg(feature = "reqwest")]
mod reqwest_client {
    use super::{HttpClient, HttpRequest, HttpResponse, Method, RestRemote};
    use crate::config::RemoteConfig;
    use crate::error::{SyncError, SyncResult};
    use async_trait::async_trait;
    use std::time::Duration;

    /// [`HttpClient`] backed by `reqwest`.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Creates a client with a per-request timeout.
        pub fn new(timeout: Duration) -> SyncResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SyncError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpClient for ReqwestClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Patch => reqwest::Method::PATCH,
                Method::Delete => reqwest::Method::DELETE,
            };

            let mut builder = self.client.request(method, &request.url);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| e.to_string())?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(|e| e.to_string())?;
            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        }
    }

    impl RestRemote<ReqwestClient> {
        /// Creates a `reqwest`-backed remote from configuration.
        pub fn from_config(config: RemoteConfig) -> SyncResult<Self> {
            let client = ReqwestClient::new(config.timeout)?;
            Ok(Self::new(config, client))
        }
    }
}
