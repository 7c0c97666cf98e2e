//! REST binding for the cloud disk API
//!
//! Every request carries an `Authorization: OAuth <token>` header. Non-2xx
//! responses are decoded into [`DiskError::ApiError`].

use super::{
    ApiErrorBody, DiskError, QuotaSnapshot, Resource, StorageClient, UploadLink,
};
use crate::config::DEFAULT_API_URL;
use async_trait::async_trait;
use reqwest::{Body, Method, RequestBuilder, Response};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// Connect timeout for API calls. Transfers themselves are not bounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloud disk REST client
pub struct DiskClient {
    api_url: String,
    token: String,
    http_client: reqwest::Client,
}

impl DiskClient {
    /// Create a client for the default API endpoint
    pub fn new(token: impl Into<String>) -> Result<Self, DiskError> {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    /// Create a client for a custom API endpoint
    pub fn with_api_url(
        api_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, DiskError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(DiskError::ConfigError(format!(
                "API URL must start with http:// or https://, got: {}",
                api_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| DiskError::ConfigError(e.to_string()))?;

        Ok(Self {
            api_url,
            token: token.into(),
            http_client,
        })
    }

    /// Get the API endpoint URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn auth_header(&self) -> String {
        format!("OAuth {}", self.token)
    }

    /// Build an authorized request against `{api_url}/{endpoint}`
    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = if endpoint.is_empty() {
            self.api_url.clone()
        } else {
            format!("{}/{}", self.api_url, endpoint)
        };
        self.http_client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
    }

    /// Send a request and turn error statuses into `DiskError::ApiError`
    async fn send(request: RequestBuilder) -> Result<Response, DiskError> {
        let response = request.send().await?;
        check_response(response).await
    }

    /// Fetch metadata of a file or folder
    #[tracing::instrument(name = "disk.resource", skip(self), err)]
    pub async fn resource(&self, path: &str) -> Result<Resource, DiskError> {
        let request = self.request(Method::GET, "resources").query(&[
            ("path", path),
            ("limit", "50"),
            ("sort", "-created"),
        ]);
        let response = Self::send(request).await?;
        response
            .json::<Resource>()
            .await
            .map_err(|e| DiskError::ResponseError(format!("Invalid resource body: {}", e)))
    }

    /// Request a temporary upload URL for `remote_path`
    async fn upload_link(&self, remote_path: &str) -> Result<UploadLink, DiskError> {
        let request = self
            .request(Method::GET, "resources/upload")
            .query(&[("path", remote_path), ("overwrite", "true")]);
        let response = Self::send(request).await?;
        let link = response
            .json::<UploadLink>()
            .await
            .map_err(|e| DiskError::ResponseError(format!("Invalid upload link body: {}", e)))?;
        if link.href.is_empty() {
            return Err(DiskError::ResponseError("Empty upload link".into()));
        }
        Ok(link)
    }
}

#[async_trait]
impl StorageClient for DiskClient {
    #[tracing::instrument(name = "disk.quota", skip(self), err)]
    async fn quota(&self) -> Result<QuotaSnapshot, DiskError> {
        let response = Self::send(self.request(Method::GET, "")).await?;
        response
            .json::<QuotaSnapshot>()
            .await
            .map_err(|e| DiskError::ResponseError(format!("Invalid disk info body: {}", e)))
    }

    async fn resource_exists(&self, path: &str) -> Result<bool, DiskError> {
        match self.resource(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(name = "disk.create_folder", skip(self), err)]
    async fn create_folder(&self, path: &str) -> Result<(), DiskError> {
        let request = self.request(Method::PUT, "resources").query(&[("path", path)]);
        Self::send(request).await?;
        Ok(())
    }

    #[tracing::instrument(
        name = "disk.upload_file",
        skip(self),
        fields(
            local.path = %local_path.display(),
            upload.bytes = tracing::field::Empty,
            http.status_code = tracing::field::Empty
        )
    )]
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<(), DiskError> {
        let file = tokio::fs::File::open(local_path).await?;
        let size = file.metadata().await?.len();
        let link = self.upload_link(remote_path).await?;

        let span = tracing::Span::current();
        span.record("upload.bytes", size);

        // The body is streamed from disk; the file is never buffered whole
        let response = self
            .http_client
            .put(&link.href)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;
        span.record("http.status_code", response.status().as_u16());
        check_response(response).await?;
        Ok(())
    }

    #[tracing::instrument(name = "disk.delete_file", skip(self), err)]
    async fn delete_file(&self, path: &str) -> Result<(), DiskError> {
        let request = self
            .request(Method::DELETE, "resources")
            .query(&[("path", path), ("permanently", "true")]);
        Self::send(request).await?;
        Ok(())
    }
}

/// Decode an error body for statuses >= 400; the body is best effort
async fn check_response(response: Response) -> Result<Response, DiskError> {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return Ok(response);
    }

    let body = response
        .json::<ApiErrorBody>()
        .await
        .unwrap_or_default();
    let message = if body.message.is_empty() {
        body.description
    } else {
        body.message
    };

    Err(DiskError::ApiError {
        status: status.as_u16(),
        code: body.error,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DiskClient::new("token").unwrap();
        assert_eq!(client.api_url(), DEFAULT_API_URL);
        assert_eq!(client.auth_header(), "OAuth token");
    }

    #[test]
    fn test_custom_api_url_trailing_slash() {
        let client = DiskClient::with_api_url("http://localhost:9000/v1/disk/", "t").unwrap();
        assert_eq!(client.api_url(), "http://localhost:9000/v1/disk");
    }

    #[test]
    fn test_invalid_api_url() {
        let result = DiskClient::with_api_url("localhost:9000", "t");
        assert!(matches!(result, Err(DiskError::ConfigError(_))));
    }
}
