//! HTTP utilities for Cloudflare REST API calls

use super::envelope::{errors_of, Envelope};
use crate::error::Error;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4/";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// The underlying connection pool
///
/// `Owned` pools were built by this crate and are released with the client.
/// `Shared` pools belong to the caller; the client only holds a reference.
#[derive(Debug, Clone)]
pub enum Transport {
    Owned(Client),
    Shared(Arc<Client>),
}

impl Transport {
    fn client(&self) -> &Client {
        match self {
            Transport::Owned(client) => client,
            Transport::Shared(client) => client,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Transport::Owned(_))
    }
}

/// HTTP client wrapper for Cloudflare API calls
#[derive(Debug)]
pub struct HttpClient {
    transport: Transport,
    base_url: Url,
    token: String,
}

impl HttpClient {
    /// Create a client that owns its connection pool
    pub fn new(base_url: &str, token: &str) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(concat!("cfapi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Self::with_transport(Transport::Owned(client), base_url, token)
    }

    /// Create a client on top of a caller-managed connection pool
    pub fn shared(client: Arc<Client>, base_url: &str, token: &str) -> Result<Self, Error> {
        Self::with_transport(Transport::Shared(client), base_url, token)
    }

    fn with_transport(transport: Transport, base_url: &str, token: &str) -> Result<Self, Error> {
        if token.trim().is_empty() {
            return Err(Error::config("API token is not configured"));
        }

        // Url::join drops the last path segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::config(format!("Invalid base URL {}: {}", base_url, e)))?;

        Ok(Self {
            transport,
            base_url,
            token: token.to_string(),
        })
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path (e.g. `zones/abc`) against the base URL
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::config(format!("Invalid request path {}: {}", path, e)))
    }

    fn builder(&self, method: Method, path: &str, query: &[(&str, String)]) -> Result<RequestBuilder, Error> {
        let url = self.url(path)?;
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .transport
            .client()
            .request(method, url)
            .bearer_auth(&self.token);
        if !query.is_empty() {
            request = request.query(query);
        }
        Ok(request)
    }

    /// Send a request and decode the response envelope
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Envelope<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self.builder(method, path, query)?;
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let body = read_success_body(response).await?;

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(empty_envelope());
        }

        Envelope::parse(&body)
    }

    /// Send a raw body (object uploads) and decode the response envelope
    pub async fn request_bytes<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<Envelope<T>, Error> {
        let mut request = self.builder(method, path, &[])?.body(body);
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        let response = request.send().await?;
        let body = read_success_body(response).await?;

        if body.trim().is_empty() {
            return Ok(empty_envelope());
        }

        Envelope::parse(&body)
    }

    /// Download a raw body (object reads)
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, Error> {
        let response = self.builder(Method::GET, path, &[])?.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Fetch only the headers of a resource (object metadata)
    pub async fn head(&self, path: &str) -> Result<HeaderMap, Error> {
        let response = self.builder(Method::HEAD, path, &[])?.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, ""));
        }

        Ok(response.headers().clone())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, Error> {
        self.request::<T, ()>(Method::GET, path, query, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, Error> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, Error> {
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, Error> {
        self.request::<T, ()>(Method::DELETE, path, &[], None).await
    }
}

fn empty_envelope<T>() -> Envelope<T> {
    Envelope {
        success: true,
        errors: Vec::new(),
        messages: Vec::new(),
        result: None,
        result_info: None,
    }
}

/// Read the body of a response, failing on a non-2xx status
async fn read_success_body(response: Response) -> Result<String, Error> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::transport(format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(status_error(status, &body));
    }

    Ok(body)
}

/// Build the error for a non-2xx response, keeping any envelope errors it carried
fn status_error(status: reqwest::StatusCode, body: &str) -> Error {
    // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
    tracing::error!("API error: {} - {}", status, sanitize_for_log(body));

    let errors = errors_of(body);

    Error::Transport {
        status: Some(status.as_u16()),
        errors,
        message: format!("API request failed: {}", status),
    }
}

/// Format an API error for display
/// Security: Maps HTTP failures to generic messages instead of raw bodies
pub fn format_api_error(error: &Error) -> String {
    let friendly = match error.status() {
        Some(401) => Some("Authentication failed. Check your API token."),
        Some(403) => Some("Permission denied. Check the API token's permissions."),
        Some(404) => Some("Resource not found."),
        Some(409) => Some("Resource conflict. The resource may already exist or be in use."),
        Some(429) => Some("Rate limit exceeded. Please try again later."),
        Some(400) => Some("Invalid request. Check your parameters."),
        Some(s) if s >= 500 => Some("Cloudflare service temporarily unavailable. Please try again."),
        _ => None,
    };
    if let Some(message) = friendly {
        return message.to_string();
    }

    let error_str = error.to_string();

    // Truncate long error messages and remove potential sensitive data
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.ends_with("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc"), "abc");
    }

    #[test]
    fn test_url_joins_relative_paths() {
        let http = HttpClient::new("https://api.example.com/client/v4", "token").unwrap();
        assert_eq!(
            http.url("/zones/abc").unwrap().as_str(),
            "https://api.example.com/client/v4/zones/abc"
        );
        assert!(http.transport().is_owned());
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let err = HttpClient::new(DEFAULT_BASE_URL, " ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_shared_transport_is_not_owned() {
        let pool = Arc::new(Client::new());
        let http = HttpClient::shared(pool.clone(), DEFAULT_BASE_URL, "token").unwrap();
        assert!(!http.transport().is_owned());
        assert_eq!(Arc::strong_count(&pool), 2);
        drop(http);
        assert_eq!(Arc::strong_count(&pool), 1);
    }

    #[test]
    fn test_status_error_keeps_envelope_errors() {
        let body = r#"{"success":false,"errors":[{"code":10006,"message":"no such bucket"}]}"#;
        let err = status_error(reqwest::StatusCode::NOT_FOUND, body);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.code(), Some(10006));
        assert_eq!(format_api_error(&err), "Resource not found.");
    }

    #[test]
    fn test_format_api_error_passes_through_api_failures() {
        let err = Error::Api(crate::error::ApiFailure::new(vec![crate::api::envelope::ResponseInfo {
            code: 7003,
            message: "Could not route".to_string(),
        }]));
        assert_eq!(format_api_error(&err), "API error: Could not route (code 7003)");
    }
}
