//! Transport seam between the claim store and the device HTTP API.
//!
//! The store only ever sees decoded JSON; how it got here is up to the
//! `HttpApi` implementation. `ReqwestApi` talks to a real device.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request function against the device API.
///
/// `body` is already serialized JSON. Implementations return the decoded
/// response, or a plain JSON string when the body is not JSON.
#[async_trait]
pub trait HttpApi: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<Value>;
}

#[async_trait]
impl<T: HttpApi + ?Sized> HttpApi for std::sync::Arc<T> {
    async fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<Value> {
        (**self).request(method, path, body).await
    }
}

/// Device connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the charging controller, e.g. `http://openevse.local`
    pub base_url: String,
    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,
    /// HTTP basic auth, when the device has a password set
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://openevse.local".to_string(),
            timeout_secs: 10,
            username: None,
            password: None,
        }
    }
}

pub struct ReqwestApi {
    config: ApiConfig,
    client: Client,
}

impl ReqwestApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl HttpApi for ReqwestApi {
    async fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<Value> {
        let url = self.url(path);
        debug!(%method, %url, "device request");

        let mut req = self.client.request(method.to_reqwest(), &url);
        if let Some(ref user) = self.config.username {
            req = req.basic_auth(user, self.config.password.as_ref());
        }
        if let Some(body) = body {
            req = req.header(header::CONTENT_TYPE, "application/json").body(body);
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        // Some firmware builds answer mutations with bare text.
        match serde_json::from_str::<Value>(&text) {
            Ok(v) => Ok(v),
            Err(_) => Ok(Value::String(text)),
        }
    }
}
