use crate::dispatch::{DispatchError, Result};
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Timeout for primary content fetches
pub const CONTENT_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for secondary lookups (awards, cross-ratings, search legs)
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);

// Several sources serve a degraded or blocked page to non-browser agents
const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// HTTP client wrapper shared by providers and search backends.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(DESKTOP_UA)
            .timeout(CONTENT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub const fn inner(&self) -> &Client {
        &self.client
    }

    /// Execute GET request and parse JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await.map_err(net_err)?;
        Self::json_body(response).await
    }

    /// Execute GET request with query parameters and parse JSON response
    pub async fn get_json_with_params<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(net_err)?;

        Self::json_body(response).await
    }

    /// Fetch an HTML/text body, optionally with a session cookie
    pub async fn get_text(&self, url: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await.map_err(net_err)?;

        Self::text_body(response).await
    }

    /// Same as `get_text` but under the secondary-lookup deadline
    pub async fn get_text_secondary(&self, url: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url).timeout(LOOKUP_TIMEOUT);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await.map_err(net_err)?;

        Self::text_body(response).await
    }

    async fn json_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DispatchError::Parse(format!("JSON parse error: {e}")))
    }

    async fn text_body(response: reqwest::Response) -> Result<String> {
        let response = Self::check_status(response).await?;
        response.text().await.map_err(net_err)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DispatchError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }
        Ok(response)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn net_err(e: reqwest::Error) -> DispatchError {
    if e.is_timeout() {
        DispatchError::Timeout
    } else {
        DispatchError::Network(e)
    }
}
