//! REST plumbing shared by the provider clients.

use std::time::Duration;

use coinrates_common::{FetchError, FetchResult};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends requests to upstream services and turns non-success responses
/// into [`FetchError::Status`] carrying the response body.
#[derive(Debug, Clone)]
pub struct RestApiCaller {
    client: Client,
}

impl RestApiCaller {
    /// Create a caller with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Create a caller with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Start a GET request.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send a request and decode the JSON body.
    pub async fn call_api<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        service: &str,
    ) -> FetchResult<T> {
        let body = self.call_api_as_string(request, service).await?;

        serde_json::from_str(&body).map_err(|e| FetchError::Parse {
            service: service.to_string(),
            message: e.to_string(),
        })
    }

    /// Send a request and return the raw body.
    pub async fn call_api_as_string(
        &self,
        request: RequestBuilder,
        service: &str,
    ) -> FetchResult<String> {
        let response = request.send().await.map_err(|e| transport(service, e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport(service, e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                service: service.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(service, status = status.as_u16(), bytes = body.len(), "Upstream call succeeded");
        Ok(body)
    }
}

impl Default for RestApiCaller {
    fn default() -> Self {
        Self::new()
    }
}

fn transport(service: &str, error: reqwest::Error) -> FetchError {
    FetchError::Transport {
        service: service.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Ping {
        ok: bool,
    }

    #[tokio::test]
    async fn test_call_api_decodes_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let caller = RestApiCaller::new();
        let url = format!("{}/ping", server.url());
        let ping: Ping = caller.call_api(caller.get(&url), "test").await.unwrap();

        assert!(ping.ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ping")
            .with_status(400)
            .with_body("bad symbol")
            .create_async()
            .await;

        let caller = RestApiCaller::new();
        let url = format!("{}/ping", server.url());
        let result = caller.call_api_as_string(caller.get(&url), "test").await;

        assert_eq!(
            result,
            Err(FetchError::Status {
                service: "test".to_string(),
                status: 400,
                body: "bad symbol".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let caller = RestApiCaller::new();
        let url = format!("{}/ping", server.url());
        let result: FetchResult<Ping> = caller.call_api(caller.get(&url), "test").await;

        assert!(matches!(result, Err(FetchError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let caller = RestApiCaller::with_timeout(Duration::from_millis(200));
        let result = caller
            .call_api_as_string(caller.get("http://127.0.0.1:1/unreachable"), "test")
            .await;

        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
