//! HTTP layer: status mapping and retry. Nothing else in the crate looks at
//! status codes.

use std::time::Duration;

use rand::Rng;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) max_retries: u32,
}

impl HttpBackend {
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        let response = self.request(Method::GET, url, None::<&()>).await?;
        decode(response, url).await
    }

    pub(crate) async fn post_json<B, T>(&self, url: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(Method::POST, url, Some(body)).await?;
        decode(response, url).await
    }

    pub(crate) async fn get_text(&self, url: &str) -> ClientResult<String> {
        let response = self.request(Method::GET, url, None::<&()>).await?;
        response.text().await.map_err(|e| ClientError::Network {
            message: format!("failed to read response body: {}", e),
        })
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> ClientResult<reqwest::Response> {
        let mut retries = 0;

        loop {
            match self.request_once(method.clone(), url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    let backoff = backoff_for(&e, retries);
                    warn!(
                        error = %e,
                        url = %url,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> ClientResult<reqwest::Response> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "response received");

        match status.as_u16() {
            200..=299 => Ok(response),

            401 | 403 => Err(ClientError::Unauthorized {
                message: format!("HTTP {} from {}", status.as_u16(), url),
            }),

            404 => Err(ClientError::NotFound {
                url: url.to_string(),
            }),

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(ClientError::RateLimited { retry_after })
            }

            _ => {
                let message = response
                    .text()
                    .await
                    .ok()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| status_reason(status));
                Err(ClientError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> ClientResult<T> {
    let bytes = response.bytes().await.map_err(|e| ClientError::Network {
        message: format!("failed to read response body: {}", e),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse {
        message: format!("{url}: {e}"),
    })
}

fn status_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string()
}

/// Server-provided `Retry-After` (capped, ±10% jitter) or full-jitter
/// exponential backoff.
fn backoff_for(err: &ClientError, retries: u32) -> Duration {
    let mut rng = rand::thread_rng();
    match err {
        ClientError::RateLimited {
            retry_after: Some(retry_after),
        } => {
            let base_ms = (*retry_after).min(MAX_BACKOFF).as_millis() as f64;
            let jittered = (base_ms * rng.gen_range(0.9_f64..=1.1_f64)).round() as u64;
            Duration::from_millis(jittered.max(100))
        }
        _ => {
            let base = Duration::from_secs(1 << retries.min(5)).min(MAX_BACKOFF);
            let jittered = rng.gen_range(0..=base.as_millis() as u64);
            Duration::from_millis(jittered.max(10))
        }
    }
}
