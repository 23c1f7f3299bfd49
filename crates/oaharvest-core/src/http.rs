//! Blocking JSON GET over a shared async client.
//!
//! Uses async reqwest internally on a shared tokio runtime, but presents a
//! sync interface so rayon workers can call it directly.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::FetchError;

/// Per-request timeout (connect + headers + body)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(8)
        .user_agent(concat!("oaharvest/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// HTTP GET `url` with `query` pairs and decode the body as JSON.
///
/// Anything but `200 OK` is an [`FetchError::Http`] carrying the status.
/// The whole exchange, body included, is bounded by `timeout`.
pub fn get_json(
    url: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> Result<serde_json::Value, FetchError> {
    SHARED_RUNTIME.handle().block_on(async {
        let response = http_client()
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Http {
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("unexpected status").to_string(),
            });
        }

        let body = response.bytes().await.map_err(FetchError::from_reqwest)?;
        Ok(serde_json::from_slice(&body)?)
    })
}
