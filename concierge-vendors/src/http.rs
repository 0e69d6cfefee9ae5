use std::time::Duration;

use concierge_core::providers::{ProviderError, ProviderResult};
use serde::de::DeserializeOwned;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub(crate) fn transport(provider: &'static str, err: reqwest::Error) -> ProviderError {
    ProviderError::Transport { provider, message: err.to_string() }
}

/// Passes 2xx responses through, turns anything else into `ProviderError::Status`.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(provider, status = status.as_u16(), "Vendor request failed");
    Err(ProviderError::Status { provider, status: status.as_u16(), body })
}

pub(crate) async fn json<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> ProviderResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Decode { provider, message: e.to_string() })
}
