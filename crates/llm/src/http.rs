//! Shared request plumbing for the HTTP backends.

use duet_common::{DuetError, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Send a prepared request and decode a JSON reply.
///
/// Connection failures and undecodable replies are transient. Error statuses
/// are classified by [`DuetError::from_status`].
pub(crate) async fn send_json<R: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> Result<R> {
    let response = request
        .send()
        .await
        .map_err(|e| DuetError::TransientFault(format!("{provider} request failed: {e}")))?;

    let status = response.status();
    debug!(provider, status = status.as_u16(), "Backend responded");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DuetError::from_status(status.as_u16(), &body, provider));
    }

    response
        .json()
        .await
        .map_err(|e| DuetError::TransientFault(format!("Unreadable {provider} response: {e}")))
}
