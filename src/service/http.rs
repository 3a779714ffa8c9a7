//! Shared HTTP plumbing for the hosted services.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use tracing::warn;

use super::config::ServiceConfig;
use crate::error::ServiceError;

/// Response header carrying the server correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Snowflake-Request-Id";

/// Media type requested for streamed responses.
pub const EVENT_STREAM: &str = "text/event-stream";

const TOKEN_TYPE_HEADER: &str = "x-snowflake-authorization-token-type";
const ROLE_HEADER: &str = "x-snowflake-role";
const WAREHOUSE_HEADER: &str = "x-snowflake-warehouse";
const PAT_TOKEN_TYPE: &str = "PROGRAMMATIC_ACCESS_TOKEN";

/// Builds the HTTP client with the configured timeouts.
///
/// The connect timeout bounds connection setup; the read timeout bounds
/// each wait for body bytes, so long streams stay open while data flows.
pub fn build_client(config: &ServiceConfig) -> Result<Client, ServiceError> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .build()
        .map_err(|e| ServiceError::Request(format!("failed to build HTTP client: {e}")))
}

/// Headers common to every service request.
pub fn default_headers(config: &ServiceConfig, accept: &str) -> Result<HeaderMap, ServiceError> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", config.token))?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, header_value(accept)?);
    headers.insert(TOKEN_TYPE_HEADER, HeaderValue::from_static(PAT_TOKEN_TYPE));
    headers.insert(ROLE_HEADER, header_value(&config.role)?);
    headers.insert(WAREHOUSE_HEADER, header_value(&config.warehouse)?);
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, ServiceError> {
    HeaderValue::from_str(value)
        .map_err(|e| ServiceError::Request(format!("invalid header value: {e}")))
}

/// Returns the correlation id header, if present.
#[must_use]
pub fn request_id(response: &Response) -> Option<String> {
    response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Passes success responses through; maps status >= 400 to a rejection.
///
/// The rejection carries the status, correlation id, and the body decoded
/// lossily. Nothing from a rejected response is ever streamed.
pub async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }

    let request_id = request_id(&response);
    let body = match response.bytes().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => format!("<failed to read error body: {e}>"),
    };
    warn!(
        status = status.as_u16(),
        request_id = request_id.as_deref().unwrap_or("-"),
        "service rejected request"
    );
    Err(ServiceError::TransportRejected {
        status: status.as_u16(),
        request_id,
        body,
    })
}
