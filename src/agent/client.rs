//! Streaming client for the conversational agent.

use futures_util::stream::Stream;
use reqwest::Client;
use tracing::info;

use super::display::{DisplaySink, Exchange, drive_display_stream};
use super::request::AgentRequest;
use crate::core::ChatMessage;
use crate::error::ServiceError;
use crate::service::ServiceConfig;
use crate::service::http::{EVENT_STREAM, build_client, default_headers, ensure_success, request_id};
use crate::sse::{ProtocolEvent, event_stream};

/// Client for the agent `:run` endpoint.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: Client,
    config: ServiceConfig,
}

impl AgentClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client(config)?,
            config: config.clone(),
        })
    }

    /// Returns the agent run URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.config.url(&format!(
            "api/v2/databases/{}/schemas/{}/agents/{}:run",
            self.config.database, self.config.schema, self.config.agent
        ))
    }

    /// Starts a run and returns its event stream.
    ///
    /// Dropping the stream releases the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TransportRejected`] for a status >= 400, or
    /// [`ServiceError::Request`] if no response was received. In both cases
    /// no events are produced.
    pub async fn run(
        &self,
        history: &[ChatMessage],
    ) -> Result<impl Stream<Item = Result<ProtocolEvent, ServiceError>> + use<>, ServiceError> {
        let body = AgentRequest::from_history(history);
        let url = self.endpoint();
        info!(url = %url, messages = body.messages.len(), "starting agent run");

        let response = self
            .http
            .post(&url)
            .headers(default_headers(&self.config, EVENT_STREAM)?)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        info!(
            status = response.status().as_u16(),
            request_id = request_id(&response).as_deref().unwrap_or("-"),
            "agent stream opened"
        );
        Ok(event_stream(response.bytes_stream()))
    }
}

/// Runs one exchange: sends the history, streams the answer into `sink`.
///
/// # Errors
///
/// Returns an error only when the request is rejected or never answered.
/// A mid-stream failure is reported through [`Exchange::completion`].
pub async fn converse<S: DisplaySink + ?Sized>(
    client: &AgentClient,
    history: &[ChatMessage],
    sink: &mut S,
) -> Result<Exchange, ServiceError> {
    let events = client.run(history).await?;
    let exchange = drive_display_stream(events, sink).await;
    info!(
        chars = exchange.text.len(),
        finalized = exchange.finalized,
        game_id = exchange.game_id.as_deref().unwrap_or("-"),
        "agent exchange finished"
    );
    Ok(exchange)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = ServiceConfig::new("acct.snowflakecomputing.com", "t").unwrap();
        let client = AgentClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://acct.snowflakecomputing.com/api/v2/databases/CHESS_DB/schemas/ANALYTICS/agents/CHESS_COPILOT:run"
        );
    }
}
