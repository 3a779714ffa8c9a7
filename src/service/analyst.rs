//! Natural-language analyst: questions in, interpretation and SQL out.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::config::ServiceConfig;
use super::http::{build_client, default_headers, ensure_success, request_id};
use crate::agent::Message;
use crate::core::Role;
use crate::error::ServiceError;

const ANALYST_PATH: &str = "api/v2/cortex/analyst/message";

#[derive(Debug, Serialize)]
struct AnalystRequest<'a> {
    messages: Vec<Message>,
    semantic_model_file: &'a str,
}

/// One content block of an analyst answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalystContent {
    /// Interpretation or explanation text.
    Text {
        /// Markdown text.
        #[serde(default)]
        text: String,
    },
    /// Follow-up question suggestions.
    Suggestions {
        /// Suggested questions.
        #[serde(default)]
        suggestions: Vec<String>,
    },
    /// Generated SQL statement.
    Sql {
        /// The statement.
        #[serde(default)]
        statement: String,
    },
    /// A block type this client does not know.
    #[serde(other)]
    Unknown,
}

/// Message part of an analyst answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystMessage {
    /// Content blocks in display order.
    #[serde(default)]
    pub content: Vec<AnalystContent>,
}

/// Parsed analyst answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystAnswer {
    /// The answer message.
    #[serde(default)]
    pub message: AnalystMessage,
    /// Warnings reported by the service.
    #[serde(default)]
    pub warnings: Vec<serde_json::Value>,
    /// Correlation id from the response header.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl AnalystAnswer {
    /// Returns the generated SQL statements, skipping empty ones.
    #[must_use]
    pub fn statements(&self) -> Vec<&str> {
        self.message
            .content
            .iter()
            .filter_map(|c| match c {
                AnalystContent::Sql { statement } if !statement.trim().is_empty() => {
                    Some(statement.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

/// Client for the analyst message endpoint.
#[derive(Debug, Clone)]
pub struct AnalystClient {
    http: Client,
    config: ServiceConfig,
}

impl AnalystClient {
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

    /// Asks one question.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Request`] for an empty question or a failed
    /// request, [`ServiceError::TransportRejected`] for a status >= 400, and
    /// [`ServiceError::InvalidResponse`] for an undecodable body.
    pub async fn ask(&self, question: &str) -> Result<AnalystAnswer, ServiceError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ServiceError::Request("question is empty".to_string()));
        }

        let body = AnalystRequest {
            messages: vec![Message::text(Role::User, question)],
            semantic_model_file: &self.config.semantic_model,
        };
        let url = self.config.url(ANALYST_PATH);
        info!(url = %url, "asking analyst");

        let response = self
            .http
            .post(&url)
            .headers(default_headers(&self.config, "application/json")?)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let id = request_id(&response);

        let mut answer: AnalystAnswer = response.json().await?;
        answer.request_id = id;
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_blocks() {
        let json = r#"{
            "message": {"role": "analyst", "content": [
                {"type": "text", "text": "This is our interpretation"},
                {"type": "sql", "statement": "SELECT 1", "confidence": {}},
                {"type": "sql", "statement": "  "},
                {"type": "suggestions", "suggestions": ["a?", "b?"]},
                {"type": "chart", "spec": {}}
            ]},
            "warnings": []
        }"#;
        let answer: AnalystAnswer = serde_json::from_str(json).unwrap();
        assert_eq!(answer.message.content.len(), 5);
        assert_eq!(answer.statements(), vec!["SELECT 1"]);
        assert_eq!(
            answer.message.content[3],
            AnalystContent::Suggestions {
                suggestions: vec!["a?".to_string(), "b?".to_string()]
            }
        );
        assert_eq!(answer.message.content[4], AnalystContent::Unknown);
    }

    #[test]
    fn test_request_body_shape() {
        let body = AnalystRequest {
            messages: vec![Message::text(Role::User, "q")],
            semantic_model_file: "@stage/model.yaml",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["semantic_model_file"], "@stage/model.yaml");
        assert_eq!(json["messages"][0]["content"][0]["text"], "q");
    }
}
