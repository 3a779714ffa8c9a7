//! Document search over the openings library, and grounded prompts.

use std::fmt::Write;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::config::ServiceConfig;
use super::http::{build_client, default_headers, ensure_success};
use crate::error::ServiceError;

/// Columns requested from the search service.
pub const SEARCH_COLUMNS: &[&str] = &["chunk", "file_url", "relative_path", "language"];

/// Language filter applied to searched documents.
pub const DOCUMENT_LANGUAGE: &str = "English";

/// Answer given when the context does not cover the question.
pub const REFUSAL: &str = "I cannot answer this question with the data I have.";

/// Answer given when the search returns nothing.
pub const NO_PASSAGES: &str = "I found no relevant passages in the documents to answer this question.";

/// One retrieved passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Passage text.
    #[serde(default)]
    pub chunk: String,
    /// Link to the source document.
    #[serde(default)]
    pub file_url: String,
    /// Source document path within the stage.
    #[serde(default)]
    pub relative_path: String,
    /// Document language.
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Client for the document search `:query` endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    config: ServiceConfig,
}

impl SearchClient {
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

    /// Returns the search service query URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.config.url(&format!(
            "api/v2/databases/{}/schemas/{}/cortex-search-services/{}:query",
            self.config.database, self.config.schema, self.config.search_service
        ))
    }

    /// Retrieves up to `limit` passages for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TransportRejected`] for a status >= 400 and
    /// [`ServiceError::InvalidResponse`] for an undecodable body.
    pub async fn query(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ServiceError> {
        let body = json!({
            "query": query,
            "limit": limit,
            "columns": SEARCH_COLUMNS,
            "filter": { "@and": [ { "@eq": { "language": DOCUMENT_LANGUAGE } } ] },
        });
        let url = self.endpoint();
        info!(url = %url, limit, "querying search service");

        let response = self
            .http
            .post(&url)
            .headers(default_headers(&self.config, "application/json")?)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let parsed: SearchResponse = response.json().await?;
        info!(results = parsed.results.len(), "search finished");
        Ok(parsed.results)
    }
}

/// A prompt grounded on retrieved passages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundedPrompt {
    /// Full prompt text for the completion model.
    pub prompt: String,
    /// The context block alone, for inspection.
    pub context: String,
}

/// Builds the completion prompt for `question` from retrieved passages.
///
/// Passages are numbered in retrieval order with their source path. The
/// model is told to use only the context and to reply with [`REFUSAL`]
/// when it is insufficient.
#[must_use]
pub fn build_prompt(question: &str, results: &[SearchResult], language: &str) -> GroundedPrompt {
    let context = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("Document {} ({}):\n{}", i + 1, r.relative_path, r.chunk))
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = format!(
        "[INST]
You are a chess assistant specialised in openings. You are given context
extracted from PDF books and notes.

Use **only** the information in the context to answer the user's question.
If the information is not sufficient, reply only:
\"{REFUSAL}\"

Always answer in {language}, clearly, for a player rated between 1700 and
2300 Elo.

<context>
{context}
</context>

<question>
{question}
</question>
[/INST]
Answer (in {language}):
"
    );

    GroundedPrompt { prompt, context }
}

/// Renders the markdown references table for retrieved passages.
#[must_use]
pub fn references_table(results: &[SearchResult]) -> String {
    let mut table = String::from("###### References\n\n| PDF | URL |\n|-----|-----|\n");
    for r in results {
        let _ = writeln!(table, "| {} | [Link]({}) |", r.relative_path, r.file_url);
    }
    table
}
