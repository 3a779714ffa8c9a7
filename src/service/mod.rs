//! Clients for the hosted analytics services.
//!
//! All clients share [`ServiceConfig`] and the header and rejection
//! handling in [`http`]. Streamed responses go through [`crate::sse`];
//! SQL runs through [`statements`].

pub mod analyst;
pub mod complete;
pub mod config;
pub mod forecast;
pub mod http;
pub mod search;
pub mod statements;

pub use analyst::{AnalystAnswer, AnalystClient, AnalystContent};
pub use complete::{CompleteClient, CompletionAnswer, DEFAULT_MODEL, drive_completion};
pub use config::ServiceConfig;
pub use forecast::{DEFAULT_PERIODS, ForecastClient, ForecastPoint, RatingForecast, RatingPoint};
pub use search::{GroundedPrompt, NO_PASSAGES, SearchClient, SearchResult, build_prompt, references_table};
pub use statements::{Binding, ResultSet, StatementClient};
