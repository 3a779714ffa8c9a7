//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::service::ServiceConfig;
use crate::service::config::{
    DEFAULT_AGENT, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DATABASE, DEFAULT_READ_TIMEOUT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_ROLE, DEFAULT_SCHEMA, DEFAULT_SEARCH_SERVICE,
    DEFAULT_SEMANTIC_MODEL, DEFAULT_WAREHOUSE,
};
use crate::service::forecast::{DEFAULT_PERIODS, MAX_PERIODS, MIN_PERIODS};

/// Session used when `--session` is not given.
pub const DEFAULT_SESSION: &str = "default";

/// Chess copilot: ask questions about your game history.
///
/// Streams answers from a hosted agent, keeps the conversation per
/// session, and remembers the last game the agent referenced.
#[derive(Parser, Debug)]
#[command(name = "chess-copilot")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the session database file.
    ///
    /// Defaults to `.chess-copilot/sessions.db` in the current directory.
    #[arg(short, long, env = "CHESS_COPILOT_DB", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Service connection settings.
    #[command(flatten)]
    pub service: ServiceArgs,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Connection settings for the hosted services.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Account host, e.g. `xy12345.snowflakecomputing.com`.
    #[arg(long, env = "SNOWFLAKE_HOST", global = true, hide_env_values = true)]
    pub host: Option<String>,

    /// Programmatic access token.
    #[arg(long, env = "SNOWFLAKE_PAT", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Role sent with every request.
    #[arg(long, env = "SNOWFLAKE_ROLE", default_value = DEFAULT_ROLE, global = true)]
    pub role: String,

    /// Warehouse sent with every request.
    #[arg(long, env = "SNOWFLAKE_WAREHOUSE", default_value = DEFAULT_WAREHOUSE, global = true)]
    pub warehouse: String,

    /// Database holding the agent and search service.
    #[arg(long, env = "SNOWFLAKE_DATABASE", default_value = DEFAULT_DATABASE, global = true)]
    pub database: String,

    /// Schema holding the agent and search service.
    #[arg(long, env = "SNOWFLAKE_SCHEMA", default_value = DEFAULT_SCHEMA, global = true)]
    pub schema: String,

    /// Agent object name.
    #[arg(long, default_value = DEFAULT_AGENT, global = true)]
    pub agent: String,

    /// Staged semantic model used by the analyst.
    #[arg(long, default_value = DEFAULT_SEMANTIC_MODEL, global = true)]
    pub semantic_model: String,

    /// Document search service name.
    #[arg(long, default_value = DEFAULT_SEARCH_SERVICE, global = true)]
    pub search_service: String,

    /// Connect timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, global = true)]
    pub connect_timeout: u64,

    /// Timeout in seconds between reads of a streamed answer.
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_SECS, global = true)]
    pub read_timeout: u64,

    /// Total timeout in seconds for non-streamed requests.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, global = true)]
    pub request_timeout: u64,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            role: DEFAULT_ROLE.to_string(),
            warehouse: DEFAULT_WAREHOUSE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            agent: DEFAULT_AGENT.to_string(),
            semantic_model: DEFAULT_SEMANTIC_MODEL.to_string(),
            search_service: DEFAULT_SEARCH_SERVICE.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout: DEFAULT_READ_TIMEOUT_SECS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ServiceArgs {
    /// Validates the arguments into a [`ServiceConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the host or token is missing.
    pub fn to_config(&self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig::new(
            self.host.as_deref().unwrap_or_default(),
            self.token.as_deref().unwrap_or_default(),
        )?;
        config.role.clone_from(&self.role);
        config.warehouse.clone_from(&self.warehouse);
        config.database.clone_from(&self.database);
        config.schema.clone_from(&self.schema);
        config.agent.clone_from(&self.agent);
        config.semantic_model.clone_from(&self.semantic_model);
        config.search_service.clone_from(&self.search_service);
        config.connect_timeout = Duration::from_secs(self.connect_timeout);
        config.read_timeout = Duration::from_secs(self.read_timeout);
        config.request_timeout = Duration::from_secs(self.request_timeout);
        Ok(config)
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the session database.
    Init {
        /// Force re-initialization (destroys existing sessions).
        #[arg(short, long)]
        force: bool,
    },

    /// Show session database status.
    Status,

    /// Delete all sessions.
    Reset {
        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Ask the agent a question about your games.
    Ask {
        /// The question.
        question: String,

        /// Conversation session.
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Ask the analyst to translate a question into SQL.
    Analyst {
        /// The question.
        question: String,

        /// Execute the generated SQL and show its rows.
        #[arg(short, long)]
        run: bool,

        /// Select the game in this result row (1-based) for `board`.
        #[arg(short, long, requires = "run")]
        pick: Option<usize>,

        /// Session that receives the picked game.
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Forecast your rating for the coming days.
    Forecast {
        /// Days to forecast.
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_PERIODS,
            value_parser = clap::value_parser!(u32).range(i64::from(MIN_PERIODS)..=i64::from(MAX_PERIODS))
        )]
        periods: u32,
    },

    /// Ask a question answered from the openings library.
    Openings {
        /// The question.
        question: String,

        /// Number of passages to retrieve.
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Completion model.
        #[arg(short, long, default_value = crate::service::DEFAULT_MODEL)]
        model: String,

        /// Answer language.
        #[arg(long, default_value = "English")]
        language: String,

        /// Print the retrieved context before the answer.
        #[arg(long)]
        show_context: bool,
    },

    /// List stored sessions.
    #[command(alias = "ls")]
    Sessions,

    /// Show the conversation of a session.
    History {
        /// Conversation session.
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Show the board for the selected game of a session.
    Board {
        /// Conversation session.
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Delete a session.
    #[command(alias = "rm")]
    Forget {
        /// Session to delete.
        session: String,

        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}
