//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::agent::{AgentClient, DisplaySink, converse};
use crate::cli::output::{
    AnalystReport, BoardView, OpeningsReport, OutputFormat, StatementRun, format_analyst,
    format_board, format_exchange, format_forecast, format_history, format_openings,
    format_sessions, format_status,
};
use crate::cli::parser::{Cli, Commands, ServiceArgs};
use crate::core::ChatMessage;
use crate::error::{CommandError, IoError, Result, StorageError};
use crate::service::{
    AnalystClient, CompleteClient, ForecastClient, NO_PASSAGES, SearchClient, StatementClient,
    build_prompt, drive_completion,
};
use crate::storage::{SessionStore, SqliteStore};
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

/// Executes the CLI command.
///
/// Commands that stream an answer write it to stdout as it arrives in
/// text mode; the returned string is what remains to be printed.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub async fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, *force),
        Commands::Status => cmd_status(&db_path, format),
        Commands::Reset { yes } => cmd_reset(&db_path, *yes),
        Commands::Ask { question, session } => {
            cmd_ask(&db_path, &cli.service, session, question, format).await
        }
        Commands::Analyst {
            question,
            run,
            pick,
            session,
        } => {
            let request = AnalystOptions {
                question,
                run: *run,
                pick: *pick,
                session,
            };
            cmd_analyst(&db_path, &cli.service, &request, format).await
        }
        Commands::Forecast { periods } => cmd_forecast(&cli.service, *periods, format).await,
        Commands::Openings {
            question,
            limit,
            model,
            language,
            show_context,
        } => {
            let request = OpeningsRequest {
                question,
                limit: *limit,
                model,
                language,
                show_context: *show_context,
            };
            cmd_openings(&cli.service, &request, format).await
        }
        Commands::Sessions => cmd_sessions(&db_path, format),
        Commands::History { session } => cmd_history(&db_path, session, format),
        Commands::Board { session } => cmd_board(&db_path, session, format),
        Commands::Forget { session, yes } => cmd_forget(&db_path, session, *yes),
    }
}

/// Writes streamed answer snapshots to a terminal.
///
/// Only the new suffix is written when a snapshot extends what is already
/// shown. A snapshot that rewrites the text is written in full on a new
/// line. Repeating a snapshot writes nothing.
pub struct TerminalSink<W: Write> {
    out: W,
    shown: String,
    error: Option<io::Error>,
}

impl<W: Write> TerminalSink<W> {
    /// Creates a sink writing to `out`.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
            error: None,
        }
    }

    /// Returns the text currently shown.
    #[must_use]
    pub fn shown(&self) -> &str {
        &self.shown
    }

    /// Ends the output, reporting the first write failure.
    ///
    /// A closed pipe is not a failure.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFailed`] if a write failed.
    pub fn finish(mut self) -> Result<W> {
        if self.error.is_none() && !self.shown.is_empty() {
            self.write(b"\n");
        }
        match self.error {
            Some(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(IoError::WriteFailed {
                reason: e.to_string(),
            }
            .into()),
            _ => Ok(self.out),
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.out.write_all(bytes).and_then(|()| self.out.flush()) {
            self.error = Some(e);
        }
    }
}

impl<W: Write> DisplaySink for TerminalSink<W> {
    fn publish(&mut self, text: &str) {
        if text == self.shown {
            return;
        }
        if let Some(suffix) = text.strip_prefix(self.shown.as_str()) {
            let suffix = suffix.to_string();
            self.write(suffix.as_bytes());
        } else {
            let rewrite = format!("\n{text}");
            self.write(rewrite.as_bytes());
        }
        self.shown = text.to_string();
    }
}

/// Opens storage and verifies it is initialized.
fn open_storage(db_path: &Path) -> Result<SqliteStore> {
    let store = SqliteStore::open(db_path)?;

    if !store.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    Ok(store)
}

fn require_question(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(CommandError::InvalidArgument("question must not be empty".to_string()).into());
    }
    Ok(question)
}

// ==================== Command Implementations ====================

fn cmd_init(db_path: &Path, force: bool) -> Result<String> {
    if db_path.exists() && !force {
        return Err(CommandError::ExecutionFailed(
            "Database already exists. Use --force to reinitialize.".to_string(),
        )
        .into());
    }

    if force && db_path.exists() {
        std::fs::remove_file(db_path).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to remove existing database: {e}"))
        })?;
        for suffix in ["-wal", "-shm"] {
            let mut side = db_path.as_os_str().to_owned();
            side.push(suffix);
            let side = Path::new(&side);
            if side.exists() {
                std::fs::remove_file(side).map_err(|e| {
                    CommandError::ExecutionFailed(format!("Failed to remove {}: {e}", side.display()))
                })?;
            }
        }
    }

    let mut store = SqliteStore::open(db_path)?;
    store.init()?;

    Ok(format!(
        "Initialized session database at: {}\n",
        db_path.display()
    ))
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let stats = store.stats()?;
    Ok(format_status(&stats, format))
}

fn cmd_reset(db_path: &Path, yes: bool) -> Result<String> {
    if !yes {
        return Err(CommandError::ExecutionFailed(
            "Use --yes to confirm reset. This will delete all sessions.".to_string(),
        )
        .into());
    }

    let mut store = open_storage(db_path)?;
    store.reset()?;

    Ok("All sessions deleted.\n".to_string())
}

async fn cmd_ask(
    db_path: &Path,
    service: &ServiceArgs,
    session: &str,
    question: &str,
    format: OutputFormat,
) -> Result<String> {
    let question = require_question(question)?;
    let mut store = open_storage(db_path)?;
    let config = service.to_config()?;
    let client = AgentClient::new(&config)?;

    let mut history = store.messages(session)?;
    let user_message = ChatMessage::user(question);
    history.push(user_message.clone());
    info!(session, turns = history.len(), "asking agent");

    let exchange = match format {
        OutputFormat::Text => {
            let mut sink = TerminalSink::new(io::stdout());
            let exchange = converse(&client, &history, &mut sink).await?;
            sink.publish(&exchange.text);
            sink.finish()?;
            exchange
        }
        OutputFormat::Json => converse(&client, &history, &mut |_: &str| {}).await?,
    };

    if exchange.text.is_empty() {
        warn!(session, "empty answer, exchange not stored");
    } else {
        store.record_exchange(
            session,
            &user_message,
            &ChatMessage::assistant(exchange.text.as_str()),
            exchange.game_id.as_deref(),
        )?;
    }

    Ok(format_exchange(session, &exchange, format))
}

struct AnalystOptions<'a> {
    question: &'a str,
    run: bool,
    pick: Option<usize>,
    session: &'a str,
}

async fn cmd_analyst(
    db_path: &Path,
    service: &ServiceArgs,
    request: &AnalystOptions<'_>,
    format: OutputFormat,
) -> Result<String> {
    let question = require_question(request.question)?;
    if request.pick == Some(0) {
        return Err(CommandError::InvalidArgument("--pick rows start at 1".to_string()).into());
    }
    let mut store = request.pick.map(|_| open_storage(db_path)).transpose()?;
    let config = service.to_config()?;
    let answer = AnalystClient::new(&config)?.ask(question).await?;

    let mut runs = Vec::new();
    if request.run {
        let statements = StatementClient::new(&config)?;
        for statement in answer.statements() {
            let run = match statements.execute(statement, &[]).await {
                Ok(result) => StatementRun {
                    statement: statement.to_string(),
                    result: Some(result),
                    error: None,
                },
                Err(e) => {
                    warn!(error = %e, "generated statement failed");
                    StatementRun {
                        statement: statement.to_string(),
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            runs.push(run);
        }
    }

    let mut selected_game = None;
    if let (Some(row), Some(store)) = (request.pick, store.as_mut()) {
        let game_id = runs
            .iter()
            .filter_map(|run| run.result.as_ref())
            .find(|result| result.game_column().is_some())
            .and_then(|result| result.game_id(row - 1))
            .ok_or_else(|| {
                CommandError::InvalidArgument(format!("result row {row} holds no game id"))
            })?;
        store.set_selected_game(request.session, game_id)?;
        info!(session = request.session, game_id, "game selected from results");
        selected_game = Some(game_id);
    }

    let report = AnalystReport {
        answer: &answer,
        runs: &runs,
        selected_game,
    };
    Ok(format_analyst(&report, format))
}

async fn cmd_forecast(service: &ServiceArgs, periods: u32, format: OutputFormat) -> Result<String> {
    let config = service.to_config()?;
    let forecast = ForecastClient::new(&config)?.forecast(periods).await?;
    Ok(format_forecast(&forecast, format))
}

struct OpeningsRequest<'a> {
    question: &'a str,
    limit: usize,
    model: &'a str,
    language: &'a str,
    show_context: bool,
}

async fn cmd_openings(
    service: &ServiceArgs,
    request: &OpeningsRequest<'_>,
    format: OutputFormat,
) -> Result<String> {
    let question = require_question(request.question)?;
    if request.limit == 0 {
        return Err(CommandError::InvalidArgument("--limit must be at least 1".to_string()).into());
    }
    let config = service.to_config()?;

    let results = SearchClient::new(&config)?
        .query(question, request.limit)
        .await?;
    if results.is_empty() {
        let report = OpeningsReport {
            question,
            answer: NO_PASSAGES,
            completion: None,
            references: &results,
            context: None,
        };
        return Ok(match format {
            OutputFormat::Text => format!("{NO_PASSAGES}\n"),
            OutputFormat::Json => format_openings(&report, format),
        });
    }

    let grounded = build_prompt(question, &results, request.language);
    let completer = CompleteClient::new(&config)?;
    let events = completer.stream(request.model, &grounded.prompt).await?;

    let answer = match format {
        OutputFormat::Text => {
            let mut stdout = io::stdout();
            if request.show_context {
                writeln!(stdout, "Context:\n{}\n", grounded.context)?;
            }
            let mut sink = TerminalSink::new(stdout);
            let answer = drive_completion(events, &mut sink).await;
            sink.finish()?;
            answer
        }
        OutputFormat::Json => drive_completion(events, &mut |_: &str| {}).await,
    };

    let mut report = OpeningsReport::from_completion(question, &answer, &results);
    if request.show_context {
        report.context = Some(&grounded.context);
    }
    Ok(format_openings(&report, format))
}

fn cmd_sessions(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let sessions = store.list_sessions()?;
    Ok(format_sessions(&sessions, format))
}

fn cmd_history(db_path: &Path, session: &str, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let messages = store.messages(session)?;
    Ok(format_history(session, &messages, format))
}

fn cmd_board(db_path: &Path, session: &str, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let game_id = store.selected_game(session)?;
    Ok(format_board(
        &BoardView::new(session, game_id.as_deref()),
        format,
    ))
}

fn cmd_forget(db_path: &Path, session: &str, yes: bool) -> Result<String> {
    if !yes {
        return Err(
            CommandError::ExecutionFailed("Use --yes to confirm deletion.".to_string()).into(),
        );
    }

    let mut store = open_storage(db_path)?;
    store.delete_session(session)?;

    Ok(format!("Deleted session: {session}\n"))
}
