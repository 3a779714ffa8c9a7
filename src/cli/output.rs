//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::agent::{Completion, Exchange, board_embed_url};
use crate::core::{ChatMessage, SessionSummary};
use crate::error::Error;
use crate::service::{
    AnalystAnswer, AnalystContent, CompletionAnswer, RatingForecast, ResultSet, SearchResult,
    references_table,
};
use crate::storage::traits::StorageStats;
use serde::Serialize;
use std::fmt::Write;
use unicode_segmentation::UnicodeSegmentation;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &StorageStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &StorageStats) -> String {
    let mut output = String::new();
    output.push_str("Chess Copilot Status\n");
    output.push_str("====================\n\n");
    let _ = writeln!(output, "  Sessions:      {}", stats.session_count);
    let _ = writeln!(output, "  Messages:      {}", stats.message_count);
    let _ = writeln!(output, "  Schema:        v{}", stats.schema_version);
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:       {}", format_size(size));
    }
    output
}

/// Formats the session list.
#[must_use]
pub fn format_sessions(sessions: &[SessionSummary], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_sessions_text(sessions),
        OutputFormat::Json => format_json(&sessions),
    }
}

fn format_sessions_text(sessions: &[SessionSummary]) -> String {
    if sessions.is_empty() {
        return "No sessions found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str("Sessions:\n");
    let _ = writeln!(output, "{:<24} {:<10} Game", "Session", "Messages");
    output.push_str(&"-".repeat(50));
    output.push('\n');

    for session in sessions {
        let _ = writeln!(
            output,
            "{:<24} {:<10} {}",
            truncate(&session.id, 24),
            session.message_count,
            session.selected_game_id.as_deref().unwrap_or("-")
        );
    }

    output
}

/// Formats the conversation of one session.
#[must_use]
pub fn format_history(session: &str, messages: &[ChatMessage], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if messages.is_empty() {
                return format!("Session '{session}' has no messages.\n");
            }
            let mut output = String::new();
            for message in messages {
                let _ = writeln!(output, "[{}] {}\n", message.role, message.content);
            }
            output
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct History<'a> {
                session: &'a str,
                messages: &'a [ChatMessage],
            }
            format_json(&History { session, messages })
        }
    }
}

/// Board view of the selected game.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView<'a> {
    /// Session the game belongs to.
    pub session: &'a str,
    /// Selected game, if any.
    pub game_id: Option<&'a str>,
    /// Embeddable board URL for the game.
    pub embed_url: Option<String>,
}

impl<'a> BoardView<'a> {
    /// Builds the view for an optional game reference.
    #[must_use]
    pub fn new(session: &'a str, game_id: Option<&'a str>) -> Self {
        Self {
            session,
            game_id,
            embed_url: game_id.map(board_embed_url),
        }
    }
}

/// Formats the board view.
#[must_use]
pub fn format_board(view: &BoardView<'_>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => match (&view.game_id, &view.embed_url) {
            (Some(id), Some(url)) => format!("Game: {id}\nBoard: {url}\n"),
            _ => "No game selected yet. Ask about a specific game first.\n".to_string(),
        },
        OutputFormat::Json => format_json(view),
    }
}

/// Formats what follows a streamed agent answer.
///
/// In text mode the answer itself has already been written; this returns
/// only the trailing board and interruption lines.
#[must_use]
pub fn format_exchange(session: &str, exchange: &Exchange, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::from("\n");
            if let Completion::Interrupted { reason } = &exchange.completion {
                let _ = writeln!(output, "\n[answer interrupted: {reason}]");
            }
            if let Some(id) = &exchange.game_id {
                let _ = writeln!(output, "\nBoard: {}", board_embed_url(id));
            }
            output
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Answer<'a> {
                session: &'a str,
                #[serde(flatten)]
                exchange: &'a Exchange,
                embed_url: Option<String>,
            }
            format_json(&Answer {
                session,
                exchange,
                embed_url: exchange.game_id.as_deref().map(board_embed_url),
            })
        }
    }
}

/// Outcome of running one generated statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementRun {
    /// The statement that was run.
    pub statement: String,
    /// Rows, when the statement succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultSet>,
    /// Failure description, when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An analyst answer with any executed statements.
#[derive(Debug, Clone, Serialize)]
pub struct AnalystReport<'a> {
    /// The analyst answer.
    #[serde(flatten)]
    pub answer: &'a AnalystAnswer,
    /// Executed statements, in answer order.
    pub runs: &'a [StatementRun],
    /// Game picked from the results and stored for `board`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_game: Option<&'a str>,
}

/// Formats an analyst answer.
#[must_use]
pub fn format_analyst(report: &AnalystReport<'_>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for block in &report.answer.message.content {
                match block {
                    AnalystContent::Text { text } => {
                        let _ = writeln!(output, "{text}\n");
                    }
                    AnalystContent::Sql { statement } if !statement.trim().is_empty() => {
                        let _ = writeln!(output, "```sql\n{}\n```\n", statement.trim());
                    }
                    AnalystContent::Suggestions { suggestions } if !suggestions.is_empty() => {
                        output.push_str("Suggestions:\n");
                        for s in suggestions {
                            let _ = writeln!(output, "  - {s}");
                        }
                        output.push('\n');
                    }
                    _ => {}
                }
            }
            for run in report.runs {
                format_run_text(&mut output, run, report.selected_game.is_none());
            }
            if let Some(id) = report.selected_game {
                let _ = writeln!(output, "Selected game: {id}\nBoard: {}", board_embed_url(id));
            }
            for warning in &report.answer.warnings {
                let _ = writeln!(output, "Warning: {warning}");
            }
            if output.is_empty() {
                output.push_str("The analyst returned no content.\n");
            }
            output
        }
        OutputFormat::Json => format_json(report),
    }
}

fn format_run_text(output: &mut String, run: &StatementRun, hint_pick: bool) {
    match (&run.result, &run.error) {
        (_, Some(error)) => {
            let _ = writeln!(output, "Error running query: {error}\n");
        }
        (Some(result), None) if result.is_empty() => {
            output.push_str("The query returned no rows.\n\n");
        }
        (Some(result), None) => {
            output.push_str(&format_rows(result));
            if hint_pick && result.game_column().is_some() {
                output.push_str("Use --pick <row> to select a game for `board`.\n");
            }
            output.push('\n');
        }
        (None, None) => {}
    }
}

/// Renders rows as an aligned table with 1-based row numbers.
#[must_use]
pub fn format_rows(result: &ResultSet) -> String {
    const MAX_WIDTH: usize = 32;

    let cell = |value: Option<&String>| -> String {
        value.map_or_else(|| "NULL".to_string(), |v| truncate(v, MAX_WIDTH))
    };
    let mut widths: Vec<usize> = result
        .columns
        .iter()
        .map(|c| c.graphemes(true).count().min(MAX_WIDTH))
        .collect();
    for row in &result.rows {
        for (i, value) in row.iter().enumerate().take(widths.len()) {
            let len = cell(value.as_ref()).graphemes(true).count();
            widths[i] = widths[i].max(len);
        }
    }
    let row_width = result.rows.len().to_string().len().max(1);

    let mut output = String::new();
    let _ = write!(output, "{:>row_width$}", "#");
    for (name, width) in result.columns.iter().zip(&widths) {
        let _ = write!(output, "  {}", pad(&truncate(name, MAX_WIDTH), *width));
    }
    output.push('\n');
    for (n, row) in result.rows.iter().enumerate() {
        let _ = write!(output, "{:>row_width$}", n + 1);
        for (i, width) in widths.iter().enumerate() {
            let _ = write!(output, "  {}", pad(&cell(row.get(i).and_then(Option::as_ref)), *width));
        }
        output.push('\n');
    }
    output
}

fn pad(text: &str, width: usize) -> String {
    let len = text.graphemes(true).count();
    format!("{text}{}", " ".repeat(width.saturating_sub(len)))
}

/// Formats rating history and forecast.
#[must_use]
pub fn format_forecast(forecast: &RatingForecast, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let (Some(first), Some(last)) = (forecast.history.first(), forecast.history.last())
            else {
                return "No rating history available.\n".to_string();
            };
            let mut output = String::new();
            let _ = writeln!(
                output,
                "Rating history: {} days, {} to {}, last rating {:.0}\n",
                forecast.history.len(),
                first.ts,
                last.ts,
                last.rating
            );
            let _ = writeln!(output, "Forecast for the next {} days:", forecast.periods);
            let _ = writeln!(output, "{:<24} {:>9} {:>9} {:>9}", "Date", "Rating", "Low", "High");
            output.push_str(&"-".repeat(54));
            output.push('\n');
            for point in &forecast.forecast {
                let _ = writeln!(
                    output,
                    "{:<24} {:>9.0} {:>9.0} {:>9.0}",
                    truncate(&point.ts, 24),
                    point.forecast,
                    point.lower_bound,
                    point.upper_bound
                );
            }
            output
        }
        OutputFormat::Json => format_json(forecast),
    }
}

/// A grounded openings answer.
#[derive(Debug, Clone, Serialize)]
pub struct OpeningsReport<'a> {
    /// The question asked.
    pub question: &'a str,
    /// Final answer text.
    pub answer: &'a str,
    /// How the completion ended (absent when no completion ran).
    pub completion: Option<&'a Completion>,
    /// Retrieved passages.
    pub references: &'a [SearchResult],
    /// Context given to the model, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a str>,
}

impl<'a> OpeningsReport<'a> {
    /// Builds a report from a finished completion.
    #[must_use]
    pub fn from_completion(
        question: &'a str,
        completion: &'a CompletionAnswer,
        references: &'a [SearchResult],
    ) -> Self {
        Self {
            question,
            answer: &completion.text,
            completion: Some(&completion.completion),
            references,
            context: None,
        }
    }
}

/// Formats what follows a streamed openings answer.
///
/// In text mode the context (if requested) and the answer have already
/// been written; this returns the references table.
#[must_use]
pub fn format_openings(report: &OpeningsReport<'_>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::from("\n");
            if let Some(Completion::Interrupted { reason }) = report.completion {
                let _ = writeln!(output, "\n[answer interrupted: {reason}]");
            }
            if !report.references.is_empty() {
                output.push('\n');
                output.push_str(&references_table(report.references));
            }
            output
        }
        OutputFormat::Json => format_json(report),
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }
            format_json(&ErrorOutput {
                error: error.to_string(),
            })
        }
    }
}

/// Formats a value as JSON.
pub(crate) fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats a byte size as human-readable.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncates a string to `max_len` graphemes with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let count = s.graphemes(true).count();
    if count <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.graphemes(true).take(max_len).collect()
    } else {
        let mut out: String = s.graphemes(true).take(max_len - 3).collect();
        out.push_str("...");
        out
    }
}
