//! Game reference extraction from finalized answers.

use std::sync::OnceLock;

use regex::Regex;

/// Base URL of the embeddable board viewer.
pub const BOARD_EMBED_BASE: &str = "https://lichess.org/embed";

fn game_id_regex() -> &'static Regex {
    static GAME_ID: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    GAME_ID.get_or_init(|| Regex::new(r"GAME_ID\s*[:=]\s*([A-Za-z0-9]+)").expect("valid regex"))
}

/// Extracts the first `GAME_ID: <id>` or `GAME_ID=<id>` reference.
///
/// The key is case-sensitive; the id is the maximal run of ASCII letters
/// and digits after the separator. Absence is the normal case.
///
/// # Examples
///
/// ```
/// use chess_copilot::agent::extract_game_id;
///
/// assert_eq!(extract_game_id("see GAME_ID: abc123 here").as_deref(), Some("abc123"));
/// assert_eq!(extract_game_id("no reference"), None);
/// ```
#[must_use]
pub fn extract_game_id(text: &str) -> Option<String> {
    game_id_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Builds the board embed URL for a game id.
#[must_use]
pub fn board_embed_url(game_id: &str) -> String {
    format!("{BOARD_EMBED_BASE}/{game_id}?theme=auto&bg=auto")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("...GAME_ID: abc123 more text", Some("abc123"); "colon form")]
    #[test_case("GAME_ID=xyz", Some("xyz"); "equals form")]
    #[test_case("GAME_ID = Q7rT9 and GAME_ID: other", Some("Q7rT9"); "first match wins")]
    #[test_case("GAME_ID:AbC9-tail", Some("AbC9"); "stops at non alphanumeric")]
    #[test_case("game_id: abc123", None; "key is case sensitive")]
    #[test_case("GAME_ID - abc", None; "needs separator")]
    #[test_case("GAME_ID: ", None; "needs identifier")]
    #[test_case("", None; "empty text")]
    fn test_extract_game_id(text: &str, expected: Option<&str>) {
        assert_eq!(extract_game_id(text).as_deref(), expected);
    }

    #[test]
    fn test_extract_across_lines() {
        let text = "Your worst loss was this one.\nGAME_ID:\n  k2Lp0x9Q\nEnjoy.";
        assert_eq!(extract_game_id(text).as_deref(), Some("k2Lp0x9Q"));
    }

    #[test]
    fn test_board_embed_url() {
        assert_eq!(
            board_embed_url("abc123"),
            "https://lichess.org/embed/abc123?theme=auto&bg=auto"
        );
    }
}
