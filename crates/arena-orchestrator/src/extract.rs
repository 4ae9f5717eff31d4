//! Move extractor: pulls a validated move token (or a resignation) out of
//! free-text model output.
//!
//! Models are uncontrolled text generators; the extractor applies a fixed
//! precision-over-recall ladder — explicit markers are trusted before any
//! loose scanning, and the word scan tries longer tokens first so `e4`
//! never matches inside `Ne4`. Pure function: identical input always yields
//! the identical result.

use std::collections::HashSet;

/// What the extractor found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A token from the legal-move list.
    Move(String),
    /// The provider explicitly resigned.
    Resign,
}

/// Extract a move from raw provider output against the current legal moves.
///
/// Resolution order (first match wins):
/// 1. a `MOVE: RESIGN` line (case-insensitive) anywhere,
/// 2. a standalone `RESIGN` line,
/// 3. a `MOVE: <token>` line whose token is legal,
/// 4. the last non-empty line, if legal,
/// 5. a `**bold**` or `` `code` `` span that is legal,
/// 6. a word-bounded scan against legal moves, longest first.
pub fn extract_move(text: &str, legal_moves: &[String]) -> Option<Extraction> {
    if text.is_empty() || legal_moves.is_empty() {
        return None;
    }

    let legal: HashSet<&str> = legal_moves.iter().map(String::as_str).collect();
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    // 1. MOVE: RESIGN marker.
    for line in &lines {
        if let Some(rest) = strip_marker(line) {
            if rest.eq_ignore_ascii_case("RESIGN") {
                return Some(Extraction::Resign);
            }
        }
    }

    // 2. Standalone RESIGN line.
    if lines.iter().any(|line| *line == "RESIGN") {
        return Some(Extraction::Resign);
    }

    // 3. MOVE: marker with a legal token.
    for line in &lines {
        if let Some(rest) = strip_marker(line) {
            if legal.contains(rest) {
                return Some(Extraction::Move(rest.to_string()));
            }
        }
    }

    // 4. Last non-empty line.
    if let Some(last) = lines.iter().rev().find(|line| !line.is_empty()) {
        if legal.contains(*last) {
            return Some(Extraction::Move((*last).to_string()));
        }
    }

    // 5. Bold or code-span delimited token.
    for delimiter in ["**", "`"] {
        if let Some(token) = delimited_legal_token(text, delimiter, &legal) {
            return Some(Extraction::Move(token));
        }
    }

    // 6. Word-bounded scan, longest token first.
    let mut by_length: Vec<&str> = legal_moves.iter().map(String::as_str).collect();
    by_length.sort_by_key(|m| std::cmp::Reverse(m.len()));
    for token in by_length {
        if contains_bounded(text, token) {
            return Some(Extraction::Move(token.to_string()));
        }
    }

    None
}

/// Strip a leading `MOVE:` marker (case-insensitive) and trim the rest.
fn strip_marker(line: &str) -> Option<&str> {
    let line = line.trim_start();
    match line.get(..5) {
        Some(head) if head.eq_ignore_ascii_case("MOVE:") => Some(line[5..].trim()),
        _ => None,
    }
}

/// First `<delim>token<delim>` span whose content is a legal move.
fn delimited_legal_token(text: &str, delimiter: &str, legal: &HashSet<&str>) -> Option<String> {
    let mut parts = text.split(delimiter);
    parts.next()?; // text before the first delimiter
    while let Some(inner) = parts.next() {
        let candidate = inner.trim();
        if legal.contains(candidate) {
            return Some(candidate.to_string());
        }
        // Skip the stretch between this closing delimiter and the next
        // opening one.
        parts.next()?;
    }
    None
}

/// Does `token` occur in `text` as a bounded word? Boundaries mirror the
/// marker-free scan: preceded by start/whitespace/`(`, followed by
/// end/whitespace/closing punctuation.
fn contains_bounded(text: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(found) = text[start..].find(token) {
        let at = start + found;
        let before_ok = text[..at]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || c == '(');
        let after_ok = text[at + token.len()..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || matches!(c, ')' | '.' | ',' | ';' | '!' | '?'));
        if before_ok && after_ok {
            return true;
        }
        // SAN tokens start with an ASCII byte, so `at + 1` stays on a char
        // boundary.
        start = at + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn explicit_marker_wins() {
        let moves = legal(&["e4", "d4", "Nf3"]);
        let text = "I considered d4 at length.\nMOVE: e4\nBut d4 was tempting.";
        assert_eq!(
            extract_move(text, &moves),
            Some(Extraction::Move("e4".to_string()))
        );
    }

    #[test]
    fn marker_with_illegal_token_falls_through_to_later_marker() {
        let moves = legal(&["e4", "d4"]);
        let text = "MOVE: Ke9\nOn reflection:\nMOVE: d4";
        assert_eq!(
            extract_move(text, &moves),
            Some(Extraction::Move("d4".to_string()))
        );
    }

    #[test]
    fn marker_resign_beats_everything() {
        let moves = legal(&["e4"]);
        let text = "MOVE: e4\nmove: resign";
        assert_eq!(extract_move(text, &moves), Some(Extraction::Resign));
    }

    #[test]
    fn standalone_resign_line() {
        let moves = legal(&["e4"]);
        let text = "This position is lost.\nRESIGN\n";
        assert_eq!(extract_move(text, &moves), Some(Extraction::Resign));
    }

    #[test]
    fn resign_mentioned_mid_sentence_is_not_a_resignation() {
        let moves = legal(&["e4"]);
        let text = "I will not resign yet.\nMOVE: e4";
        assert_eq!(
            extract_move(text, &moves),
            Some(Extraction::Move("e4".to_string()))
        );
    }

    #[test]
    fn last_non_empty_line() {
        let moves = legal(&["Nf3", "e4"]);
        let text = "Thinking about development...\n\nNf3\n\n";
        assert_eq!(
            extract_move(text, &moves),
            Some(Extraction::Move("Nf3".to_string()))
        );
    }

    #[test]
    fn bold_and_backtick_spans() {
        let moves = legal(&["Qxd5", "e4"]);
        assert_eq!(
            extract_move("I will play **Qxd5** here.", &moves),
            Some(Extraction::Move("Qxd5".to_string()))
        );
        assert_eq!(
            extract_move("I will play `Qxd5` here.", &moves),
            Some(Extraction::Move("Qxd5".to_string()))
        );
    }

    #[test]
    fn word_scan_prefers_longest_token() {
        // "e4" is a substring of "Ne4"; the scan must not match it inside.
        let moves = legal(&["e4", "Ne4"]);
        assert_eq!(
            extract_move("The knight hop Ne4 looks strong.", &moves),
            Some(Extraction::Move("Ne4".to_string()))
        );
    }

    #[test]
    fn word_scan_requires_boundaries() {
        let moves = legal(&["e4"]);
        assert_eq!(extract_move("Never mind the theory.", &moves), None);
        assert_eq!(
            extract_move("Best here is e4, clearly.", &moves),
            Some(Extraction::Move("e4".to_string()))
        );
        assert_eq!(
            extract_move("(e4) is the move", &moves),
            Some(Extraction::Move("e4".to_string()))
        );
    }

    #[test]
    fn no_match_yields_none() {
        let moves = legal(&["e4", "d4"]);
        assert_eq!(extract_move("I have no idea what to do.", &moves), None);
        assert_eq!(extract_move("", &moves), None);
        assert_eq!(extract_move("MOVE: e4", &[]), None);
    }

    #[test]
    fn extraction_is_idempotent() {
        let moves = legal(&["e4", "Ne4", "d4"]);
        let text = "Maybe **d4**?\nMOVE: Ne4";
        let first = extract_move(text, &moves);
        for _ in 0..10 {
            assert_eq!(extract_move(text, &moves), first);
        }
    }
}
