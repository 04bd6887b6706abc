//! Command extraction from chat output.
//!
//! Commands travel inside HTML comments:
//!
//! ```text
//! <!-- MONICA_ACTION: {"action": "TAKE_SCREENSHOT", "params": {}} -->
//! <!-- MONICA_UPDATE: {"summary": "...", "context_update": {...}} -->
//! <!-- MONICA_CONTEXT_DATA: {...} -->
//! <!-- MONICA_CHANGELOG_START --> free text <!-- MONICA_CHANGELOG_END -->
//! ```
//!
//! The end of a JSON payload is found by tracking brace depth outside of JSON
//! strings, so a `-->` or `}` inside a string value never ends the payload
//! early.

use serde_json::{Map, Value};
use tracing::warn;

use monica_protocols::{ActionCommand, Command, UpdateCommand};

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

const ACTION_MARKER: &str = "MONICA_ACTION";
const UPDATE_MARKER: &str = "MONICA_UPDATE";
const CONTEXT_DATA_MARKER: &str = "MONICA_CONTEXT_DATA";
const CHANGELOG_START_MARKER: &str = "MONICA_CHANGELOG_START";
const CHANGELOG_END_MARKER: &str = "MONICA_CHANGELOG_END";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Action,
    Update,
    ContextData,
    ChangelogStart,
}

impl MarkerKind {
    const ALL: [(MarkerKind, &'static str); 4] = [
        (MarkerKind::Action, ACTION_MARKER),
        (MarkerKind::Update, UPDATE_MARKER),
        (MarkerKind::ContextData, CONTEXT_DATA_MARKER),
        (MarkerKind::ChangelogStart, CHANGELOG_START_MARKER),
    ];
}

/// Scan `text` for embedded commands.
///
/// Commands are produced lazily, in document order. Markers whose payload is
/// malformed are logged and skipped; scanning continues after them.
pub fn extract_commands(text: &str) -> Commands<'_> {
    Commands {
        text,
        pos: 0,
        skipped: 0,
    }
}

/// Lazy iterator over the commands embedded in a text.
#[derive(Debug, Clone)]
pub struct Commands<'a> {
    text: &'a str,
    pos: usize,
    skipped: usize,
}

impl Commands<'_> {
    /// Number of malformed markers skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn skip(&mut self, opener: usize, kind: MarkerKind, reason: &str) {
        warn!(
            "Skipping malformed {:?} marker at byte {}: {}",
            kind, opener, reason
        );
        self.skipped += 1;
    }
}

impl Iterator for Commands<'_> {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        while let Some(offset) = self.text[self.pos..].find(COMMENT_OPEN) {
            let opener = self.pos + offset;
            let after_open = opener + COMMENT_OPEN.len();
            // Resume just past this opener unless a full marker is consumed.
            self.pos = after_open;

            let keyword_start = skip_whitespace(self.text, after_open);
            let Some((kind, keyword_end)) = match_marker(self.text, keyword_start) else {
                continue;
            };

            let parsed = match kind {
                MarkerKind::ChangelogStart => parse_changelog(self.text, keyword_end),
                _ => parse_json_marker(self.text, kind, keyword_end),
            };

            match parsed {
                Ok((command, end)) => {
                    self.pos = end;
                    return Some(command);
                }
                Err(reason) => self.skip(opener, kind, &reason),
            }
        }

        self.pos = self.text.len();
        None
    }
}

/// Match a marker keyword at `start`, returning its kind and end offset.
fn match_marker(text: &str, start: usize) -> Option<(MarkerKind, usize)> {
    let rest = &text[start..];
    MarkerKind::ALL.into_iter().find_map(|(kind, keyword)| {
        if !rest.starts_with(keyword) {
            return None;
        }
        // Reject longer identifiers such as `MONICA_ACTIONS`.
        let next = rest[keyword.len()..].bytes().next();
        match next {
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' => None,
            _ => Some((kind, start + keyword.len())),
        }
    })
}

fn parse_json_marker(text: &str, kind: MarkerKind, keyword_end: usize) -> Result<(Command, usize), String> {
    let colon = skip_whitespace(text, keyword_end);
    if !text[colon..].starts_with(':') {
        return Err("expected ':' after marker name".to_string());
    }

    let brace = skip_whitespace(text, colon + 1);
    if !text[brace..].starts_with('{') {
        return Err("expected a JSON object".to_string());
    }

    let payload_end =
        find_object_end(text, brace).ok_or_else(|| "unbalanced braces in payload".to_string())?;

    let close = skip_whitespace(text, payload_end);
    if !text[close..].starts_with(COMMENT_CLOSE) {
        return Err("payload not followed by '-->'".to_string());
    }

    let payload = &text[brace..payload_end];
    let command = match kind {
        MarkerKind::Action => serde_json::from_str::<ActionCommand>(payload).map(Command::Action),
        MarkerKind::Update => serde_json::from_str::<UpdateCommand>(payload).map(Command::Update),
        MarkerKind::ContextData => {
            serde_json::from_str::<Map<String, Value>>(payload).map(|context_update| {
                Command::Update(UpdateCommand {
                    summary: None,
                    context_update,
                })
            })
        }
        MarkerKind::ChangelogStart => return Err("changelog markers carry no JSON".to_string()),
    }
    .map_err(|e| format!("invalid JSON payload: {}", e))?;

    Ok((command, close + COMMENT_CLOSE.len()))
}

fn parse_changelog(text: &str, keyword_end: usize) -> Result<(Command, usize), String> {
    let close = skip_whitespace(text, keyword_end);
    if !text[close..].starts_with(COMMENT_CLOSE) {
        return Err("start marker not followed by '-->'".to_string());
    }
    let body_start = close + COMMENT_CLOSE.len();

    let mut search = body_start;
    while let Some(offset) = text[search..].find(COMMENT_OPEN) {
        let opener = search + offset;
        let keyword = skip_whitespace(text, opener + COMMENT_OPEN.len());
        if text[keyword..].starts_with(CHANGELOG_END_MARKER) {
            let end_close = skip_whitespace(text, keyword + CHANGELOG_END_MARKER.len());
            if text[end_close..].starts_with(COMMENT_CLOSE) {
                // Markers inside the block are still commands; resume at the body.
                let body = text[body_start..opener].trim().to_string();
                return Ok((Command::Changelog { text: body }, body_start));
            }
        }
        search = opener + COMMENT_OPEN.len();
    }

    Err("missing MONICA_CHANGELOG_END marker".to_string())
}

/// Find the byte offset just past the `}` closing the object opened at `start`.
fn find_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    from + (rest.len() - rest.trim_start().len())
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
