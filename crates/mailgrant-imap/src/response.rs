//! Response classification.
//!
//! Operates on complete responses as returned by the framed reader, with
//! any literals already inlined after their `{n}` marker.

use crate::types::{Completion, FetchedMessage, Status};
use crate::{Error, Result};

/// A server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command continuation request (`+ ...`).
    Continuation(String),
    /// Tagged completion.
    Tagged {
        /// Tag of the command this completes.
        tag: String,
        /// Status and text.
        completion: Completion,
    },
    /// Untagged data (`* ...`).
    Untagged(Untagged),
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Untagged {
    /// Status response (`* OK ...`, `* BYE ...`).
    Status {
        /// Status.
        status: Status,
        /// Text after the status.
        text: String,
    },
    /// `* n EXISTS`.
    Exists(u32),
    /// `* n RECENT`.
    Recent(u32),
    /// `* SEARCH n n n`.
    Search(Vec<u32>),
    /// `* n FETCH (...)`.
    Fetch(FetchedMessage),
    /// Anything else.
    Other(String),
}

impl Response {
    /// Classifies a complete response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for a tagged line without a valid status
    /// or a truncated literal.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let head_end = find_crlf(raw).unwrap_or(raw.len());
        let head = String::from_utf8_lossy(&raw[..head_end]);

        if let Some(rest) = head.strip_prefix('+') {
            return Ok(Self::Continuation(rest.trim().to_string()));
        }

        if let Some(rest) = head.strip_prefix("* ") {
            return parse_untagged(rest, raw, head_end).map(Self::Untagged);
        }

        let (tag, rest) = head
            .split_once(' ')
            .ok_or_else(|| Error::Protocol(format!("unexpected response: {head}")))?;
        let (atom, text) = rest.split_once(' ').unwrap_or((rest, ""));
        let status = Status::parse(atom)
            .ok_or_else(|| Error::Protocol(format!("invalid status in: {head}")))?;

        Ok(Self::Tagged {
            tag: tag.to_string(),
            completion: Completion {
                status,
                text: text.trim().to_string(),
            },
        })
    }
}

fn parse_untagged(rest: &str, raw: &[u8], head_end: usize) -> Result<Untagged> {
    let (first, remainder) = rest.split_once(' ').unwrap_or((rest, ""));

    if let Some(status) = Status::parse(first) {
        return Ok(Untagged::Status {
            status,
            text: remainder.trim().to_string(),
        });
    }

    if first.eq_ignore_ascii_case("SEARCH") {
        let ids = remainder
            .split_whitespace()
            .filter_map(|id| id.parse().ok())
            .collect();
        return Ok(Untagged::Search(ids));
    }

    if let Ok(number) = first.parse::<u32>() {
        let keyword = remainder.split_whitespace().next().unwrap_or_default();
        match keyword.to_ascii_uppercase().as_str() {
            "EXISTS" => return Ok(Untagged::Exists(number)),
            "RECENT" => return Ok(Untagged::Recent(number)),
            "FETCH" => {
                return Ok(Untagged::Fetch(FetchedMessage {
                    sequence: number,
                    data: fetch_section(rest, raw, head_end)?,
                }));
            }
            _ => {}
        }
    }

    Ok(Untagged::Other(rest.to_string()))
}

/// Extracts the body section value: a literal, a quoted string, or `NIL`.
fn fetch_section(head: &str, raw: &[u8], head_end: usize) -> Result<Vec<u8>> {
    if let Some(len) = trailing_literal_length(head) {
        let start = head_end + 2;
        return raw
            .get(start..start + len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Protocol("truncated FETCH literal".to_string()));
    }

    Ok(head
        .find("] \"")
        .map(|pos| unquote(&head[pos + 3..]))
        .unwrap_or_default())
}

fn trailing_literal_length(head: &str) -> Option<usize> {
    let inner = head.trim_end().strip_suffix('}')?;
    let open = inner.rfind('{')?;
    inner[open + 1..].trim_end_matches('+').parse().ok()
}

/// Reads a quoted string body (after the opening quote) up to its close.
fn unquote(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut escaped = false;
    for b in s.bytes() {
        match (escaped, b) {
            (false, b'\\') => escaped = true,
            (false, b'"') => break,
            _ => {
                out.push(b);
                escaped = false;
            }
        }
    }
    out
}

pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
