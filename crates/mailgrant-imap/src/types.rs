//! Response data types.

use std::fmt;

/// Status of a tagged or untagged status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// OK.
    Ok,
    /// NO (operational failure).
    No,
    /// BAD (protocol or syntax error).
    Bad,
    /// PREAUTH (greeting only).
    PreAuth,
    /// BYE (server is closing the connection).
    Bye,
}

impl Status {
    /// Parses a status atom, case-insensitively.
    #[must_use]
    pub fn parse(atom: &str) -> Option<Self> {
        match atom.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
            Self::PreAuth => "PREAUTH",
            Self::Bye => "BYE",
        })
    }
}

/// Tagged completion of a command.
///
/// Anything other than `OK` is a soft failure: the session is still usable
/// and the caller decides whether to go on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Completion status.
    pub status: Status,
    /// Human-readable text after the status.
    pub text: String,
}

impl Completion {
    /// Returns true for an `OK` completion.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.text)
    }
}

/// Counts reported while selecting a mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
}

/// Data returned for one message by FETCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Message sequence number.
    pub sequence: u32,
    /// Body section contents (empty for `NIL`).
    pub data: Vec<u8>,
}

impl FetchedMessage {
    /// Returns the data as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
