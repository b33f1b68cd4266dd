//! IMAP command builder.
//!
//! Only the commands a token-authenticated mailbox reader needs.

mod tag_generator;

pub use tag_generator::TagGenerator;

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGOUT command.
    Logout,
    /// AUTHENTICATE command without an initial response.
    Authenticate {
        /// SASL mechanism name.
        mechanism: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// SEARCH command.
    Search {
        /// Search criteria, sent verbatim (e.g. `ALL`).
        criteria: String,
    },
    /// FETCH command for a single message.
    Fetch {
        /// Message sequence number.
        sequence: u32,
        /// Data items to fetch.
        items: FetchItems,
    },
    /// CLOSE command.
    Close,
}

/// FETCH data items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// Selected header fields, without setting `\Seen`.
    HeaderFields(Vec<String>),
    /// Full message, without setting `\Seen`.
    Body,
}

impl FetchItems {
    /// Header fields `FROM SUBJECT DATE`.
    #[must_use]
    pub fn summary_headers() -> Self {
        Self::HeaderFields(vec!["FROM".into(), "SUBJECT".into(), "DATE".into()])
    }
}

impl Command {
    /// Serializes the command with a tag, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::Close => buf.extend_from_slice(b"CLOSE"),
            Self::Authenticate { mechanism } => {
                buf.extend_from_slice(b"AUTHENTICATE ");
                buf.extend_from_slice(mechanism.as_bytes());
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox);
            }
            Self::Search { criteria } => {
                buf.extend_from_slice(b"SEARCH ");
                buf.extend_from_slice(criteria.as_bytes());
            }
            Self::Fetch { sequence, items } => {
                buf.extend_from_slice(format!("FETCH {sequence} ").as_bytes());
                write_fetch_items(&mut buf, items);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Writes an astring (atom or quoted string).
fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}

fn write_fetch_items(buf: &mut Vec<u8>, items: &FetchItems) {
    match items {
        FetchItems::HeaderFields(fields) => {
            buf.extend_from_slice(b"(BODY.PEEK[HEADER.FIELDS (");
            buf.extend_from_slice(fields.join(" ").as_bytes());
            buf.extend_from_slice(b")])");
        }
        FetchItems::Body => buf.extend_from_slice(b"(BODY.PEEK[])"),
    }
}
