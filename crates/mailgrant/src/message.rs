//! Plain-text message composition.

use std::fmt::Write;

use chrono::{DateTime, Utc};

/// Message to submit over SMTP.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Body text.
    pub body: String,
    /// Value of the `Date` header.
    pub date: DateTime<Utc>,
}

impl OutgoingMessage {
    /// Creates a message dated now.
    pub fn new(from: String, to: Vec<String>, subject: String, body: String) -> Self {
        Self {
            from,
            to,
            subject,
            body,
            date: Utc::now(),
        }
    }

    /// Renders the message as RFC 5322 text with CRLF line endings.
    pub fn to_rfc5322(&self) -> String {
        let mut message = String::new();

        let _ = write!(message, "From: {}\r\n", header_value(&self.from));
        let _ = write!(message, "To: {}\r\n", header_value(&self.to.join(", ")));
        let _ = write!(message, "Subject: {}\r\n", header_value(&self.subject));
        let _ = write!(message, "Date: {}\r\n", self.date.to_rfc2822());
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");
        message.push_str("\r\n");

        message.push_str(&self.body);
        if !self.body.ends_with('\n') {
            message.push_str("\r\n");
        }
        message
    }
}

/// Header values must stay on one line.
fn header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}
