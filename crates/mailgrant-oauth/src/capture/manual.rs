//! Manual-paste fallback for headless sessions.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};

/// Extracts the authorization code from a pasted redirect URL.
///
/// Takes the text after the first `code=` up to the next `&`, or to the end
/// of the input when no `&` follows. The value is not URL-decoded.
///
/// # Errors
///
/// Returns [`Error::CodeNotFound`] if the input has no `code=`.
pub fn extract_code(redirected_url: &str) -> Result<String> {
    let input = redirected_url.trim();
    let start = input.find("code=").ok_or(Error::CodeNotFound)? + "code=".len();
    let rest = &input[start..];
    let end = rest.find('&').unwrap_or(rest.len());
    Ok(rest[..end].to_string())
}

/// Asks the user to paste the redirected URL and extracts the code from it.
///
/// # Errors
///
/// Returns an error if reading input fails, input ends before a line is
/// read, or the line carries no code.
pub fn prompt_for_code<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<String> {
    writeln!(
        output,
        "Paste the full URL your browser was redirected to (it may show a \
         connection error), then press Enter:"
    )?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(Error::CodeNotFound);
    }
    extract_code(&line)
}
