//! SMTP reply parsing.

use super::error::{ClientError, Result};

/// One line of a (possibly multi-line) reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    pub code: u16,
    /// `false` for `250-...` continuation lines.
    pub is_last: bool,
    pub message: String,
}

/// A complete SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Response {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// All lines joined by a single space, for error messages.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// `334`, the server is waiting for the next authentication exchange.
    #[must_use]
    pub const fn is_auth_challenge(&self) -> bool {
        self.code == 334
    }

    /// Whether an EHLO reply advertises `keyword` (case-insensitive).
    #[must_use]
    pub fn supports(&self, keyword: &str) -> bool {
        self.extensions()
            .any(|(name, _)| name.eq_ignore_ascii_case(keyword))
    }

    /// Mechanisms listed on the `AUTH` line(s) of an EHLO reply.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.extensions()
            .filter(|(name, _)| name.eq_ignore_ascii_case("AUTH"))
            .flat_map(|(_, params)| params.split_whitespace())
            .map(str::to_ascii_uppercase)
            .collect()
    }

    /// `(keyword, parameters)` for every line after the greeting line.
    ///
    /// Old servers write `AUTH=LOGIN PLAIN`, so `=` also separates the keyword.
    fn extensions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().skip(1).map(|line| {
            line.split_once([' ', '='])
                .map_or((line.as_str(), ""), |(name, rest)| (name, rest))
        })
    }

    /// Parse a single reply line, without its line terminator.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the line doesn't match SMTP format.
    pub fn parse_line(line: &str) -> Result<ResponseLine> {
        let (code, rest) = line
            .split_at_checked(3)
            .ok_or_else(|| ClientError::ParseError(format!("Response line too short: '{line}'")))?;

        let code = code
            .parse::<u16>()
            .map_err(|_| ClientError::ParseError(format!("Invalid status code: '{code}'")))?;

        let (is_last, message) = match rest.as_bytes().first() {
            None => (true, ""),
            Some(b' ') => (true, &rest[1..]),
            Some(b'-') => (false, &rest[1..]),
            Some(_) => {
                return Err(ClientError::ParseError(format!(
                    "Invalid separator in response line: '{line}'"
                )));
            }
        };

        Ok(ResponseLine {
            code,
            is_last,
            message: message.to_string(),
        })
    }

    /// Parse one complete reply from the front of `buffer`.
    ///
    /// Returns the reply and the number of bytes it occupied, or `None` if the
    /// buffer does not yet hold a complete reply.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ParseError` if the reply is malformed.
    pub fn parse_response(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let mut consumed = 0;
        let mut code = None;
        let mut lines = Vec::new();

        while let Some(end) = buffer[consumed..].iter().position(|&b| b == b'\n') {
            let raw = &buffer[consumed..consumed + end];
            consumed += end + 1;

            let text = std::str::from_utf8(raw)?.trim_end_matches('\r');
            if text.is_empty() {
                continue;
            }

            let line = Self::parse_line(text)?;
            match code {
                Some(expected) if expected != line.code => {
                    return Err(ClientError::ParseError(format!(
                        "Status code mismatch in multi-line response: expected {expected}, got {}",
                        line.code
                    )));
                }
                None => code = Some(line.code),
                Some(_) => {}
            }

            lines.push(line.message);

            if line.is_last {
                return Ok(code.map(|code| (Self::new(code, lines), consumed)));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line() {
        let (response, consumed) = Response::parse_response(b"235 2.7.0 Accepted\r\n")
            .unwrap()
            .unwrap();

        assert_eq!(response.code, 235);
        assert_eq!(response.lines, vec!["2.7.0 Accepted"]);
        assert_eq!(consumed, 20);
    }

    #[test]
    fn test_parse_bare_code() {
        let line = Response::parse_line("250").unwrap();
        assert!(line.is_last);
        assert!(line.message.is_empty());
    }

    #[test]
    fn test_incomplete_multi_line() {
        assert!(
            Response::parse_response(b"250-smtp.example.org\r\n250-AUTH PLAIN")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_leaves_pipelined_bytes() {
        let data = b"250 OK\r\n354 Go ahead\r\n";
        let (response, consumed) = Response::parse_response(data).unwrap().unwrap();

        assert_eq!(response.code, 250);
        assert_eq!(&data[consumed..], b"354 Go ahead\r\n");
    }

    #[test]
    fn test_mismatched_codes() {
        assert!(Response::parse_response(b"250-one\r\n251 two\r\n").is_err());
    }

    #[test]
    fn test_bad_separator() {
        assert!(Response::parse_line("250_oops").is_err());
    }

    #[test]
    fn test_ehlo_capabilities() {
        let data = b"250-smtp.example.org\r\n250-SIZE 35882577\r\n250-AUTH LOGIN plain XOAUTH2\r\n250 STARTTLS\r\n";
        let (response, _) = Response::parse_response(data).unwrap().unwrap();

        assert!(response.supports("starttls"));
        assert!(response.supports("SIZE"));
        assert!(!response.supports("smtp.example.org"));
        assert_eq!(
            response.auth_mechanisms(),
            vec!["LOGIN", "PLAIN", "XOAUTH2"]
        );
    }

    #[test]
    fn test_legacy_auth_line() {
        let response = Response::new(
            250,
            vec!["mx".to_string(), "AUTH=LOGIN".to_string()],
        );
        assert_eq!(response.auth_mechanisms(), vec!["LOGIN"]);
    }
}
