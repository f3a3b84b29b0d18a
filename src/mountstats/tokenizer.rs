//! Whitespace tokenizer for `/proc/self/mountstats` lines.
//!
//! The kernel separates fields with spaces and tabs. Counter lines are
//! sequences of unsigned decimal integers whose length has grown over kernel
//! releases, so [`Cursor::parse_unsigned_sequence`] reads at most the number
//! of fields the caller asks for and reports how many it actually found.

use std::num::{IntErrorKind, ParseIntError};

/// Errors raised while converting a token into an integer.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid integer `{token}`: {source}")]
    InvalidInteger {
        token: String,
        #[source]
        source: ParseIntError,
    },
    #[error("integer `{token}` does not fit into 64 bits")]
    Overflow { token: String },
}

impl TokenError {
    fn from_parse(token: &str, source: ParseIntError) -> Self {
        match source.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => TokenError::Overflow {
                token: token.to_owned(),
            },
            _ => TokenError::InvalidInteger {
                token: token.to_owned(),
                source,
            },
        }
    }
}

#[inline]
fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// A forward-only position inside a single line.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// The unread remainder of the line.
    pub fn rest(&self) -> &'a str {
        self.rest
    }

    /// Advances past spaces and tabs.
    pub fn skip_blank(&mut self) {
        self.rest = self.rest.trim_start_matches(is_blank);
    }

    /// Returns the next blank-delimited token without consuming it.
    pub fn peek_token(&self) -> Option<&'a str> {
        let mut probe = *self;
        probe.next_token()
    }

    /// Consumes and returns the next blank-delimited token.
    pub fn next_token(&mut self) -> Option<&'a str> {
        self.skip_blank();
        if self.rest.is_empty() {
            return None;
        }
        let end = self.rest.find(is_blank).unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    /// Consumes a single signed integer.
    ///
    /// Returns `Ok(None)` if the line has no more tokens.
    pub fn parse_signed(&mut self) -> Result<Option<i64>, TokenError> {
        match self.next_token() {
            Some(token) => token
                .parse::<i64>()
                .map(Some)
                .map_err(|source| TokenError::from_parse(token, source)),
            None => Ok(None),
        }
    }

    /// Parses up to `out.len()` unsigned integers into `out`.
    ///
    /// Returns the number of values written. Running out of tokens early is
    /// not an error; any tokens after the requested count are left unread.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if a token is present but is not a valid `u64`.
    pub fn parse_unsigned_sequence(&mut self, out: &mut [u64]) -> Result<usize, TokenError> {
        for (parsed, slot) in out.iter_mut().enumerate() {
            let Some(token) = self.next_token() else {
                return Ok(parsed);
            };
            *slot = token
                .parse::<u64>()
                .map_err(|source| TokenError::from_parse(token, source))?;
        }
        Ok(out.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_blank_handles_tabs_and_spaces() {
        let mut cursor = Cursor::new(" \t  age:\t12");
        cursor.skip_blank();
        assert_eq!(cursor.rest(), "age:\t12");
    }

    #[test]
    fn tokens_are_split_on_blanks() {
        let mut cursor = Cursor::new("\ttcp  0\t1 ");
        assert_eq!(cursor.peek_token(), Some("tcp"));
        assert_eq!(cursor.next_token(), Some("tcp"));
        assert_eq!(cursor.next_token(), Some("0"));
        assert_eq!(cursor.next_token(), Some("1"));
        assert_eq!(cursor.peek_token(), None);
        assert_eq!(cursor.next_token(), None);
    }

    #[test]
    fn parses_full_sequence() {
        let mut out = [0u64; 4];
        let n = Cursor::new("1 2  3\t4")
            .parse_unsigned_sequence(&mut out)
            .unwrap();
        assert_eq!(n, 4);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn short_sequence_returns_partial_count() {
        let mut out = [0u64; 8];
        let n = Cursor::new("5 6 7").parse_unsigned_sequence(&mut out).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&out[..3], &[5, 6, 7]);
        assert_eq!(&out[3..], &[0; 5]);
    }

    #[test]
    fn extra_tokens_are_left_unread() {
        let mut out = [0u64; 2];
        let mut cursor = Cursor::new("1 2 3 4");
        assert_eq!(cursor.parse_unsigned_sequence(&mut out).unwrap(), 2);
        assert_eq!(cursor.next_token(), Some("3"));
    }

    #[test]
    fn empty_line_yields_zero() {
        let mut out = [0u64; 3];
        assert_eq!(Cursor::new("").parse_unsigned_sequence(&mut out).unwrap(), 0);
        assert_eq!(Cursor::new(" \t ").parse_unsigned_sequence(&mut out).unwrap(), 0);
    }

    #[test]
    fn malformed_token_is_an_error() {
        let mut out = [0u64; 3];
        let err = Cursor::new("1 x2 3")
            .parse_unsigned_sequence(&mut out)
            .unwrap_err();
        match err {
            TokenError::InvalidInteger { token, .. } => assert_eq!(token, "x2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_token_is_rejected_for_unsigned() {
        let mut out = [0u64; 1];
        let err = Cursor::new("-1").parse_unsigned_sequence(&mut out).unwrap_err();
        assert!(matches!(err, TokenError::InvalidInteger { .. }));
    }

    #[test]
    fn overflow_is_distinguished() {
        let mut out = [0u64; 1];
        let err = Cursor::new("18446744073709551616")
            .parse_unsigned_sequence(&mut out)
            .unwrap_err();
        match err {
            TokenError::Overflow { token } => assert_eq!(token, "18446744073709551616"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_signed_reads_one_value() {
        let mut cursor = Cursor::new("  -42 rest");
        assert_eq!(cursor.parse_signed().unwrap(), Some(-42));
        assert_eq!(Cursor::new("").parse_signed().unwrap(), None);
        assert!(Cursor::new("abc").parse_signed().is_err());
    }
}
