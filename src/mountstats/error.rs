use std::collections::TryReserveError;
use std::path::PathBuf;

use crate::fsutil;

use super::parser::State;
use super::tokenizer::TokenError;

/// Grammar-level failures raised by the line state machine.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("expected a `device` line")]
    ExpectedDevice,

    #[error("missing literal `{literal}` on device line")]
    MissingLiteral { literal: &'static str },

    #[error("missing value after `age:`")]
    MissingAge,

    #[error("negative age `{0}`")]
    NegativeAge(i64),

    #[error("unknown transport `{0}`")]
    UnknownTransport(String),

    #[error("missing `:` after operation name")]
    MissingOpSeparator,

    #[error("`{section}` needs {expected} values, found {found}")]
    FieldCount {
        section: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid value in `{section}`: {source}")]
    Token {
        section: &'static str,
        #[source]
        source: TokenError,
    },

    #[error("failed to grow per-op table: {0}")]
    Allocation(#[source] TryReserveError),

    #[error("pass aborted: {0}")]
    Limit(#[source] fsutil::LineReadError),
}

/// Coarse classification of a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The report could not be opened.
    MissingSource,
    /// The report was opened but reading it failed part way through.
    ReadFailure,
    GrammarViolation,
    FieldCountMismatch,
    AllocationFailure,
}

/// Errors returned by a mountstats pass. None of them outlive the pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),

    #[error("failed to read `{path}` at line {line}: {source}")]
    ReadLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in `{path}` at line {line} (state {state}, buffer `{raw}`): {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        state: State,
        raw: String,
        #[source]
        source: ParseError,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileOpen(_) => ErrorKind::MissingSource,
            Error::ReadLine { .. } => ErrorKind::ReadFailure,
            Error::Parse { source, .. } => match source {
                ParseError::FieldCount { .. } => ErrorKind::FieldCountMismatch,
                ParseError::Allocation(_) => ErrorKind::AllocationFailure,
                _ => ErrorKind::GrammarViolation,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
