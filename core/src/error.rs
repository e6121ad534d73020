//! Error types shared by the codec and the query evaluator.
//!
//! Document read failures during a build are not represented here: they are
//! collected as [`crate::DocumentFailure`] values and never abort a build.

use std::io;

use thiserror::Error;

/// A query string that cannot be evaluated.
///
/// All positions are 1-based character positions within the query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("no matching opening bracket for ')' at position {position}")]
    UnmatchedClosingBracket { position: usize },

    #[error("no matching closing bracket for '(' at position {position}")]
    UnmatchedOpeningBracket { position: usize },

    #[error("incorrect symbol '{symbol}' at position {position}")]
    IncorrectSymbol { symbol: char, position: usize },

    #[error("empty expression at position {position}")]
    EmptyExpression { position: usize },

    #[error("incomplete distance operator at position {position}")]
    IncompleteDistance { position: usize },

    #[error("distance at position {position} is too large")]
    DistanceOutOfRange { position: usize },
}

/// Failure to write or read a persisted index.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed index data: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("not an index file (bad magic)")]
    BadMagic,

    #[error("unsupported index format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("index was built for languages {stored:?} but {configured:?} are configured")]
    LanguageMismatch { stored: Vec<String>, configured: Vec<String> },

    #[error("corrupt index: {0}")]
    Corrupt(String),
}
