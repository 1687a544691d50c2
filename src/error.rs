//! Error types for record parsing, field generation and stream operations.

use std::io;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// A single field could not be converted to the requested type.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no field at index {index} (record has {len} fields)")]
    OutOfRange { index: usize, len: usize },

    #[error("field {index}: {value:?} is not a float: {source}")]
    Float {
        index: usize,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("field {index}: {value:?} is not an integer: {source}")]
    Int {
        index: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("field {index}: {value:?} does not match layout {layout:?}: {source}")]
    Time {
        index: usize,
        value: String,
        layout: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// A [`Generator`](crate::Generator) could not produce a field.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{generator}: expected {expected} column indices, got {got}")]
    Arity {
        generator: &'static str,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors surfaced by [`RecordStream`](crate::RecordStream) operations.
///
/// Every variant aborts the enclosing bulk operation. A subset that matched
/// nothing is not an error; see [`Selection`](crate::Selection).
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("source has no header row")]
    NoHeader,

    #[error("decode error: {0}")]
    Decode(#[source] csv::Error),

    #[error("row {row} has {found} fields, header has {expected}")]
    FieldCount {
        row: u64,
        expected: usize,
        found: usize,
    },

    #[error("headers do not contain column {0:?}")]
    MissingColumn(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("generate: {0}")]
    Generate(#[from] GenerateError),

    #[error("encode error: {0}")]
    Encode(#[source] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot stash while a peeked record is pending")]
    StashConflict,

    #[error("stream is closed")]
    Closed,
}
