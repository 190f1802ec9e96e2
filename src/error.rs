use thiserror::Error;

use crate::pager::TABLE_MAX_PAGES;

/// Errors produced by the storage engine (pager + tree). Per the engine's
/// failure model these are not recoverable mid-split, but they are still
/// ordinary `Result`s so callers (the shell) can report them and keep
/// running rather than aborting the whole process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Error: Table full.")]
    TableFull,

    #[error("Db file is not a whole number of pages. Corrupt file.")]
    CorruptFile,

    #[error("Tried to fetch page number out of bounds. {0} > {}", TABLE_MAX_PAGES)]
    OutOfBoundsPage(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors produced while parsing a line of shell input into a `Statement`.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("Syntax error: Could not parse statement.")]
    SyntaxError,

    #[error("String is too long.")]
    StringTooLong,

    #[error("ID is invalid.")]
    InvalidId,

    #[error("Unrecognized keyword at start of '{0}'.")]
    UnrecognizedStatement(String),
}
