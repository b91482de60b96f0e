//! Error types for all FuseDB operations.

use std::io;
use thiserror::Error;

/// Top-level error type for FuseDB operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("page {page} has been corrupted: {detail}")]
    CorruptPage { page: u64, detail: String },

    #[error("invalid magic bytes in main.db")]
    InvalidMagic,

    #[error("buffer pool exhausted: all {0} frames are pinned")]
    PoolExhausted(usize),

    #[error("database directory is locked by another process")]
    FileLocked,
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("bad {expected} value for column '{column}': '{value}'")]
    BadValue {
        column: String,
        expected: &'static str,
        value: String,
    },

    #[error("value for column '{column}' exceeds declared width {max} (got {actual} bytes)")]
    ValueTooLong {
        column: String,
        max: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table already exists: {0}")]
    TableExists(String),

    #[error("table does not exist: {0}")]
    TableMissing(String),

    #[error("no such column: {0}")]
    BadField(String),

    #[error("bad schema: {0}")]
    BadSchema(String),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("syntax error at byte {pos}: {msg}")]
    Syntax { pos: usize, msg: String },

    #[error("unsupported statement: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
