use std::io;
use thiserror::Error;

use crate::file::FileError;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Page {pid} not found in table file for oid {oid}")]
    PageNotFound { pid: u64, oid: u32 },

    #[error("Short read decoding page {pid}")]
    ShortRead { pid: u64 },

    #[error("Every buffer slot is pinned")]
    PoolExhausted,
}

pub type BufferResult<T> = Result<T, BufferError>;
