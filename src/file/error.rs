use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot open table file for oid {oid}: {source}")]
    Open { oid: u32, source: io::Error },
}

pub type FileResult<T> = Result<T, FileError>;
