use thiserror::Error;

use crate::buffer::BufferError;
use crate::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Attribute index {idx} out of range for table {table} with {nattrs} attributes")]
    AttributeOutOfRange {
        table: String,
        idx: usize,
        nattrs: usize,
    },
}

pub type QueryResult<T> = Result<T, QueryError>;
