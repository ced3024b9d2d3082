pub mod buffer;
pub mod catalog;
mod engine;
pub mod file;
pub mod query;

#[cfg(test)]
pub(crate) mod test_util;

pub use buffer::{BufferError, BufferPool, BufferResult, Frame, PageId};
pub use catalog::{Catalog, CatalogError, CatalogResult, TableMeta};
pub use engine::Engine;
pub use file::{FileError, FileResult, FileTable, Oid};
pub use query::{QueryError, QueryResult, ResultSet};
