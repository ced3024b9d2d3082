mod error;
mod file_table;

pub use error::{FileError, FileResult};
pub use file_table::FileTable;

/// Object id of a table, also used to name its backing file.
pub type Oid = u32;
