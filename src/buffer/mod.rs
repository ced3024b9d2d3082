mod error;
mod frame;
mod pool;

pub use error::{BufferError, BufferResult};
pub use frame::Frame;
pub use pool::BufferPool;

/// Bytes of the page-id header at the start of every on-disk page.
pub const PAGE_ID_SIZE: usize = 8;

/// Bytes of one attribute value on disk (i32, little-endian).
pub const ATTR_SIZE: usize = 4;

/// Page ID type. Unique within a table file, but not necessarily equal to
/// the page's position in the file.
pub type PageId = u64;
