use log::info;
use std::path::{Path, PathBuf};

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::file::FileTable;
use crate::query::{self, QueryResult, ResultSet};

/// The engine context: the buffer pool and file table built from catalog
/// configuration, plus the catalog itself.
///
/// One engine exists per process lifetime. Operators take `&mut self`, so
/// the single-caller assumption of the pin accounting is enforced by the
/// borrow checker rather than by convention.
pub struct Engine {
    catalog: Catalog,
    pool: BufferPool,
    files: FileTable,
}

impl Engine {
    /// Allocate the buffer pool and file table from the catalog's
    /// configuration. Pool slots are sized to the widest page any table in
    /// the catalog can produce, so every slot can host every table's pages.
    ///
    /// Panics if the catalog configures fewer than 3 buffer slots.
    pub fn init(catalog: Catalog, data_dir: impl Into<PathBuf>) -> Self {
        // the join operators reserve slots: the nested loop keeps one free
        // for the inner relation, the hash join builds nslots - 2 buckets
        assert!(
            catalog.buf_slots >= 3,
            "configuration needs at least 3 buffer slots, got {}",
            catalog.buf_slots
        );
        let pool = BufferPool::new(
            catalog.buf_slots,
            catalog.page_size,
            catalog.max_tuples_per_page(),
            catalog.max_nattrs(),
        );
        let files = FileTable::new(data_dir, catalog.file_limit);
        info!(
            "engine initialized: {} buffer slot(s), {} file slot(s), page size {}",
            catalog.buf_slots, catalog.file_limit, catalog.page_size
        );
        Self {
            catalog,
            pool,
            files,
        }
    }

    /// Load the catalog from `<data_dir>/metadata.json` and initialize.
    pub fn open(data_dir: impl AsRef<Path>) -> QueryResult<Self> {
        let data_dir = data_dir.as_ref();
        let catalog = Catalog::load(data_dir)?;
        Ok(Self::init(catalog, data_dir))
    }

    /// Every tuple of `table_name` whose `idx`-th attribute equals `value`.
    pub fn select(&mut self, idx: usize, value: i32, table_name: &str) -> QueryResult<ResultSet> {
        query::select(
            &self.catalog,
            &mut self.pool,
            &mut self.files,
            idx,
            value,
            table_name,
        )
    }

    /// Equi-join on `table1.idx1 == table2.idx2`.
    pub fn join(
        &mut self,
        idx1: usize,
        table1: &str,
        idx2: usize,
        table2: &str,
    ) -> QueryResult<ResultSet> {
        query::join(
            &self.catalog,
            &mut self.pool,
            &mut self.files,
            idx1,
            table1,
            idx2,
            table2,
        )
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Pool introspection, mainly for verifying pin discipline in tests.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Explicit shutdown; equivalent to dropping the engine.
    pub fn release(self) {}
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.files.close_all();
        info!("engine released");
    }
}
