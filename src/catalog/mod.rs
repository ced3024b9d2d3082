use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::buffer::{ATTR_SIZE, PAGE_ID_SIZE};
use crate::file::Oid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table {0} not found")]
    TableNotFound(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Metadata of one table: its object id (which also names the backing file),
/// attribute count, and total tuple count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub oid: Oid,
    pub nattrs: usize,
    pub ntuples: usize,
}

impl TableMeta {
    /// How many tuples fit on one page of this table.
    pub fn ntuples_per_page(&self, page_size: usize) -> usize {
        (page_size - PAGE_ID_SIZE) / (ATTR_SIZE * self.nattrs)
    }

    /// Number of pages in the backing file. An empty table still occupies
    /// one page on disk.
    pub fn npages(&self, page_size: usize) -> u64 {
        let per_page = self.ntuples_per_page(page_size);
        if per_page == 0 {
            return 0;
        }
        self.ntuples.div_ceil(per_page).max(1) as u64
    }
}

/// Engine configuration plus the table registry, loaded once at startup
/// from `metadata.json` in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub page_size: usize,
    pub buf_slots: usize,
    pub file_limit: usize,
    pub tables: Vec<TableMeta>,
}

impl Catalog {
    pub fn load(data_dir: &Path) -> CatalogResult<Self> {
        let metadata_path = data_dir.join("metadata.json");
        let content = fs::read_to_string(&metadata_path)?;
        let catalog = serde_json::from_str(&content)?;
        Ok(catalog)
    }

    pub fn save(&self, data_dir: &Path) -> CatalogResult<()> {
        let metadata_path = data_dir.join("metadata.json");
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(&metadata_path, content)?;
        Ok(())
    }

    pub fn table(&self, name: &str) -> CatalogResult<&TableMeta> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }

    /// Widest tuple capacity over all tables. The table with the fewest
    /// attributes packs the most tuples onto a page, so this bounds the
    /// tuple count any buffer slot may ever hold.
    pub fn max_tuples_per_page(&self) -> usize {
        self.tables
            .iter()
            .map(|t| t.ntuples_per_page(self.page_size))
            .max()
            .unwrap_or(0)
    }

    /// Widest attribute count over all tables.
    pub fn max_nattrs(&self) -> usize {
        self.tables.iter().map(|t| t.nattrs).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_catalog() -> Catalog {
        Catalog {
            page_size: 48, // 8-byte header + 5 tuples of 2 attributes
            buf_slots: 4,
            file_limit: 2,
            tables: vec![
                TableMeta {
                    name: "t1".to_string(),
                    oid: 10,
                    nattrs: 2,
                    ntuples: 11,
                },
                TableMeta {
                    name: "t2".to_string(),
                    oid: 11,
                    nattrs: 4,
                    ntuples: 10,
                },
            ],
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = sample_catalog();
        catalog.save(temp_dir.path()).unwrap();

        let loaded = Catalog::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.page_size, 48);
        assert_eq!(loaded.buf_slots, 4);
        assert_eq!(loaded.file_limit, 2);
        assert_eq!(loaded.tables.len(), 2);
        assert_eq!(loaded.table("t1").unwrap().oid, 10);
    }

    #[test]
    fn test_table_not_found() {
        let catalog = sample_catalog();
        let result = catalog.table("missing");
        assert!(matches!(result, Err(CatalogError::TableNotFound(_))));
    }

    #[test]
    fn test_tuples_per_page() {
        let catalog = sample_catalog();
        // (48 - 8) / (4 * 2) = 5
        assert_eq!(catalog.table("t1").unwrap().ntuples_per_page(48), 5);
        // (48 - 8) / (4 * 4) = 2
        assert_eq!(catalog.table("t2").unwrap().ntuples_per_page(48), 2);
    }

    #[test]
    fn test_page_count() {
        let meta = TableMeta {
            name: "t".to_string(),
            oid: 1,
            nattrs: 2,
            ntuples: 11,
        };
        // 11 tuples at 5 per page
        assert_eq!(meta.npages(48), 3);

        let meta = TableMeta { ntuples: 10, ..meta };
        assert_eq!(meta.npages(48), 2);

        // an empty table still has one page on disk
        let meta = TableMeta { ntuples: 0, ..meta };
        assert_eq!(meta.npages(48), 1);
    }

    #[test]
    fn test_pool_sizing() {
        let catalog = sample_catalog();
        // t1 has the fewest attributes, so it packs the most tuples
        assert_eq!(catalog.max_tuples_per_page(), 5);
        assert_eq!(catalog.max_nattrs(), 4);
    }
}
