use log::debug;
use std::fs::File;
use std::path::PathBuf;

use super::error::{FileError, FileResult};
use super::Oid;

/// One occupied slot of the file table.
struct Entry {
    oid: Oid,
    file: File,
}

/// Bounded registry of open table files, keyed by object id.
///
/// The table has a fixed number of slots for the engine's lifetime. When it
/// fills up, the entry at the round-robin cursor is closed to make room,
/// regardless of how recently it was used.
pub struct FileTable {
    data_dir: PathBuf,
    entries: Vec<Option<Entry>>,
    /// Round-robin eviction cursor over `0..file_limit`.
    next_delete: usize,
}

impl FileTable {
    pub fn new(data_dir: impl Into<PathBuf>, file_limit: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            entries: (0..file_limit).map(|_| None).collect(),
            next_delete: 0,
        }
    }

    /// Path of the backing file for a table, keyed on its oid.
    fn table_path(&self, oid: Oid) -> PathBuf {
        self.data_dir.join(oid.to_string())
    }

    fn position(&self, oid: Oid) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_ref().is_some_and(|e| e.oid == oid))
    }

    /// Handle for `oid`, opening the backing file if it is not already open.
    pub fn open(&mut self, oid: Oid) -> FileResult<&mut File> {
        let slot = match self.position(oid) {
            Some(slot) => slot,
            None => self.install(oid)?,
        };

        match &mut self.entries[slot] {
            Some(entry) => Ok(&mut entry.file),
            None => unreachable!("file table slot filled above"),
        }
    }

    /// Handle for `oid` if its file is currently open.
    pub fn lookup(&mut self, oid: Oid) -> Option<&mut File> {
        let slot = self.position(oid)?;
        self.entries[slot].as_mut().map(|e| &mut e.file)
    }

    /// Open the file for `oid` and place it in a free slot, evicting the
    /// entry at the round-robin cursor when the table is full.
    fn install(&mut self, oid: Oid) -> FileResult<usize> {
        let file = File::open(self.table_path(oid))
            .map_err(|source| FileError::Open { oid, source })?;

        let slot = match self.entries.iter().position(|e| e.is_none()) {
            Some(free) => free,
            None => self.evict(),
        };

        debug!("opened table file for oid {oid}");
        self.entries[slot] = Some(Entry { oid, file });
        Ok(slot)
    }

    /// Close the entry at the cursor and advance it. Returns the freed slot.
    fn evict(&mut self) -> usize {
        let slot = self.next_delete % self.entries.len();
        if let Some(old) = self.entries[slot].take() {
            debug!("closed table file for oid {}", old.oid);
        }
        self.next_delete += 1;
        slot
    }

    /// Close every open file. Used at engine shutdown.
    pub fn close_all(&mut self) {
        for entry in self.entries.iter_mut() {
            if let Some(old) = entry.take() {
                debug!("closed table file for oid {}", old.oid);
            }
        }
    }

    pub fn is_open(&self, oid: Oid) -> bool {
        self.position(oid).is_some()
    }

    pub fn open_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_data_dir(oids: &[Oid]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for oid in oids {
            fs::write(temp_dir.path().join(oid.to_string()), b"").unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_open_reuses_entry() {
        let dir = setup_data_dir(&[1]);
        let mut table = FileTable::new(dir.path(), 4);

        table.open(1).unwrap();
        table.open(1).unwrap();
        assert_eq!(table.open_count(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = setup_data_dir(&[]);
        let mut table = FileTable::new(dir.path(), 4);

        let result = table.open(99);
        assert!(matches!(result, Err(FileError::Open { oid: 99, .. })));
        assert_eq!(table.open_count(), 0);
    }

    #[test]
    fn test_round_robin_eviction() {
        let dir = setup_data_dir(&[1, 2, 3, 4]);
        let mut table = FileTable::new(dir.path(), 2);

        table.open(1).unwrap();
        table.open(2).unwrap();
        assert_eq!(table.open_count(), 2);

        // full: slot 0 (oid 1) is closed first
        table.open(3).unwrap();
        assert!(!table.is_open(1));
        assert!(table.is_open(2));
        assert!(table.is_open(3));

        // then slot 1 (oid 2)
        table.open(4).unwrap();
        assert!(!table.is_open(2));
        assert!(table.is_open(3));
        assert!(table.is_open(4));
        assert_eq!(table.open_count(), 2);
    }

    #[test]
    fn test_eviction_ignores_recency() {
        let dir = setup_data_dir(&[1, 2, 3]);
        let mut table = FileTable::new(dir.path(), 2);

        table.open(1).unwrap();
        table.open(2).unwrap();

        // touching oid 1 does not save it: eviction is pure round-robin
        table.open(1).unwrap();
        table.open(3).unwrap();
        assert!(!table.is_open(1));
        assert!(table.is_open(2));
        assert!(table.is_open(3));
    }

    #[test]
    fn test_lookup() {
        let dir = setup_data_dir(&[1]);
        let mut table = FileTable::new(dir.path(), 2);

        assert!(table.lookup(1).is_none());
        table.open(1).unwrap();
        assert!(table.lookup(1).is_some());
    }

    #[test]
    fn test_close_all() {
        let dir = setup_data_dir(&[1, 2]);
        let mut table = FileTable::new(dir.path(), 4);

        table.open(1).unwrap();
        table.open(2).unwrap();
        table.close_all();
        assert_eq!(table.open_count(), 0);
    }
}
