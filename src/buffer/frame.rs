use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use super::error::{BufferError, BufferResult};
use super::{ATTR_SIZE, PAGE_ID_SIZE, PageId};
use crate::file::Oid;

/// One buffer-pool slot: a decoded page image plus its replacement state.
///
/// Tuple storage is a fixed inline arena sized to the engine-wide maximum
/// (`max_tuples_per_page * max_nattrs`), so any slot can host any table's
/// pages without reallocation. Frames are allocated once at startup and
/// reused until shutdown.
pub struct Frame {
    pid: PageId,
    /// Owning table, or `None` while the slot is empty.
    oid: Option<Oid>,
    nattrs: usize,
    ntuples_per_page: usize,
    ntuples: usize,
    /// Outstanding holds; nonzero blocks eviction.
    pin_count: u32,
    /// Clock-sweep recency counter.
    usage: u32,
    data: Vec<i32>,
}

impl Frame {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            pid: 0,
            oid: None,
            nattrs: 0,
            ntuples_per_page: 0,
            ntuples: 0,
            pin_count: 0,
            usage: 0,
            data: vec![0; capacity],
        }
    }

    pub fn pid(&self) -> PageId {
        self.pid
    }

    pub fn oid(&self) -> Option<Oid> {
        self.oid
    }

    pub fn holds(&self, oid: Oid, pid: PageId) -> bool {
        self.oid == Some(oid) && self.pid == pid
    }

    pub fn nattrs(&self) -> usize {
        self.nattrs
    }

    /// Number of tuples resident in this frame.
    pub fn ntuples(&self) -> usize {
        self.ntuples
    }

    /// Tuple capacity of the page this frame holds.
    pub fn ntuples_per_page(&self) -> usize {
        self.ntuples_per_page
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn usage(&self) -> u32 {
        self.usage
    }

    /// The `i`-th resident tuple. Panics if `i >= ntuples()`.
    pub fn tuple(&self, i: usize) -> &[i32] {
        &self.data[i * self.nattrs..(i + 1) * self.nattrs]
    }

    pub(crate) fn pin(&mut self) {
        self.pin_count += 1;
        self.usage += 1;
    }

    /// Drop one hold on the frame. A no-op when the pin count is already
    /// zero, so double releases cannot drive it negative.
    pub(crate) fn unpin(&mut self) {
        if self.pin_count > 0 {
            self.pin_count -= 1;
        }
    }

    /// Clock-sweep pass-over: spend one unit of recency.
    pub(crate) fn spend_usage(&mut self) {
        if self.usage > 0 {
            self.usage -= 1;
        }
    }

    /// Return the slot to its empty state, tuple payload cleared to the
    /// all-zero sentinel.
    pub(crate) fn reset(&mut self) {
        self.pid = 0;
        self.oid = None;
        self.nattrs = 0;
        self.ntuples_per_page = 0;
        self.ntuples = 0;
        self.pin_count = 0;
        self.usage = 0;
        self.data.fill(0);
    }

    /// Locate `pid` in the file and decode its tuples into this frame.
    ///
    /// The page id in each page header is authoritative; it is not assumed
    /// to equal the page's position in the file, so the headers are scanned
    /// linearly. Tuples are read until the page capacity is reached or an
    /// all-zero tuple (the end-of-page sentinel) is found; the remaining
    /// slot capacity is zero-filled.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn load(
        &mut self,
        file: &mut File,
        page_size: usize,
        pid: PageId,
        oid: Oid,
        ntuples_per_page: usize,
        nattrs: usize,
        npages: u64,
    ) -> BufferResult<()> {
        let pos = find_page(file, page_size, pid, oid, npages)?;
        file.seek(SeekFrom::Start(
            pos * page_size as u64 + PAGE_ID_SIZE as u64,
        ))?;

        self.pid = pid;
        self.oid = Some(oid);
        self.nattrs = nattrs;
        self.ntuples_per_page = ntuples_per_page;

        let mut raw = vec![0u8; ATTR_SIZE * nattrs];
        let mut count = 0;
        for _ in 0..ntuples_per_page {
            read_tuple(file, &mut raw, pid)?;

            let mut all_zero = true;
            for (k, chunk) in raw.chunks_exact(ATTR_SIZE).enumerate() {
                let value = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                if value != 0 {
                    all_zero = false;
                }
                self.data[count * nattrs + k] = value;
            }
            if all_zero {
                break;
            }
            count += 1;
        }

        self.ntuples = count;
        self.data[count * nattrs..].fill(0);
        Ok(())
    }
}

fn read_tuple(file: &mut File, raw: &mut [u8], pid: PageId) -> BufferResult<()> {
    file.read_exact(raw).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            BufferError::ShortRead { pid }
        } else {
            BufferError::Io(e)
        }
    })
}

/// File position (page index) of `pid`, by a linear scan of page headers.
fn find_page(
    file: &mut File,
    page_size: usize,
    pid: PageId,
    oid: Oid,
    npages: u64,
) -> BufferResult<u64> {
    let mut header = [0u8; PAGE_ID_SIZE];
    for pos in 0..npages {
        file.seek(SeekFrom::Start(pos * page_size as u64))?;
        file.read_exact(&mut header).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                BufferError::ShortRead { pid }
            } else {
                BufferError::Io(e)
            }
        })?;
        if u64::from_le_bytes(header) == pid {
            return Ok(pos);
        }
    }
    Err(BufferError::PageNotFound { pid, oid })
}

/// Page ids of every page in a table file, in file order. Operators read
/// these up front and then fetch pages one at a time.
pub(crate) fn read_page_ids(
    file: &mut File,
    page_size: usize,
    npages: u64,
) -> BufferResult<Vec<PageId>> {
    let mut ids = Vec::with_capacity(npages as usize);
    let mut header = [0u8; PAGE_ID_SIZE];
    for pos in 0..npages {
        file.seek(SeekFrom::Start(pos * page_size as u64))?;
        file.read_exact(&mut header)?;
        ids.push(u64::from_le_bytes(header));
    }
    Ok(ids)
}
