use log::debug;

use super::error::{BufferError, BufferResult};
use super::frame::{self, Frame};
use super::PageId;
use crate::file::{FileTable, Oid};

/// Fixed array of page slots with clock-sweep (second chance) replacement.
///
/// Slots are allocated once at startup and reused for the engine's
/// lifetime. The pool never writes pages back: the engine is read-only, so
/// eviction simply discards the slot's contents.
pub struct BufferPool {
    frames: Vec<Frame>,
    page_size: usize,
    /// Persistent clock hand: where the next victim search starts.
    nvb: usize,
}

impl BufferPool {
    pub fn new(
        nslots: usize,
        page_size: usize,
        max_tuples_per_page: usize,
        max_nattrs: usize,
    ) -> Self {
        let capacity = max_tuples_per_page * max_nattrs;
        Self {
            frames: (0..nslots).map(|_| Frame::new(capacity)).collect(),
            page_size,
            nvb: 0,
        }
    }

    pub fn nslots(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, slot: usize) -> &Frame {
        &self.frames[slot]
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Total outstanding pins across all slots.
    pub fn pinned(&self) -> u32 {
        self.frames.iter().map(|f| f.pin_count()).sum()
    }

    /// Page ids of every page of a table, in file order.
    pub fn page_ids(
        &self,
        files: &mut FileTable,
        oid: Oid,
        npages: u64,
    ) -> BufferResult<Vec<PageId>> {
        let file = files.open(oid)?;
        frame::read_page_ids(file, self.page_size, npages)
    }

    /// Slot index of `(oid, pid)`, loading the page from disk on a miss.
    ///
    /// The returned slot has its pin and usage counts incremented; the
    /// caller must `release` it exactly once when done with the page.
    pub fn fetch(
        &mut self,
        files: &mut FileTable,
        pid: PageId,
        oid: Oid,
        ntuples_per_page: usize,
        nattrs: usize,
        npages: u64,
    ) -> BufferResult<usize> {
        if let Some(slot) = self.lookup(oid, pid) {
            self.frames[slot].pin();
            return Ok(slot);
        }

        let slot = self.victim()?;
        debug!("reading page {pid} of oid {oid} into slot {slot}");
        let file = files.open(oid)?;
        let loaded = self.frames[slot].load(
            file,
            self.page_size,
            pid,
            oid,
            ntuples_per_page,
            nattrs,
            npages,
        );
        if let Err(e) = loaded {
            // a partially decoded page must never look like a cache hit
            self.frames[slot].reset();
            return Err(e);
        }
        self.frames[slot].pin();
        Ok(slot)
    }

    /// Drop one hold on a slot. A no-op when the slot is not pinned.
    pub fn release(&mut self, slot: usize) {
        self.frames[slot].unpin();
    }

    fn lookup(&self, oid: Oid, pid: PageId) -> Option<usize> {
        self.frames.iter().position(|f| f.holds(oid, pid))
    }

    /// Clock sweep starting at the persistent hand. A slot is a victim when
    /// both its usage and pin counts are zero; sweeping past a slot spends
    /// one unit of its usage (second chance).
    fn victim(&mut self) -> BufferResult<usize> {
        // With every slot pinned the sweep would never terminate. This can
        // only happen if a caller leaks pins.
        if self.frames.iter().all(|f| f.pin_count() > 0) {
            return Err(BufferError::PoolExhausted);
        }

        loop {
            let hand = self.nvb;
            self.nvb = (self.nvb + 1) % self.frames.len();

            let frame = &mut self.frames[hand];
            if frame.usage() == 0 && frame.pin_count() == 0 {
                if let Some(oid) = frame.oid() {
                    debug!("evicting page {} of oid {oid} from slot {hand}", frame.pid());
                }
                frame.reset();
                return Ok(hand);
            }
            frame.spend_usage();
        }
    }
}
