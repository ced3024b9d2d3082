use log::debug;

use super::error::{QueryError, QueryResult};
use super::ResultSet;
use crate::buffer::{BufferPool, PageId};
use crate::catalog::{Catalog, TableMeta};
use crate::file::{FileTable, Oid};

/// One side of a join: geometry derived from the catalog plus the join
/// attribute index.
#[derive(Debug, Clone, Copy)]
struct Side {
    oid: Oid,
    nattrs: usize,
    idx: usize,
    ntuples_per_page: usize,
    npages: u64,
}

impl Side {
    fn new(meta: &TableMeta, idx: usize, page_size: usize) -> Self {
        Self {
            oid: meta.oid,
            nattrs: meta.nattrs,
            idx,
            ntuples_per_page: meta.ntuples_per_page(page_size),
            npages: meta.npages(page_size),
        }
    }
}

/// Equi-join `table1.idx1 == table2.idx2`.
///
/// When the two tables' pages together do not fit in the buffer pool, a
/// block nested-loop join runs with the smaller-paged table as the outer
/// relation; otherwise a bucketed hash join runs with the smaller-paged
/// table as the build side. Either way the result's attribute order follows
/// the caller's argument order, and a join that fails mid-run drops every
/// pin it had taken before the error propagates.
pub fn join(
    catalog: &Catalog,
    pool: &mut BufferPool,
    files: &mut FileTable,
    idx1: usize,
    table1: &str,
    idx2: usize,
    table2: &str,
) -> QueryResult<ResultSet> {
    let meta1 = catalog.table(table1)?;
    if idx1 >= meta1.nattrs {
        return Err(QueryError::AttributeOutOfRange {
            table: table1.to_string(),
            idx: idx1,
            nattrs: meta1.nattrs,
        });
    }
    let meta2 = catalog.table(table2)?;
    if idx2 >= meta2.nattrs {
        return Err(QueryError::AttributeOutOfRange {
            table: table2.to_string(),
            idx: idx2,
            nattrs: meta2.nattrs,
        });
    }

    let side1 = Side::new(meta1, idx1, catalog.page_size);
    let side2 = Side::new(meta2, idx2, catalog.page_size);
    let total_pages = side1.npages + side2.npages;

    // the smaller table drives the cheaper side of either algorithm; the
    // flag remembers whose attributes the caller asked for first
    let (small, large, small_is_first_arg) = if side1.npages < side2.npages {
        (side1, side2, true)
    } else {
        (side2, side1, false)
    };

    if (pool.nslots() as u64) < total_pages {
        debug!("join {table1}/{table2}: block nested loop, {total_pages} total pages");
        nested_loop_join(pool, files, &small, &large, small_is_first_arg)
    } else {
        debug!("join {table1}/{table2}: hash join, {total_pages} total pages");
        hash_join(pool, files, &small, &large, small_is_first_arg)
    }
}

/// Append one joined tuple, honoring the caller's attribute order.
fn emit(result: &mut ResultSet, small: &[i32], large: &[i32], small_first: bool) {
    let mut tuple = Vec::with_capacity(small.len() + large.len());
    if small_first {
        tuple.extend_from_slice(small);
        tuple.extend_from_slice(large);
    } else {
        tuple.extend_from_slice(large);
        tuple.extend_from_slice(small);
    }
    result.push(tuple);
}

/// Block nested-loop join: outer pages are pinned in blocks of
/// `nslots - 1`, leaving one slot free for the inner relation's current
/// page; each full block is matched against one complete scan of the inner
/// relation before its pins are dropped.
fn nested_loop_join(
    pool: &mut BufferPool,
    files: &mut FileTable,
    outer: &Side,
    inner: &Side,
    outer_first: bool,
) -> QueryResult<ResultSet> {
    // a failure mid-scan must not leave a partially built block pinned
    let scanned = nested_loop_scan(pool, files, outer, inner, outer_first);
    if scanned.is_err() {
        release_block(pool, outer.oid);
    }
    scanned
}

fn nested_loop_scan(
    pool: &mut BufferPool,
    files: &mut FileTable,
    outer: &Side,
    inner: &Side,
    outer_first: bool,
) -> QueryResult<ResultSet> {
    let outer_pids = pool.page_ids(files, outer.oid, outer.npages)?;
    let inner_pids = pool.page_ids(files, inner.oid, inner.npages)?;

    let mut result = ResultSet::new(outer.nattrs + inner.nattrs);
    let block = pool.nslots() - 1;

    for (i, &pid) in outer_pids.iter().enumerate() {
        pool.fetch(
            files,
            pid,
            outer.oid,
            outer.ntuples_per_page,
            outer.nattrs,
            outer.npages,
        )?;

        // keep pinning outer pages until the block is full
        if i % block != block - 1 {
            continue;
        }

        probe_pinned_block(pool, files, outer, inner, &inner_pids, outer_first, &mut result)?;
        release_block(pool, outer.oid);
    }

    // a final partial block shows up as outer pages still pinned in the pool
    let leftover = pool
        .frames()
        .any(|f| f.oid() == Some(outer.oid) && f.pin_count() > 0);
    if leftover {
        probe_pinned_block(pool, files, outer, inner, &inner_pids, outer_first, &mut result)?;
        release_block(pool, outer.oid);
    }

    Ok(result)
}

/// Scan the whole inner relation once, matching every inner tuple against
/// every tuple of the outer pages currently pinned in the pool.
fn probe_pinned_block(
    pool: &mut BufferPool,
    files: &mut FileTable,
    outer: &Side,
    inner: &Side,
    inner_pids: &[PageId],
    outer_first: bool,
    result: &mut ResultSet,
) -> QueryResult<()> {
    for &pid in inner_pids {
        let inner_slot = pool.fetch(
            files,
            pid,
            inner.oid,
            inner.ntuples_per_page,
            inner.nattrs,
            inner.npages,
        )?;

        for t in 0..pool.frame(inner_slot).ntuples() {
            for slot in 0..pool.nslots() {
                let outer_frame = pool.frame(slot);
                if outer_frame.oid() != Some(outer.oid) || outer_frame.pin_count() == 0 {
                    continue;
                }
                let inner_tuple = pool.frame(inner_slot).tuple(t);
                for o in 0..outer_frame.ntuples() {
                    let outer_tuple = outer_frame.tuple(o);
                    if outer_tuple[outer.idx] == inner_tuple[inner.idx] {
                        emit(result, outer_tuple, inner_tuple, outer_first);
                    }
                }
            }
        }

        pool.release(inner_slot);
    }
    Ok(())
}

/// Drop the single pin held on every still-pinned page of `oid`.
fn release_block(pool: &mut BufferPool, oid: Oid) {
    for slot in 0..pool.nslots() {
        let frame = pool.frame(slot);
        if frame.oid() == Some(oid) && frame.pin_count() > 0 {
            pool.release(slot);
        }
    }
}

/// Fixed-capacity in-memory buckets for the hash join build side, held
/// outside the buffer pool.
///
/// A tuple slot is free iff it is all-zero, mirroring the on-disk sentinel;
/// a genuinely all-zero build tuple is therefore indistinguishable from an
/// empty slot and never matches.
struct Buckets {
    ntable: usize,
    /// Tuple slots per bucket: the build table's tuples-per-page.
    cap: usize,
    nattrs: usize,
    data: Vec<i32>,
}

impl Buckets {
    fn new(ntable: usize, cap: usize, nattrs: usize) -> Self {
        Self {
            ntable,
            cap,
            nattrs,
            data: vec![0; ntable * cap * nattrs],
        }
    }

    fn slot(&self, bucket: usize, i: usize) -> &[i32] {
        let start = (bucket * self.cap + i) * self.nattrs;
        &self.data[start..start + self.nattrs]
    }

    fn is_free(&self, bucket: usize, i: usize) -> bool {
        self.slot(bucket, i).iter().all(|&v| v == 0)
    }

    /// Next free tuple slot in `bucket`, searching from the high end.
    fn free_slot(&self, bucket: usize) -> Option<usize> {
        (0..self.cap).rev().find(|&i| self.is_free(bucket, i))
    }

    fn is_full(&self, bucket: usize) -> bool {
        self.free_slot(bucket).is_none()
    }

    fn insert(&mut self, bucket: usize, tuple: &[i32]) {
        let i = self
            .free_slot(bucket)
            .expect("bucket has a free slot after flush");
        let start = (bucket * self.cap + i) * self.nattrs;
        self.data[start..start + self.nattrs].copy_from_slice(tuple);
    }

    fn clear(&mut self, bucket: usize) {
        let start = bucket * self.cap * self.nattrs;
        let end = start + self.cap * self.nattrs;
        self.data[start..end].fill(0);
    }

    fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// Occupied tuple slots of `bucket`.
    fn occupied(&self, bucket: usize) -> impl Iterator<Item = &[i32]> {
        (0..self.cap)
            .filter(move |&i| !self.is_free(bucket, i))
            .map(move |i| self.slot(bucket, i))
    }
}

/// Bucket index of a join key. Euclidean remainder keeps negative keys in
/// range.
fn bucket_of(key: i32, ntable: usize) -> usize {
    (key as i64).rem_euclid(ntable as i64) as usize
}

/// Bucketed hash join with bounded build storage.
///
/// Build pages are fetched one at a time and their tuples hashed into
/// `nslots - 2` buckets of fixed capacity. A full bucket is flushed at
/// once: the entire probe side is scanned against that single bucket, the
/// bucket is cleared, and building continues. Buckets still holding tuples
/// after the build side is exhausted get one more probe pass. In-memory
/// storage never exceeds `ntable * ntuples_per_page(build)` tuples, at the
/// cost of one extra probe-side scan per overflow.
fn hash_join(
    pool: &mut BufferPool,
    files: &mut FileTable,
    build: &Side,
    probe: &Side,
    build_first: bool,
) -> QueryResult<ResultSet> {
    let build_pids = pool.page_ids(files, build.oid, build.npages)?;
    let probe_pids = pool.page_ids(files, probe.oid, probe.npages)?;

    let ntable = pool.nslots() - 2;
    let mut buckets = Buckets::new(ntable, build.ntuples_per_page, build.nattrs);
    let mut result = ResultSet::new(build.nattrs + probe.nattrs);

    for &pid in &build_pids {
        let slot = pool.fetch(
            files,
            pid,
            build.oid,
            build.ntuples_per_page,
            build.nattrs,
            build.npages,
        )?;

        for t in 0..pool.frame(slot).ntuples() {
            // copied out: flushing a bucket fetches probe pages, which
            // needs the pool mutably
            let tuple = pool.frame(slot).tuple(t).to_vec();
            let bucket = bucket_of(tuple[build.idx], ntable);

            if buckets.is_full(bucket) {
                debug!("hash join: bucket {bucket} full, flushing against probe side");
                let flushed = probe_buckets(
                    pool,
                    files,
                    &buckets,
                    Some(bucket),
                    build,
                    probe,
                    &probe_pids,
                    build_first,
                    &mut result,
                );
                if let Err(e) = flushed {
                    // the build page's pin must not outlive a failed flush
                    pool.release(slot);
                    return Err(e);
                }
                buckets.clear(bucket);
            }
            buckets.insert(bucket, &tuple);
        }

        pool.release(slot);
    }

    // epilogue: whatever is still sitting in the buckets gets one more pass
    if !buckets.is_empty() {
        probe_buckets(
            pool,
            files,
            &buckets,
            None,
            build,
            probe,
            &probe_pids,
            build_first,
            &mut result,
        )?;
    }

    Ok(result)
}

/// Scan the whole probe side once against the buckets. With `only` set,
/// probe tuples are matched against that single bucket; otherwise each
/// probe tuple is matched against the bucket its own key hashes to.
#[allow(clippy::too_many_arguments)]
fn probe_buckets(
    pool: &mut BufferPool,
    files: &mut FileTable,
    buckets: &Buckets,
    only: Option<usize>,
    build: &Side,
    probe: &Side,
    probe_pids: &[PageId],
    build_first: bool,
    result: &mut ResultSet,
) -> QueryResult<()> {
    for &pid in probe_pids {
        let slot = pool.fetch(
            files,
            pid,
            probe.oid,
            probe.ntuples_per_page,
            probe.nattrs,
            probe.npages,
        )?;

        for t in 0..pool.frame(slot).ntuples() {
            let probe_tuple = pool.frame(slot).tuple(t);
            let bucket = bucket_of(probe_tuple[probe.idx], buckets.ntable);
            if only.is_some_and(|b| b != bucket) {
                continue;
            }
            for build_tuple in buckets.occupied(bucket) {
                if build_tuple[build.idx] == probe_tuple[probe.idx] {
                    emit(result, build_tuple, probe_tuple, build_first);
                }
            }
        }

        pool.release(slot);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_of_negative_keys() {
        assert_eq!(bucket_of(7, 5), 2);
        assert_eq!(bucket_of(-7, 5), 3);
        assert_eq!(bucket_of(0, 5), 0);
        assert_eq!(bucket_of(i32::MIN, 7), 5);
    }

    #[test]
    fn test_buckets_insert_and_flush() {
        let mut buckets = Buckets::new(3, 2, 2);
        assert!(buckets.is_empty());

        buckets.insert(1, &[4, 5]);
        buckets.insert(1, &[7, 8]);
        assert!(buckets.is_full(1));
        assert!(!buckets.is_full(0));
        assert_eq!(buckets.occupied(1).count(), 2);

        buckets.clear(1);
        assert!(buckets.is_empty());
        assert_eq!(buckets.occupied(1).count(), 0);
    }

    #[test]
    fn test_buckets_fill_from_high_end() {
        let mut buckets = Buckets::new(2, 3, 1);
        buckets.insert(0, &[9]);
        assert!(buckets.is_free(0, 0));
        assert!(buckets.is_free(0, 1));
        assert!(!buckets.is_free(0, 2));
    }
}
