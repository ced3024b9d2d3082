use log::debug;

use super::error::{QueryError, QueryResult};
use super::ResultSet;
use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::file::FileTable;

/// Full-table equality scan: every tuple of `table_name` whose `idx`-th
/// attribute equals `value`.
///
/// Pages are visited in file-scan order and each page is released as soon
/// as its resident tuples have been checked, so the scan holds at most one
/// pin at a time.
pub fn select(
    catalog: &Catalog,
    pool: &mut BufferPool,
    files: &mut FileTable,
    idx: usize,
    value: i32,
    table_name: &str,
) -> QueryResult<ResultSet> {
    let meta = catalog.table(table_name)?;
    if idx >= meta.nattrs {
        return Err(QueryError::AttributeOutOfRange {
            table: table_name.to_string(),
            idx,
            nattrs: meta.nattrs,
        });
    }

    let ntuples_per_page = meta.ntuples_per_page(catalog.page_size);
    let npages = meta.npages(catalog.page_size);
    let page_ids = pool.page_ids(files, meta.oid, npages)?;
    debug!("select on {table_name}: scanning {npages} page(s)");

    let mut result = ResultSet::new(meta.nattrs);
    for pid in page_ids {
        let slot = pool.fetch(files, pid, meta.oid, ntuples_per_page, meta.nattrs, npages)?;
        let frame = pool.frame(slot);
        for i in 0..frame.ntuples() {
            let tuple = frame.tuple(i);
            if tuple[idx] == value {
                result.push(tuple.to_vec());
            }
        }
        pool.release(slot);
    }

    Ok(result)
}
