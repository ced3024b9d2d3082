//! Shared fixtures: writing table files in the engine's page format.

use std::fs;
use std::path::Path;

use crate::buffer::{PAGE_ID_SIZE, PageId};
use crate::catalog::TableMeta;
use crate::file::Oid;

/// Write a table file page by page: each page is `page_size` bytes, an
/// 8-byte little-endian page id followed by fixed-width i32 tuples, with
/// trailing zeros (the first all-zero tuple ends the page).
pub(crate) fn write_table_file(
    dir: &Path,
    oid: Oid,
    page_size: usize,
    nattrs: usize,
    pages: &[(PageId, Vec<Vec<i32>>)],
) {
    let mut bytes = Vec::with_capacity(pages.len() * page_size);
    for (pid, tuples) in pages {
        let mut page = vec![0u8; page_size];
        page[..PAGE_ID_SIZE].copy_from_slice(&pid.to_le_bytes());
        let mut offset = PAGE_ID_SIZE;
        for tuple in tuples {
            assert_eq!(tuple.len(), nattrs);
            for value in tuple {
                page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
                offset += 4;
            }
        }
        bytes.extend_from_slice(&page);
    }
    fs::write(dir.join(oid.to_string()), bytes).unwrap();
}

/// Paginate `tuples` in storage order and write the backing file for
/// `meta`, with sequential page ids.
pub(crate) fn write_table(dir: &Path, meta: &TableMeta, page_size: usize, tuples: &[Vec<i32>]) {
    assert_eq!(meta.ntuples, tuples.len());
    let per_page = meta.ntuples_per_page(page_size);
    let mut pages: Vec<(PageId, Vec<Vec<i32>>)> = tuples
        .chunks(per_page)
        .enumerate()
        .map(|(i, chunk)| (i as PageId, chunk.to_vec()))
        .collect();
    if pages.is_empty() {
        pages.push((0, Vec::new()));
    }
    write_table_file(dir, meta.oid, page_size, meta.nattrs, &pages);
}
