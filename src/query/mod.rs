mod error;
mod join;
mod select;

pub use error::{QueryError, QueryResult};
pub use join::join;
pub use select::select;

/// Materialized operator result, owned by the caller.
///
/// Tuples are accumulated in a growable heap buffer, in page-visitation
/// order and then in-page storage order, so results are deterministic for a
/// fixed file.
#[derive(Debug)]
pub struct ResultSet {
    nattrs: usize,
    tuples: Vec<Vec<i32>>,
}

impl ResultSet {
    pub(crate) fn new(nattrs: usize) -> Self {
        Self {
            nattrs,
            tuples: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, tuple: Vec<i32>) {
        self.tuples.push(tuple);
    }

    pub fn nattrs(&self) -> usize {
        self.nattrs
    }

    pub fn ntuples(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn tuples(&self) -> &[Vec<i32>] {
        &self.tuples
    }
}

impl IntoIterator for ResultSet {
    type Item = Vec<i32>;
    type IntoIter = std::vec::IntoIter<Vec<i32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.into_iter()
    }
}
