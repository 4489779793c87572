mod compressed;
mod simple;

use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    ctx::RainbowTableCtx,
    error::{CrackalackError, CrackalackResult},
    table_name::{TableFormat, TableName},
    PlaintextIndex,
};

pub use {compressed::CompressedTable, simple::SimpleTable};

/// A chain of the rainbow table, made of a startpoint and an endpoint.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
pub struct RainbowChain {
    pub startpoint: PlaintextIndex,
    pub endpoint: PlaintextIndex,
}

/// Trait that data structures implement to be used as rainbow tables.
/// The chains of a table are indexed from 0 and are expected to be sorted by endpoint
/// when the table is used for lookups.
pub trait RainbowTable: Sized + Sync {
    /// Returns the number of chains stored in the table.
    fn len(&self) -> usize;

    /// Returns true if the table is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the chain at index `i`.
    fn chain(&self, i: usize) -> RainbowChain;

    /// Returns the endpoint of the chain at index `i`.
    #[inline]
    fn endpoint(&self, i: usize) -> PlaintextIndex {
        self.chain(i).endpoint
    }

    /// Returns the context.
    fn ctx(&self) -> &RainbowTableCtx;

    /// Returns an iterator over the chains of the table, in storage order.
    fn iter(&self) -> ChainIter<'_, Self> {
        ChainIter {
            table: self,
            range: 0..self.len(),
        }
    }

    /// Returns the index of the first chain whose endpoint is not lower than `endpoint`,
    /// looking only at the chains from `from` onwards.
    fn lower_bound(&self, endpoint: PlaintextIndex, from: usize) -> usize {
        let mut low = from;
        let mut high = self.len();

        while low < high {
            let mid = low + (high - low) / 2;
            if self.endpoint(mid) < endpoint {
                low = mid + 1;
            } else {
                high = mid;
            }
        }

        low
    }

    /// Searches the endpoints for a plaintext index.
    /// Returns every chain ending with this index, since endpoints may be duplicated.
    fn search_endpoints(&self, endpoint: PlaintextIndex) -> Vec<RainbowChain> {
        (self.lower_bound(endpoint, 0)..self.len())
            .map(|i| self.chain(i))
            .take_while(|chain| chain.endpoint == endpoint)
            .collect()
    }

    /// Makes sure the table can be used for lookups.
    /// The endpoints must be non-zero and sorted in ascending order.
    fn check_sorted(&self, path: &Path) -> CrackalackResult<()> {
        let mut last_endpoint = 0;

        for (i, chain) in self.iter().enumerate() {
            if chain.endpoint == 0 {
                return Err(CrackalackError::Format {
                    path: path.to_owned(),
                    reason: format!("chain {i} has a zero end index"),
                });
            }

            if chain.endpoint < last_endpoint {
                return Err(CrackalackError::Format {
                    path: path.to_owned(),
                    reason: "table is not sorted".to_owned(),
                });
            }

            last_endpoint = chain.endpoint;
        }

        Ok(())
    }

    /// Returns a new rainbow table created from the table passed as a parameter.
    fn from_rainbow_table<T: RainbowTable>(table: &T) -> Self;

    /// Stores this rainbow table to the given path.
    fn store(&self, path: &Path) -> CrackalackResult<()>;

    /// Loads the rainbow table at the given path, using the parameters of its name.
    fn load(path: &Path, table_name: &TableName) -> CrackalackResult<Self>;
}

/// An iterator over the chains of a rainbow table.
pub struct ChainIter<'a, T: RainbowTable> {
    table: &'a T,
    range: Range<usize>,
}

impl<T: RainbowTable> Iterator for ChainIter<'_, T> {
    type Item = RainbowChain;

    fn next(&mut self) -> Option<Self::Item> {
        self.range.next().map(|i| self.table.chain(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl<T: RainbowTable> ExactSizeIterator for ChainIter<'_, T> {}

/// A table opened for a lookup, in either of its representations.
pub enum TableHandle {
    Simple(SimpleTable),
    Compressed(CompressedTable),
}

impl TableHandle {
    /// Returns the number of chains of the table.
    pub fn len(&self) -> usize {
        match self {
            Self::Simple(table) => table.len(),
            Self::Compressed(table) => table.len(),
        }
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Opens the table at the given path and makes sure it can be used for lookups.
pub fn open_table(path: &Path, table_name: &TableName) -> CrackalackResult<TableHandle> {
    let handle = match table_name.format {
        TableFormat::Raw => {
            let table = SimpleTable::load(path, table_name)?;
            table.check_sorted(path)?;
            TableHandle::Simple(table)
        }
        TableFormat::Compressed => {
            let table = CompressedTable::load(path, table_name)?;
            table.check_sorted(path)?;
            TableHandle::Compressed(table)
        }
    };

    debug!(path = %path.display(), chains = handle.len(), "opened table");

    Ok(handle)
}

/// Finds all the rainbow tables below the given directory, recursively.
/// Files with a table extension but an unparsable name are ignored.
/// The tables are returned sorted by path.
pub fn find_tables(dir: &Path) -> CrackalackResult<Vec<(PathBuf, TableName)>> {
    let mut tables = Vec::new();
    let mut dirs = vec![dir.to_owned()];

    while let Some(dir) = dirs.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();

            if path.is_dir() {
                dirs.push(path);
                continue;
            }

            let is_table = path
                .extension()
                .is_some_and(|extension| extension == "rt" || extension == "rtc");

            if !is_table {
                continue;
            }

            match TableName::from_path(&path) {
                Ok(table_name) => tables.push((path, table_name)),
                Err(err) => debug!(path = %path.display(), %err, "ignoring file"),
            }
        }
    }

    tables.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    Ok(tables)
}
