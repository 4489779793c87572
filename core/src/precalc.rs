//! Precomputation of the endpoints a target hash would reach in every column of a table.
//!
//! The precomputed endpoints are persisted in the precalc directory as pairs of files:
//! `rcracki.precalc.N` holds the endpoints as little-endian u64 in column order, and
//! `rcracki.precalc.N.index` holds the key `{parameter key}:{hash}\n` they were computed
//! for. The index file is written last, so a body without its index is a leftover of an
//! interrupted run.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::{
    cpu::project_endpoint,
    ctx::RainbowTableCtx,
    error::{CrackalackError, CrackalackResult},
    Digest, PlaintextIndex, IO_BUFFER_CAPACITY,
};

/// The prefix of every precalc file.
const PRECALC_PREFIX: &str = "rcracki.precalc.";

/// The number of precalc slots available in a directory.
pub const PRECALC_SLOTS: u32 = 1 << 20;

/// Computes the endpoint reached from every column for the given target digest.
/// The endpoint of column `i` is at index `i`, for the `t - 1` first columns.
pub fn precompute(ctx: &RainbowTableCtx, digest: &[u8]) -> Vec<PlaintextIndex> {
    // we use Range<usize> because Range<u64> doesn't implement IndexedParallelIterator.
    (0..ctx.t as usize - 1)
        .into_par_iter()
        .map_init(
            || Digest::with_capacity(ctx.hash_function.digest_size()),
            |buffer, position| project_endpoint(digest, position as u64, ctx, buffer),
        )
        .collect()
}

/// Returns the key stored in the index file of a precalc pair.
fn index_key(ctx: &RainbowTableCtx, hash: &str) -> String {
    format!("{}:{}\n", ctx.parameter_key(), hash)
}

/// The kind of a file found in the precalc directory.
enum PrecalcFile {
    Body(u32),
    Index(u32),
    Temporary,
}

impl PrecalcFile {
    fn parse(file_name: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(PRECALC_PREFIX)?;
        let (slot, kind) = match rest.split_once('.') {
            None => (rest, None),
            Some((slot, extension)) => (slot, Some(extension)),
        };

        let slot: u32 = slot.parse().ok().filter(|&slot| slot < PRECALC_SLOTS)?;

        match kind {
            None => Some(Self::Body(slot)),
            Some("index") => Some(Self::Index(slot)),
            Some("index.tmp") => Some(Self::Temporary),
            Some(_) => None,
        }
    }
}

/// Removes a file, ignoring it if it does not exist.
fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

/// The persisted precomputed endpoints, one pair of files per target hash and parameter key.
#[derive(Debug)]
pub struct PrecalcStore {
    dir: PathBuf,
    /// The committed slots with the key of their index file.
    slots: BTreeMap<u32, String>,
}

impl PrecalcStore {
    /// Opens the precalc directory, creating it if needed.
    /// Leftovers of an interrupted run are removed.
    pub fn open(dir: &Path) -> CrackalackResult<Self> {
        fs::create_dir_all(dir)?;

        let mut bodies = Vec::new();
        let mut indices = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file) = file_name.to_str().and_then(PrecalcFile::parse) else {
                continue;
            };

            match file {
                PrecalcFile::Body(slot) => bodies.push(slot),
                PrecalcFile::Index(slot) => indices.push(slot),
                PrecalcFile::Temporary => {
                    debug!(path = %entry.path().display(), "removing temporary precalc index");
                    remove_if_exists(&entry.path())?;
                }
            }
        }

        let mut store = Self {
            dir: dir.to_owned(),
            slots: BTreeMap::new(),
        };

        for &slot in &bodies {
            if !indices.contains(&slot) {
                warn!(slot, "removing precalc file without index");
                remove_if_exists(&store.body_path(slot))?;
            }
        }

        for slot in indices {
            let index_path = store.index_path(slot);

            if !bodies.contains(&slot) {
                warn!(slot, "removing precalc index without body");
                remove_if_exists(&index_path)?;
                continue;
            }

            match fs::read_to_string(&index_path) {
                Ok(key) => {
                    store.slots.insert(slot, key);
                }
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    warn!(slot, "removing precalc pair with a malformed index");
                    store.remove_slot(slot)?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        debug!(dir = %dir.display(), pairs = store.slots.len(), "opened precalc store");

        Ok(store)
    }

    /// Returns the directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the body of a slot.
    pub fn body_path(&self, slot: u32) -> PathBuf {
        self.dir.join(format!("{PRECALC_PREFIX}{slot}"))
    }

    /// Returns the path of the index of a slot.
    pub fn index_path(&self, slot: u32) -> PathBuf {
        self.dir.join(format!("{PRECALC_PREFIX}{slot}.index"))
    }

    /// Returns the number of committed pairs.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no pair is committed.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the slot holding the endpoints of the given hash, if any.
    pub fn slot(&self, ctx: &RainbowTableCtx, hash: &str) -> Option<u32> {
        let key = index_key(ctx, hash);
        self.slots
            .iter()
            .find(|(_, slot_key)| **slot_key == key)
            .map(|(&slot, _)| slot)
    }

    /// Loads the endpoints previously computed for the given hash.
    /// A pair with a body of the wrong size is discarded.
    pub fn find(
        &mut self,
        ctx: &RainbowTableCtx,
        hash: &str,
    ) -> CrackalackResult<Option<Vec<PlaintextIndex>>> {
        let Some(slot) = self.slot(ctx, hash) else {
            return Ok(None);
        };

        let path = self.body_path(slot);
        match self.read_body(&path, ctx) {
            Ok(endpoints) => {
                trace!(slot, hash, "loaded precalc");
                Ok(Some(endpoints))
            }
            Err(CrackalackError::Format { reason, .. }) => {
                warn!(slot, hash, %reason, "discarding malformed precalc pair");
                self.remove_slot(slot)?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn read_body(
        &self,
        path: &Path,
        ctx: &RainbowTableCtx,
    ) -> CrackalackResult<Vec<PlaintextIndex>> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let expected = 8 * (ctx.t - 1);

        if size != expected {
            return Err(CrackalackError::Format {
                path: path.to_owned(),
                reason: format!("expected {expected} bytes, found {size}"),
            });
        }

        let mut buf_reader = BufReader::with_capacity(IO_BUFFER_CAPACITY, file);
        let mut endpoints = Vec::with_capacity(ctx.t as usize - 1);
        for _ in 0..ctx.t - 1 {
            endpoints.push(buf_reader.read_u64::<LittleEndian>()?);
        }

        Ok(endpoints)
    }

    /// Persists the endpoints computed for the given hash in the first free slot.
    /// Returns the slot used.
    pub fn create(
        &mut self,
        ctx: &RainbowTableCtx,
        hash: &str,
        endpoints: &[PlaintextIndex],
    ) -> CrackalackResult<u32> {
        for slot in 0..PRECALC_SLOTS {
            if self.slots.contains_key(&slot) {
                continue;
            }

            let body = match File::options()
                .write(true)
                .create_new(true)
                .open(self.body_path(slot))
            {
                Ok(body) => body,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };

            let mut buf_writer = BufWriter::with_capacity(IO_BUFFER_CAPACITY, body);
            for &endpoint in endpoints {
                buf_writer.write_u64::<LittleEndian>(endpoint)?;
            }
            buf_writer
                .into_inner()
                .map_err(|err| err.into_error())?
                .sync_all()?;

            // the index commits the pair
            let key = index_key(ctx, hash);
            let index_path = self.index_path(slot);
            let mut tmp_path = index_path.clone().into_os_string();
            tmp_path.push(".tmp");

            let mut index = File::create(&tmp_path)?;
            index.write_all(key.as_bytes())?;
            index.sync_all()?;
            fs::rename(&tmp_path, &index_path)?;

            debug!(slot, hash, "stored precalc");
            self.slots.insert(slot, key);

            return Ok(slot);
        }

        Err(CrackalackError::PrecalcSlots)
    }

    /// Removes the pair holding the endpoints of the given hash.
    /// Returns false if there was none.
    pub fn remove(&mut self, ctx: &RainbowTableCtx, hash: &str) -> CrackalackResult<bool> {
        match self.slot(ctx, hash) {
            Some(slot) => {
                debug!(slot, hash, "removing precalc");
                self.remove_slot(slot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes the pairs of a hash under every parameter key.
    /// Returns the number of pairs removed.
    pub fn remove_hash(&mut self, hash: &str) -> CrackalackResult<usize> {
        let suffix = format!(":{hash}\n");
        let slots = self
            .slots
            .iter()
            .filter(|(_, key)| key.ends_with(&suffix))
            .map(|(&slot, _)| slot)
            .collect_vec();

        for &slot in &slots {
            debug!(slot, hash, "removing precalc");
            self.remove_slot(slot)?;
        }

        Ok(slots.len())
    }

    /// Removes the pairs of the given hashes for a parameter key that is not used anymore.
    /// Returns the number of pairs removed.
    pub fn invalidate<'a>(
        &mut self,
        ctx: &RainbowTableCtx,
        hashes: impl IntoIterator<Item = &'a str>,
    ) -> CrackalackResult<usize> {
        let mut removed = 0;
        for hash in hashes {
            if self.remove(ctx, hash)? {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(key = %ctx.parameter_key(), removed, "invalidated precalc");
        }

        Ok(removed)
    }

    fn remove_slot(&mut self, slot: u32) -> CrackalackResult<()> {
        // without its index, a body is an orphan, so the index goes first
        remove_if_exists(&self.index_path(slot))?;
        remove_if_exists(&self.body_path(slot))?;
        self.slots.remove(&slot);

        Ok(())
    }
}

/// A precomputed endpoint, with the column and the target it comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Candidate {
    pub endpoint: PlaintextIndex,
    pub target: usize,
    pub position: u64,
}

/// The precomputed endpoints of every outstanding target, sorted by endpoint so that
/// they can be merged against the sorted endpoints of a table.
#[derive(Clone, Debug, Default)]
pub struct CandidateIndex {
    candidates: Vec<Candidate>,
}

impl CandidateIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the endpoints precomputed for a target.
    /// The index has to be sorted before being used.
    pub fn extend(&mut self, target: usize, endpoints: &[PlaintextIndex]) {
        self.candidates
            .extend(endpoints.iter().enumerate().map(|(position, &endpoint)| Candidate {
                endpoint,
                target,
                position: position as u64,
            }));
    }

    /// Sorts the candidates by endpoint.
    pub fn sort(&mut self) {
        self.candidates.par_sort_unstable();
    }

    /// Removes the candidates of a target.
    pub fn remove_target(&mut self, target: usize) {
        self.candidates.retain(|candidate| candidate.target != target);
    }

    /// Returns the number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if there is no candidate.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Returns an iterator over the candidates, sorted by endpoint once the index is sorted.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}
