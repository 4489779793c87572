//! The lookup of hashes in a directory of rainbow tables.

use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    ctx::RainbowTableCtx,
    error::{CrackalackError, CrackalackResult},
    pot::PotFile,
    precalc::{precompute, CandidateIndex, PrecalcStore},
    rainbow_table::{find_tables, open_table, RainbowTable, TableHandle},
    table_name::TableName,
    target::TargetHash,
    verify::{verify_candidate, Verification},
    Digest, Password, PlaintextIndex,
};

/// The number of loaded tables waiting to be searched, besides the one being loaded.
const PRELOADED_TABLES: usize = 1;

/// A builder for a lookup configuration.
#[derive(Clone, Debug)]
pub struct LookupConfigBuilder {
    table_dir: PathBuf,
    precalc_dir: PathBuf,
    pot_path: Option<PathBuf>,
}

impl Default for LookupConfigBuilder {
    fn default() -> Self {
        Self {
            table_dir: PathBuf::from("."),
            precalc_dir: PathBuf::from("."),
            pot_path: None,
        }
    }
}

impl LookupConfigBuilder {
    /// Creates a new LookupConfigBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory searched recursively for tables.
    pub fn table_dir(mut self, table_dir: impl Into<PathBuf>) -> Self {
        self.table_dir = table_dir.into();

        self
    }

    /// Sets the directory where the precomputed endpoints are persisted.
    pub fn precalc_dir(mut self, precalc_dir: impl Into<PathBuf>) -> Self {
        self.precalc_dir = precalc_dir.into();

        self
    }

    /// Sets the John the Ripper pot file.
    /// The hashcat pot file is stored next to it, with a `.hashcat` extension.
    pub fn pot(mut self, pot_path: impl Into<PathBuf>) -> Self {
        self.pot_path = Some(pot_path.into());

        self
    }

    /// Builds a LookupConfig with the specified parameters.
    pub fn build(self) -> CrackalackResult<LookupConfig> {
        if !self.table_dir.is_dir() {
            return Err(CrackalackError::NoTables(self.table_dir));
        }

        Ok(LookupConfig {
            table_dir: self.table_dir,
            precalc_dir: self.precalc_dir,
            pot_path: self.pot_path,
        })
    }
}

/// The configuration of a lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupConfig {
    /// The directory searched recursively for tables.
    pub table_dir: PathBuf,
    /// The directory where the precomputed endpoints are persisted.
    pub precalc_dir: PathBuf,
    /// The John the Ripper pot file, or the default pot files if `None`.
    pub pot_path: Option<PathBuf>,
}

/// What happened during a lookup.
#[derive(Clone, Debug, Default)]
pub struct LookupReport {
    /// The number of distinct hashes loaded.
    pub loaded: usize,
    /// The hashes found in the pot file before the lookup, with their plaintext.
    pub previously_cracked: Vec<(String, Vec<u8>)>,
    /// The hashes cracked during the lookup, in crack order.
    pub cracked: Vec<(String, Password)>,
    /// The hashes still not cracked.
    pub outstanding: Vec<String>,
    /// The number of tables searched.
    pub tables_processed: usize,
    /// The number of tables that could not be used.
    pub tables_skipped: usize,
    /// The number of chains of the tables searched.
    pub chains_processed: u64,
    /// The number of matching endpoints whose chain was regenerated.
    pub alarms_checked: u64,
    /// The number of regenerated chains that did not contain the hash.
    pub false_alarms: u64,
    /// The number of endpoints precomputed.
    pub indices_computed: u64,
    /// The number of endpoints loaded from the precalc directory.
    pub indices_loaded: u64,
    pub time_precomputing: Duration,
    pub time_io: Duration,
    pub time_searching: Duration,
    pub time_false_alarms: Duration,
}

impl LookupReport {
    /// Returns true if every loaded hash is cracked.
    pub fn is_complete(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Returns the time spent computing, without the table I/O.
    pub fn total_time(&self) -> Duration {
        self.time_precomputing + self.time_searching + self.time_false_alarms
    }
}

/// A chain whose endpoint matched a precomputed endpoint of a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Alarm {
    target: usize,
    position: u64,
    startpoint: PlaintextIndex,
}

/// Merges the sorted candidates against the sorted endpoints of the table.
fn search_table<T: RainbowTable>(table: &T, candidates: &CandidateIndex) -> Vec<Alarm> {
    let mut alarms = Vec::new();
    let mut cursor = 0;

    for candidate in candidates.iter() {
        cursor = table.lower_bound(candidate.endpoint, cursor);

        alarms.extend(
            (cursor..table.len())
                .map(|i| table.chain(i))
                .take_while(|chain| chain.endpoint == candidate.endpoint)
                .map(|chain| Alarm {
                    target: candidate.target,
                    position: candidate.position,
                    startpoint: chain.startpoint,
                }),
        );
    }

    alarms
}

/// The tables sharing a parameter key.
struct TableGroup {
    ctx: RainbowTableCtx,
    tables: Vec<(PathBuf, TableName)>,
}

/// A lookup of hashes in a directory of rainbow tables.
pub struct Lookup {
    config: LookupConfig,
    pot: PotFile,
}

impl Lookup {
    /// Creates a new lookup, opening the pot files.
    pub fn new(config: LookupConfig) -> CrackalackResult<Self> {
        let pot = PotFile::open(config.pot_path.as_deref())?;

        Ok(Self { config, pot })
    }

    /// Returns the pot files of the lookup.
    pub fn pot(&self) -> &PotFile {
        &self.pot
    }

    /// Discovers the tables and groups them by parameter key.
    /// Groups are sorted by key and tables by path.
    fn table_groups(&self, report: &mut LookupReport) -> CrackalackResult<Vec<TableGroup>> {
        let table_dir = &self.config.table_dir;
        let tables = find_tables(table_dir)?;
        if tables.is_empty() {
            return Err(CrackalackError::NoTables(table_dir.clone()));
        }

        let mut first_error = None;
        let mut usable = Vec::with_capacity(tables.len());

        for (path, table_name) in tables {
            match table_name.ctx() {
                Ok(ctx) => usable.push((ctx.parameter_key(), ctx, path, table_name)),
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping table");
                    report.tables_skipped += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        if usable.is_empty() {
            return Err(
                first_error.unwrap_or_else(|| CrackalackError::NoTables(table_dir.clone())),
            );
        }

        usable.sort_by(|(a_key, _, a_path, _), (b_key, _, b_path, _)| {
            a_key.cmp(b_key).then_with(|| a_path.cmp(b_path))
        });

        let groups = usable
            .into_iter()
            .chunk_by(|(key, ..)| key.clone())
            .into_iter()
            .filter_map(|(_, group)| {
                let mut group = group.peekable();
                let ctx = group.peek()?.1.clone();
                let tables = group.map(|(_, _, path, table_name)| (path, table_name)).collect();

                Some(TableGroup { ctx, tables })
            })
            .collect();

        Ok(groups)
    }

    /// Cracks as many hashes as possible.
    /// Hashes must be lowercase and distinct, as returned by [`crate::target::read_hashes`].
    pub fn run(&mut self, hashes: &[String]) -> CrackalackResult<LookupReport> {
        let mut report = LookupReport {
            loaded: hashes.len(),
            ..Default::default()
        };

        let mut outstanding = Vec::with_capacity(hashes.len());
        for hash in hashes {
            match self.pot.plaintext(hash) {
                Some(plaintext) => report
                    .previously_cracked
                    .push((hash.clone(), plaintext.to_vec())),
                None => outstanding.push(hash.clone()),
            }
        }

        if outstanding.is_empty() {
            // a directory that does not exist holds no pairs to clean up
            if self.config.precalc_dir.is_dir() {
                let mut store = PrecalcStore::open(&self.config.precalc_dir)?;
                forget_cracked(&mut store, &report)?;
            }

            info!(hashes = hashes.len(), "every hash is already cracked");
            return Ok(report);
        }

        let groups = self.table_groups(&mut report)?;

        // every hash has to be crackable by at least one group of tables
        for hash in &outstanding {
            let parsed = groups
                .iter()
                .map(|group| TargetHash::parse(hash, group.ctx.hash_function))
                .find_or_last(Result::is_ok);

            if let Some(Err(err)) = parsed {
                return Err(err);
            }
        }

        let mut store = PrecalcStore::open(&self.config.precalc_dir)?;
        forget_cracked(&mut store, &report)?;
        let mut previous_ctx: Option<RainbowTableCtx> = None;

        for group in &groups {
            if outstanding.is_empty() {
                break;
            }

            // the endpoints of the previous parameters are useless from now on
            if let Some(previous_ctx) = previous_ctx.replace(group.ctx.clone()) {
                store.invalidate(&previous_ctx, outstanding.iter().map(String::as_str))?;
            }

            self.crack_group(group, &mut store, &mut outstanding, &mut report)?;
        }

        info!(
            cracked = report.cracked.len(),
            outstanding = outstanding.len(),
            "lookup finished"
        );
        report.outstanding = outstanding;

        Ok(report)
    }

    /// Searches the tables of a group for the outstanding hashes.
    fn crack_group(
        &mut self,
        group: &TableGroup,
        store: &mut PrecalcStore,
        outstanding: &mut Vec<String>,
        report: &mut LookupReport,
    ) -> CrackalackResult<()> {
        let ctx = &group.ctx;

        let targets: Vec<TargetHash> = outstanding
            .iter()
            .filter_map(|hash| match TargetHash::parse(hash, ctx.hash_function) {
                Ok(target) => Some(target),
                Err(err) => {
                    debug!(%err, key = %ctx.parameter_key(), "hash does not fit the tables");
                    None
                }
            })
            .collect();

        if targets.is_empty() {
            return Ok(());
        }

        info!(
            key = %ctx.parameter_key(),
            tables = group.tables.len(),
            hashes = targets.len(),
            "searching tables"
        );

        let start = Instant::now();
        let mut candidates = CandidateIndex::new();
        for (i, target) in targets.iter().enumerate() {
            let endpoints = match store.find(ctx, &target.hex)? {
                Some(endpoints) => {
                    report.indices_loaded += endpoints.len() as u64;
                    endpoints
                }
                None => {
                    debug!(hash = %target.hex, "precomputing");
                    let endpoints = precompute(ctx, &target.digest);
                    store.create(ctx, &target.hex, &endpoints)?;
                    report.indices_computed += endpoints.len() as u64;
                    endpoints
                }
            };

            candidates.extend(i, &endpoints);
        }
        candidates.sort();
        report.time_precomputing += start.elapsed();

        let mut cracked = vec![false; targets.len()];

        thread::scope(|scope| -> CrackalackResult<()> {
            let (sender, receiver) = crossbeam_channel::bounded(PRELOADED_TABLES);

            // tables are read from the disk while the previous ones are searched
            scope.spawn(move || {
                for (path, table_name) in &group.tables {
                    let table = open_table(path, table_name);
                    if sender.send((path, table)).is_err() {
                        // the search has stopped
                        break;
                    }
                }
            });

            while !cracked.iter().all(|&cracked| cracked) {
                let start = Instant::now();
                let Ok((path, table)) = receiver.recv() else {
                    break;
                };
                report.time_io += start.elapsed();

                let table = match table {
                    Ok(table) => table,
                    Err(
                        err @ (CrackalackError::Format { .. }
                        | CrackalackError::ParameterMismatch { .. }),
                    ) => {
                        warn!(%err, "skipping table");
                        report.tables_skipped += 1;
                        continue;
                    }
                    Err(err) => return Err(err),
                };

                report.tables_processed += 1;
                report.chains_processed += table.len() as u64;

                let start = Instant::now();
                let alarms = match &table {
                    TableHandle::Simple(table) => search_table(table, &candidates),
                    TableHandle::Compressed(table) => search_table(table, &candidates),
                };
                report.time_searching += start.elapsed();

                let start = Instant::now();
                let verifications: Vec<(Alarm, Verification)> = alarms
                    .into_par_iter()
                    .map_init(
                        || Digest::with_capacity(ctx.hash_function.digest_size()),
                        |buffer, alarm| {
                            let target = &targets[alarm.target].digest;
                            let verification = verify_candidate(
                                ctx,
                                alarm.startpoint,
                                alarm.position,
                                target,
                                buffer,
                            );
                            (alarm, verification)
                        },
                    )
                    .collect();
                report.time_false_alarms += start.elapsed();
                report.alarms_checked += verifications.len() as u64;

                for (alarm, verification) in verifications {
                    let plaintext = match verification {
                        Verification::Cracked(plaintext) => plaintext,
                        Verification::FalseAlarm => {
                            report.false_alarms += 1;
                            continue;
                        }
                    };

                    // several chains may contain the same hash
                    if cracked[alarm.target] {
                        continue;
                    }

                    let target = &targets[alarm.target];
                    info!(
                        hash = %target.hex,
                        plaintext = %String::from_utf8_lossy(&plaintext),
                        table = %path.display(),
                        "cracked"
                    );

                    self.pot.record(&target.hex, &plaintext, ctx.hash_function)?;
                    store.remove_hash(&target.hex)?;
                    candidates.remove_target(alarm.target);
                    outstanding.retain(|hash| *hash != target.hex);
                    cracked[alarm.target] = true;
                    report.cracked.push((target.hex.clone(), plaintext));
                }
            }

            Ok(())
        })
    }
}

/// Removes the precalc pairs of the hashes found in the pot.
fn forget_cracked(store: &mut PrecalcStore, report: &LookupReport) -> CrackalackResult<()> {
    for (hash, _) in &report.previously_cracked {
        store.remove_hash(hash)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{search_table, Alarm, LookupConfigBuilder};
    use crate::{
        ctx::build_test_ctx,
        error::CrackalackError,
        precalc::CandidateIndex,
        rainbow_table::{RainbowChain, SimpleTable},
    };

    #[test]
    fn test_search_table_merges_duplicates() {
        let chains = [(10, 4), (11, 4), (12, 7), (13, 9), (14, 9), (15, 12)]
            .into_iter()
            .map(|(startpoint, endpoint)| RainbowChain {
                startpoint,
                endpoint,
            })
            .collect();
        let table = SimpleTable::from_vec(chains, build_test_ctx());

        let mut candidates = CandidateIndex::new();
        candidates.extend(0, &[9, 1, 4]);
        candidates.extend(1, &[9, 13]);
        candidates.sort();

        let alarms = search_table(&table, &candidates);
        assert_eq!(
            vec![
                Alarm {
                    target: 0,
                    position: 2,
                    startpoint: 10
                },
                Alarm {
                    target: 0,
                    position: 2,
                    startpoint: 11
                },
                Alarm {
                    target: 0,
                    position: 0,
                    startpoint: 13
                },
                Alarm {
                    target: 0,
                    position: 0,
                    startpoint: 14
                },
                Alarm {
                    target: 1,
                    position: 0,
                    startpoint: 13
                },
                Alarm {
                    target: 1,
                    position: 0,
                    startpoint: 14
                },
            ],
            alarms
        );
    }

    #[test]
    fn test_config_needs_a_table_dir() {
        let dir = tempfile::tempdir().unwrap();

        assert!(LookupConfigBuilder::new().table_dir(dir.path()).build().is_ok());
        assert!(matches!(
            LookupConfigBuilder::new()
                .table_dir(dir.path().join("missing"))
                .build(),
            Err(CrackalackError::NoTables(_))
        ));
    }
}
