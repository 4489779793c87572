pub mod charset;
pub mod cpu;
pub mod ctx;
pub mod error;
pub mod hash;
pub mod lookup;
pub mod ntlm;
pub mod pot;
pub mod precalc;
pub mod rainbow_table;
pub mod table_name;
pub mod target;
pub mod verify;

use arrayvec::ArrayVec;

pub use {
    ctx::{RainbowTableCtx, RainbowTableCtxBuilder},
    error::{CrackalackError, CrackalackResult},
    hash::HashFunction,
    lookup::{Lookup, LookupConfig, LookupConfigBuilder, LookupReport},
    pot::PotFile,
    precalc::PrecalcStore,
    rainbow_table::{
        find_tables, open_table, CompressedTable, RainbowChain, RainbowTable, SimpleTable,
        TableHandle,
    },
    table_name::{TableFormat, TableName},
    target::TargetHash,
    verify::Verification,
};

/// The maximum plaintext length a table name may declare.
pub const MAX_PLAINTEXT_LENGTH_ALLOWED: usize = 15;

/// The distance between the reduction functions of two consecutive table indices.
pub const TABLE_OFFSET_STEP: u64 = 65536;

/// The capacity of the buffered readers and writers used for table files.
pub const IO_BUFFER_CAPACITY: usize = 1024 * 1024 * 16;

/// An ASCII plaintext stored in a stack-allocated vector.
pub type Password = ArrayVec<u8, MAX_PLAINTEXT_LENGTH_ALLOWED>;

/// A hash digest.
pub type Digest = Vec<u8>;

/// A position in the plaintext space of a table.
/// Two indices are only comparable when they come from tables sharing the same charset
/// and length range.
pub type PlaintextIndex = u64;
