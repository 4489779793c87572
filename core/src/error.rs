use std::{io, path::PathBuf};

use thiserror::Error;

pub type CrackalackResult<T> = std::result::Result<T, CrackalackError>;

#[derive(Error, Debug)]
pub enum CrackalackError {
    #[error(
        "Unable to access the file at the given path. Make sure the right permissions are available"
    )]
    Io(#[from] io::Error),

    #[error("{} is malformed: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("{} does not match the parameters in its name: {reason}", path.display())]
    ParameterMismatch { path: PathBuf, reason: String },

    #[error("{0} is not a valid rainbow table name")]
    TableName(String),

    #[error("Unknown charset: {0}")]
    Charset(String),

    #[error("The {0} hash function is not supported")]
    UnsupportedHash(String),

    #[error("Invalid hash {hash}: {reason}")]
    InvalidHash { hash: String, reason: String },

    #[error("Only plaintext spaces up to 2^64 are supported, but the provided space is 2^{0}")]
    Space(u8),

    #[error("Plaintexts are limited to {0} characters")]
    PlaintextLength(u8),

    #[error("Chains must have at least one column")]
    ChainLength,

    #[error("Failed to write to the pot file {}", path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Every precalc slot is already in use")]
    PrecalcSlots,

    #[error("No rainbow table found in {}", .0.display())]
    NoTables(PathBuf),
}
