use std::{fs, path::Path};

use itertools::Itertools;

use crate::{
    error::{CrackalackError, CrackalackResult},
    hash::HashFunction,
    Digest,
};

/// Reads the hashes to crack.
/// The argument is read as a file of newline-separated hashes if such a file exists,
/// otherwise it is the only hash to crack.
/// Hashes are lowercased and deduplicated, keeping the order of their first occurrence.
pub fn read_hashes(hash_or_file: &str) -> CrackalackResult<Vec<String>> {
    let path = Path::new(hash_or_file);

    let hashes = if path.is_file() {
        fs::read_to_string(path)?
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .unique()
            .collect()
    } else {
        vec![hash_or_file.trim().to_lowercase()]
    };

    Ok(hashes)
}

/// A hash to crack, decoded for a given hash function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetHash {
    /// The lowercase hexadecimal representation of the hash.
    pub hex: String,
    /// The decoded digest.
    pub digest: Digest,
}

impl TargetHash {
    /// Decodes a hexadecimal hash produced by the given hash function.
    pub fn parse(hex: &str, hash_function: HashFunction) -> CrackalackResult<Self> {
        let invalid = |reason: String| CrackalackError::InvalidHash {
            hash: hex.to_owned(),
            reason,
        };

        let expected = 2 * hash_function.digest_size();
        if hex.len() != expected {
            return Err(invalid(format!(
                "{hash_function} hashes have {expected} hexadecimal characters, found {}",
                hex.len()
            )));
        }

        let digest = hex::decode(hex).map_err(|err| invalid(err.to_string()))?;

        Ok(Self {
            hex: hex.to_lowercase(),
            digest,
        })
    }
}
