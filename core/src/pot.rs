//! The pot files recording the cracked hashes.
//!
//! Every crack is written twice: once in the John the Ripper format, which is also the
//! one read back to know which hashes are already cracked, and once in the hashcat format.

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    error::{CrackalackError, CrackalackResult},
    hash::HashFunction,
};

/// The default John the Ripper pot file.
pub const DEFAULT_JTR_POT: &str = "rainbowcrackalack_jtr.pot";

/// The default hashcat pot file.
pub const DEFAULT_HASHCAT_POT: &str = "rainbowcrackalack_hashcat.pot";

/// The ledger of cracked hashes.
#[derive(Debug)]
pub struct PotFile {
    jtr_path: PathBuf,
    hashcat_path: PathBuf,
    /// The cracked hashes, lowercase and without prefix, with their plaintext.
    cracked: HashMap<String, Vec<u8>>,
}

/// Parses a John the Ripper pot line into a hash and a plaintext.
fn parse_line(line: &[u8]) -> Option<(String, Vec<u8>)> {
    let separator = line.iter().position(|&c| c == b':')?;
    let hash = &line[..separator];
    let hash = hash.strip_prefix(b"$NT$").unwrap_or(hash);

    if hash.is_empty() {
        return None;
    }

    let hash = String::from_utf8_lossy(hash).to_lowercase();
    Some((hash, line[separator + 1..].to_vec()))
}

impl PotFile {
    /// Opens the pot files.
    /// With a path `P`, the John the Ripper pot file is `P` and the hashcat one is
    /// `P.hashcat`. Otherwise the default pot files of the current directory are used.
    pub fn open(path: Option<&Path>) -> CrackalackResult<Self> {
        let (jtr_path, hashcat_path) = match path {
            Some(path) => {
                let mut hashcat_path = path.as_os_str().to_owned();
                hashcat_path.push(".hashcat");
                (path.to_owned(), PathBuf::from(hashcat_path))
            }
            None => (
                PathBuf::from(DEFAULT_JTR_POT),
                PathBuf::from(DEFAULT_HASHCAT_POT),
            ),
        };

        let cracked = match fs::read(&jtr_path) {
            Ok(bytes) => bytes
                .split(|&c| c == b'\n')
                .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
                .filter_map(parse_line)
                .collect(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %jtr_path.display(), cracked = cracked.len(), "opened pot file");

        Ok(Self {
            jtr_path,
            hashcat_path,
            cracked,
        })
    }

    /// Returns the path of the John the Ripper pot file.
    pub fn jtr_path(&self) -> &Path {
        &self.jtr_path
    }

    /// Returns the path of the hashcat pot file.
    pub fn hashcat_path(&self) -> &Path {
        &self.hashcat_path
    }

    /// Returns true if the hash is already cracked.
    pub fn is_cracked(&self, hash: &str) -> bool {
        self.cracked.contains_key(&hash.to_lowercase())
    }

    /// Returns the plaintext of a cracked hash.
    pub fn plaintext(&self, hash: &str) -> Option<&[u8]> {
        self.cracked.get(&hash.to_lowercase()).map(Vec::as_slice)
    }

    /// Returns the number of cracked hashes.
    pub fn len(&self) -> usize {
        self.cracked.len()
    }

    /// Returns true if no hash is cracked.
    pub fn is_empty(&self) -> bool {
        self.cracked.is_empty()
    }

    /// Records a cracked hash in both pot files.
    /// Returns false without writing anything if the hash was already cracked.
    pub fn record(
        &mut self,
        hash: &str,
        plaintext: &[u8],
        hash_function: HashFunction,
    ) -> CrackalackResult<bool> {
        let hash = hash.to_lowercase();
        if self.cracked.contains_key(&hash) {
            return Ok(false);
        }

        let mut jtr_line = format!("{}{}:", hash_function.jtr_prefix(), hash).into_bytes();
        jtr_line.extend_from_slice(plaintext);
        jtr_line.push(b'\n');

        let mut hashcat_line = format!("{hash}:").into_bytes();
        hashcat_line.extend_from_slice(plaintext);
        hashcat_line.push(b'\n');

        Self::append(&self.jtr_path, &jtr_line)?;
        Self::append(&self.hashcat_path, &hashcat_line)?;

        debug!(%hash, "recorded crack");
        self.cracked.insert(hash, plaintext.to_vec());

        Ok(true)
    }

    fn append(path: &Path, line: &[u8]) -> CrackalackResult<()> {
        let ledger_error = |source| CrackalackError::Ledger {
            path: path.to_owned(),
            source,
        };

        let mut file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .map_err(ledger_error)?;
        file.write_all(line).map_err(ledger_error)?;
        file.sync_data().map_err(ledger_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::PotFile;
    use crate::{error::CrackalackError, hash::HashFunction};

    #[test]
    fn test_record_writes_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cracked.pot");
        let mut pot = PotFile::open(Some(&path)).unwrap();

        assert!(pot
            .record(
                "a1ce652747dc7ad8f1a1579f2e5552f9",
                b"FYpzudMN",
                HashFunction::Ntlm
            )
            .unwrap());
        assert!(pot
            .record(
                "900150983cd24fb0d6963f7d28e17f72",
                b"abc",
                HashFunction::Md5
            )
            .unwrap());

        assert_eq!(
            "$NT$a1ce652747dc7ad8f1a1579f2e5552f9:FYpzudMN\n900150983cd24fb0d6963f7d28e17f72:abc\n",
            fs::read_to_string(&path).unwrap()
        );
        assert_eq!(
            "a1ce652747dc7ad8f1a1579f2e5552f9:FYpzudMN\n900150983cd24fb0d6963f7d28e17f72:abc\n",
            fs::read_to_string(dir.path().join("cracked.pot.hashcat")).unwrap()
        );
    }

    #[test]
    fn test_record_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cracked.pot");
        let hash = "a1ce652747dc7ad8f1a1579f2e5552f9";

        let mut pot = PotFile::open(Some(&path)).unwrap();
        assert!(pot.record(hash, b"FYpzudMN", HashFunction::Ntlm).unwrap());
        assert!(!pot.record(hash, b"FYpzudMN", HashFunction::Ntlm).unwrap());

        // reopening reads the cracked hashes back
        let mut pot = PotFile::open(Some(&path)).unwrap();
        assert!(pot.is_cracked(hash));
        assert!(pot.is_cracked(&hash.to_uppercase()));
        assert_eq!(Some(&b"FYpzudMN"[..]), pot.plaintext(hash));
        assert!(!pot.record(hash, b"FYpzudMN", HashFunction::Ntlm).unwrap());

        assert_eq!(1, fs::read_to_string(&path).unwrap().lines().count());
    }

    #[test]
    fn test_parse_foreign_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("john.pot");
        fs::write(
            &path,
            "$NT$8846F7EAEE8FB117AD06BDD830B7586C:password\r\n\
             no separator\n\
             :empty hash\n\
             900150983cd24fb0d6963f7d28e17f72:a:b:c\n",
        )
        .unwrap();

        let pot = PotFile::open(Some(&path)).unwrap();
        assert_eq!(2, pot.len());
        assert_eq!(
            Some(&b"password"[..]),
            pot.plaintext("8846f7eaee8fb117ad06bdd830b7586c")
        );
        assert_eq!(
            Some(&b"a:b:c"[..]),
            pot.plaintext("900150983cd24fb0d6963f7d28e17f72")
        );
    }

    #[test]
    fn test_write_failure_is_a_ledger_error() {
        let dir = tempfile::tempdir().unwrap();

        // the parent directory of the pot file does not exist
        let mut pot = PotFile::open(Some(&dir.path().join("missing").join("pot"))).unwrap();
        assert!(matches!(
            pot.record("00", b"x", HashFunction::Md5),
            Err(CrackalackError::Ledger { .. })
        ));
    }
}
