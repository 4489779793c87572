use std::fmt::Display;

use digest::Digest as _;
use md4::Md4;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};

use crate::{
    error::{CrackalackError, CrackalackResult},
    ntlm::Ntlm,
    Digest,
};

/// All the supported hash functions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashFunction {
    Ntlm,
    Md4,
    Md5,
    Sha1,
    Sha2_224,
    Sha2_256,
    Sha2_384,
    Sha2_512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl HashFunction {
    /// All the hash functions, in declaration order.
    pub const ALL: [HashFunction; 12] = [
        Self::Ntlm,
        Self::Md4,
        Self::Md5,
        Self::Sha1,
        Self::Sha2_224,
        Self::Sha2_256,
        Self::Sha2_384,
        Self::Sha2_512,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
    ];

    /// Returns the hash function named as in a table file name.
    pub fn from_name(name: &str) -> CrackalackResult<Self> {
        Self::ALL
            .into_iter()
            .find(|hash_function| hash_function.name() == name)
            .ok_or_else(|| CrackalackError::UnsupportedHash(name.to_owned()))
    }

    /// Returns the name used for this hash function in table file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ntlm => "ntlm",
            Self::Md4 => "md4",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha2_224 => "sha224",
            Self::Sha2_256 => "sha256",
            Self::Sha2_384 => "sha384",
            Self::Sha2_512 => "sha512",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
        }
    }

    /// Returns the size of a digest in bytes.
    pub fn digest_size(&self) -> usize {
        match self {
            Self::Ntlm | Self::Md4 | Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha2_224 | Self::Sha3_224 => 28,
            Self::Sha2_256 | Self::Sha3_256 => 32,
            Self::Sha2_384 | Self::Sha3_384 => 48,
            Self::Sha2_512 | Self::Sha3_512 => 64,
        }
    }

    /// Hashes a plaintext into `digest`, reusing its allocation.
    #[inline]
    pub fn hash_into(&self, plaintext: &[u8], digest: &mut Digest) {
        digest.clear();
        match self {
            Self::Ntlm => digest.extend_from_slice(&Ntlm::digest(plaintext)),
            Self::Md4 => digest.extend_from_slice(&Md4::digest(plaintext)),
            Self::Md5 => digest.extend_from_slice(&Md5::digest(plaintext)),
            Self::Sha1 => digest.extend_from_slice(&Sha1::digest(plaintext)),
            Self::Sha2_224 => digest.extend_from_slice(&Sha224::digest(plaintext)),
            Self::Sha2_256 => digest.extend_from_slice(&Sha256::digest(plaintext)),
            Self::Sha2_384 => digest.extend_from_slice(&Sha384::digest(plaintext)),
            Self::Sha2_512 => digest.extend_from_slice(&Sha512::digest(plaintext)),
            Self::Sha3_224 => digest.extend_from_slice(&Sha3_224::digest(plaintext)),
            Self::Sha3_256 => digest.extend_from_slice(&Sha3_256::digest(plaintext)),
            Self::Sha3_384 => digest.extend_from_slice(&Sha3_384::digest(plaintext)),
            Self::Sha3_512 => digest.extend_from_slice(&Sha3_512::digest(plaintext)),
        }
    }

    /// Hashes a plaintext.
    pub fn hash(&self, plaintext: &[u8]) -> Digest {
        let mut digest = Digest::with_capacity(self.digest_size());
        self.hash_into(plaintext, &mut digest);
        digest
    }

    /// Returns the prefix prepended to hashes of this type in John the Ripper pot files.
    pub fn jtr_prefix(&self) -> &'static str {
        match self {
            Self::Ntlm => "$NT$",
            _ => "",
        }
    }
}

impl Display for HashFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::HashFunction;
    use crate::error::CrackalackError;

    #[test]
    fn test_digest_sizes() {
        for hash_function in HashFunction::ALL {
            assert_eq!(
                hash_function.digest_size(),
                hash_function.hash(b"abc").len(),
                "{hash_function}"
            );
        }
    }

    #[test]
    fn test_names_round_trip() {
        for hash_function in HashFunction::ALL {
            assert_eq!(
                hash_function,
                HashFunction::from_name(hash_function.name()).unwrap()
            );
        }
    }

    #[test]
    fn test_lm_is_unsupported() {
        assert!(matches!(
            HashFunction::from_name("lm"),
            Err(CrackalackError::UnsupportedHash(name)) if name == "lm"
        ));
    }

    #[test]
    fn test_known_digests() {
        assert_eq!(
            "8846f7eaee8fb117ad06bdd830b7586c",
            hex::encode(HashFunction::Ntlm.hash(b"password"))
        );
        assert_eq!(
            "a448017aaf21d8525fc10ae87aa6729d",
            hex::encode(HashFunction::Md4.hash(b"abc"))
        );
        assert_eq!(
            "900150983cd24fb0d6963f7d28e17f72",
            hex::encode(HashFunction::Md5.hash(b"abc"))
        );
        assert_eq!(
            "a9993e364706816aba3e25717850c26c9cd0d89d",
            hex::encode(HashFunction::Sha1.hash(b"abc"))
        );
    }

    #[test]
    fn test_hash_into_reuses_buffer() {
        let mut digest = vec![0xff; 64];
        HashFunction::Ntlm.hash_into(b"", &mut digest);
        assert_eq!("31d6cfe0d16ae931b73c59d7e0c089c0", hex::encode(&digest));
    }
}
