use std::path::Path;

use rand::{seq::index, Rng};
use rayon::prelude::*;

use crate::{
    cpu::{chain_endpoint, continue_chain, index_to_plaintext},
    ctx::RainbowTableCtx,
    error::{CrackalackError, CrackalackResult},
    rainbow_table::{RainbowChain, RainbowTable},
    Digest, Password, PlaintextIndex,
};

/// The outcome of regenerating a chain up to a candidate column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The plaintext of the column hashes to the target.
    Cracked(Password),
    /// The endpoints matched but the chain does not contain the target.
    FalseAlarm,
}

/// Regenerates the chain starting at `startpoint` up to `position`, and checks whether
/// the plaintext found there hashes to `target`.
pub fn verify_candidate(
    ctx: &RainbowTableCtx,
    startpoint: PlaintextIndex,
    position: u64,
    target: &[u8],
    buffer: &mut Digest,
) -> Verification {
    let index = continue_chain(startpoint, 0..position, ctx, buffer);
    let plaintext = index_to_plaintext(index, ctx);
    ctx.hash_function.hash_into(&plaintext, buffer);

    if buffer.as_slice() == target {
        Verification::Cracked(plaintext)
    } else {
        Verification::FalseAlarm
    }
}

/// A chain whose regenerated endpoint differs from the stored one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrokenChain {
    pub index: usize,
    pub chain: RainbowChain,
    pub computed_endpoint: PlaintextIndex,
}

/// The result of the verification of a table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableVerification {
    /// The number of chains in the table.
    pub chains: usize,
    /// The number of chains regenerated.
    pub sampled: usize,
    /// The sampled chains that were not regenerated to their endpoint.
    pub broken: Vec<BrokenChain>,
}

impl TableVerification {
    /// Returns true if every sampled chain was regenerated to its endpoint.
    pub fn is_valid(&self) -> bool {
        self.broken.is_empty()
    }
}

/// Verifies a table: it must be usable for lookups, its indices must belong to its
/// plaintext space, and `samples` randomly picked chains are regenerated to check
/// their endpoints.
pub fn verify_table<T: RainbowTable>(
    table: &T,
    path: &Path,
    samples: usize,
    rng: &mut impl Rng,
) -> CrackalackResult<TableVerification> {
    table.check_sorted(path)?;

    let ctx = table.ctx();
    if let Some((i, chain)) = table
        .iter()
        .enumerate()
        .find(|(_, chain)| chain.startpoint >= ctx.n || chain.endpoint >= ctx.n)
    {
        return Err(CrackalackError::ParameterMismatch {
            path: path.to_owned(),
            reason: format!(
                "chain {i} ({} -> {}) is outside of the plaintext space of size {}",
                chain.startpoint, chain.endpoint, ctx.n
            ),
        });
    }

    let samples = samples.min(table.len());
    let mut sampled = index::sample(rng, table.len(), samples).into_vec();
    sampled.sort_unstable();

    let broken = sampled
        .into_par_iter()
        .filter_map(|i| {
            let chain = table.chain(i);
            let computed_endpoint = chain_endpoint(chain.startpoint, ctx);

            (computed_endpoint != chain.endpoint).then_some(BrokenChain {
                index: i,
                chain,
                computed_endpoint,
            })
        })
        .collect();

    Ok(TableVerification {
        chains: table.len(),
        sampled: samples,
        broken,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rand::{rngs::StdRng, SeedableRng};

    use super::{verify_candidate, verify_table, Verification};
    use crate::{
        cpu::chain_endpoint,
        ctx::RainbowTableCtxBuilder,
        error::CrackalackError,
        hash::HashFunction,
        rainbow_table::{RainbowChain, SimpleTable},
        Digest, RainbowTableCtx,
    };

    fn build_ascii_ctx(table_index: u32) -> RainbowTableCtx {
        RainbowTableCtxBuilder::new()
            .hash(HashFunction::Ntlm)
            .charset("ascii-32-95")
            .min_password_length(8)
            .max_password_length(8)
            .table_index(table_index)
            .chain_length(100)
            .build()
            .unwrap()
    }

    #[test]
    fn test_verify_candidate() {
        let ctx = build_ascii_ctx(32);
        let mut buffer = Digest::new();

        let vectors: [(u64, u64, &str, &[u8]); 3] = [
            (955, 83, "cbd0ab7936e84a60cf94ce55ab9c1448", b"v&Uf*Ml\\"),
            (1655, 29, "2627ce94b7adcc0b5be394ec6e2293dc", b"bOk;;UI["),
            (1047, 77, "76f1948b006c026b606886b39653f812", b"<krj:VsG"),
        ];

        for (start, position, hash, plaintext) in vectors {
            let target = hex::decode(hash).unwrap();
            let verification = verify_candidate(&ctx, start, position, &target, &mut buffer);

            assert_eq!(
                Verification::Cracked(plaintext.iter().copied().collect()),
                verification
            );
        }
    }

    #[test]
    fn test_false_alarm() {
        let ctx = build_ascii_ctx(32);
        let mut buffer = Digest::new();
        let target = hex::decode("cbd0ab7936e84a60cf94ce55ab9c1448").unwrap();

        assert_eq!(
            Verification::FalseAlarm,
            verify_candidate(&ctx, 955, 82, &target, &mut buffer)
        );
        assert_eq!(
            Verification::FalseAlarm,
            verify_candidate(&ctx, 1655, 83, &target, &mut buffer)
        );
    }

    #[test]
    fn test_verify_table() {
        let ctx = build_ascii_ctx(32);
        let mut chains: Vec<RainbowChain> = (1000..1064)
            .map(|startpoint| RainbowChain {
                startpoint,
                endpoint: chain_endpoint(startpoint, &ctx),
            })
            .collect();
        chains.sort_by_key(|chain| chain.endpoint);

        let mut rng = StdRng::seed_from_u64(1);
        let path = Path::new("table.rt");

        let table = SimpleTable::from_vec(chains.clone(), ctx.clone());
        let verification = verify_table(&table, path, 1000, &mut rng).unwrap();
        assert_eq!(64, verification.sampled);
        assert!(verification.is_valid());

        // corrupt one chain, keeping the table sorted
        chains[10].startpoint += 1;
        let table = SimpleTable::from_vec(chains, ctx);
        let verification = verify_table(&table, path, 64, &mut rng).unwrap();
        assert_eq!(1, verification.broken.len());
        assert_eq!(10, verification.broken[0].index);
    }

    #[test]
    fn test_verify_table_outside_of_space() {
        let ctx = build_ascii_ctx(0);
        let chains = vec![
            RainbowChain {
                startpoint: 1,
                endpoint: 2,
            },
            RainbowChain {
                startpoint: ctx.n,
                endpoint: 3,
            },
        ];
        let table = SimpleTable::from_vec(chains, ctx);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            verify_table(&table, Path::new("table.rt"), 10, &mut rng),
            Err(CrackalackError::ParameterMismatch { .. })
        ));
    }
}
