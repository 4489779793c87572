use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use crate::{ctx::RainbowTableCtx, Digest, Password, PlaintextIndex};

/// Reduces a digest into a plaintext index.
// The table index and the position are both added to the seed, so that every column of
// every table gets its own reduction function.
#[inline]
pub fn reduce(digest: &[u8], position: u64, ctx: &RainbowTableCtx) -> PlaintextIndex {
    // we can use the 8 first bytes of the digest as the seed, since it is pseudo-random.
    // every supported digest is at least 16 bytes long.
    let seed = LittleEndian::read_u64(&digest[0..8]);
    seed.wrapping_add(ctx.reduction_offset())
        .wrapping_add(position)
        % ctx.n
}

/// Creates a plaintext from an index.
/// Indices past the end of the plaintext space wrap around in the longest length.
#[inline]
pub fn index_to_plaintext(index: PlaintextIndex, ctx: &RainbowTableCtx) -> Password {
    let min = ctx.min_password_length as usize;
    let max = ctx.max_password_length as usize;

    // search_spaces[len - 1] is the first index of a plaintext of length len
    let len = ctx.search_spaces[min - 1..max]
        .iter()
        .rposition(|&space| index >= space)
        .map_or(min, |i| i + min);

    let charset_len = ctx.charset.len() as u64;
    let mut counter = index - ctx.search_spaces[len - 1];

    let mut plaintext = Password::new();
    for _ in 0..len {
        plaintext.push(0);
    }

    // the last character is the least significant digit
    for c in plaintext.iter_mut().rev() {
        *c = ctx.charset[(counter % charset_len) as usize];
        counter /= charset_len;
    }

    plaintext
}

/// Creates an index from a plaintext.
/// Returns `None` if the plaintext is not part of the plaintext space of the context.
#[inline]
pub fn plaintext_to_index(plaintext: &[u8], ctx: &RainbowTableCtx) -> Option<PlaintextIndex> {
    let len = plaintext.len();
    if len < ctx.min_password_length as usize || len > ctx.max_password_length as usize {
        return None;
    }

    let charset_len = ctx.charset.len() as u64;
    let mut counter = 0u64;
    for &c in plaintext {
        let digit = ctx.charset.iter().position(|&x| x == c)? as u64;
        counter = counter * charset_len + digit;
    }

    Some(ctx.search_spaces[len - 1] + counter)
}

/// Continues a chain from the given index over the given columns.
/// Each column hashes the plaintext of the current index and reduces it with its position.
#[inline]
pub fn continue_chain(
    mut index: PlaintextIndex,
    columns: Range<u64>,
    ctx: &RainbowTableCtx,
    digest: &mut Digest,
) -> PlaintextIndex {
    for position in columns {
        let plaintext = index_to_plaintext(index, ctx);
        ctx.hash_function.hash_into(&plaintext, digest);
        index = reduce(digest, position, ctx);
    }

    index
}

/// Computes the endpoint of the chain starting at the given index.
pub fn chain_endpoint(startpoint: PlaintextIndex, ctx: &RainbowTableCtx) -> PlaintextIndex {
    let mut digest = Digest::with_capacity(ctx.hash_function.digest_size());
    continue_chain(startpoint, 0..ctx.t - 1, ctx, &mut digest)
}

/// Computes the endpoint a chain would have if `digest` was the hash found at `position`.
pub fn project_endpoint(
    digest: &[u8],
    position: u64,
    ctx: &RainbowTableCtx,
    buffer: &mut Digest,
) -> PlaintextIndex {
    let index = reduce(digest, position, ctx);
    continue_chain(index, position + 1..ctx.t - 1, ctx, buffer)
}

#[cfg(test)]
mod tests {
    use super::{
        chain_endpoint, continue_chain, index_to_plaintext, plaintext_to_index,
        project_endpoint, reduce,
    };
    use crate::{
        ctx::{build_test_ctx, RainbowTableCtxBuilder},
        hash::HashFunction,
        Digest,
    };

    #[test]
    fn test_index_to_plaintext() {
        let ctx = build_test_ctx();

        let vectors: [(u64, &[u8]); 8] = [
            (0, b"A"),
            (1, b"B"),
            (25, b"Z"),
            (26, b"AA"),
            (27, b"AB"),
            (701, b"ZZ"),
            (702, b"AAA"),
            (8_353_082_581, b"ZZZZZZZ"),
        ];

        for (index, expected) in vectors {
            assert_eq!(expected, index_to_plaintext(index, &ctx).as_slice(), "{index}");
        }
    }

    #[test]
    fn test_index_past_the_space_wraps() {
        let ctx = build_test_ctx();
        assert_eq!(b"AAAAAAA", index_to_plaintext(ctx.n, &ctx).as_slice());
    }

    #[test]
    fn test_index_to_plaintext_fixed_length() {
        let ctx = RainbowTableCtxBuilder::new()
            .charset("ascii-32-95")
            .min_password_length(8)
            .max_password_length(8)
            .build()
            .unwrap();

        assert_eq!(b"        ", index_to_plaintext(0, &ctx).as_slice());
        assert_eq!(b"~~~~~~~~", index_to_plaintext(ctx.n - 1, &ctx).as_slice());
        assert_eq!(
            b" !`T85$}",
            index_to_plaintext(1_234_567_890_123, &ctx).as_slice()
        );
    }

    #[test]
    fn test_plaintext_to_index() {
        let ctx = build_test_ctx();

        for index in (0..2000).chain(ctx.n - 1000..ctx.n) {
            let plaintext = index_to_plaintext(index, &ctx);
            assert_eq!(Some(index), plaintext_to_index(&plaintext, &ctx));
        }

        assert_eq!(None, plaintext_to_index(b"", &ctx));
        assert_eq!(None, plaintext_to_index(b"ABCDEFGH", &ctx));
        assert_eq!(None, plaintext_to_index(b"abc", &ctx));
    }

    #[test]
    fn test_reduce() {
        let ctx = build_test_ctx();
        let mut digest = hex::decode("aabbccddeeff0011").unwrap();
        digest.resize(16, 0);

        assert_eq!(156_475_956, reduce(&digest, 0, &ctx));
        assert_eq!(156_475_961, reduce(&digest, 5, &ctx));

        let ctx = RainbowTableCtxBuilder::new()
            .charset("alpha")
            .min_password_length(1)
            .max_password_length(7)
            .table_index(3)
            .build()
            .unwrap();
        assert_eq!(156_672_571, reduce(&digest, 7, &ctx));
    }

    #[test]
    fn test_reduce_is_deterministic() {
        let ctx = build_test_ctx();
        let digest = HashFunction::Ntlm.hash(b"password");

        for position in 0..100 {
            let index = reduce(&digest, position, &ctx);
            assert!(index < ctx.n);
            assert_eq!(index, reduce(&digest, position, &ctx));
        }
    }

    fn build_ascii_ctx(table_index: u32) -> crate::RainbowTableCtx {
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
    fn test_chain_endpoint() {
        let chains = [
            (128, 666, 814_103_150_699_223),
            (64, 985, 433_833_498_526_988),
            (32, 955, 467_938_381_128_153),
            (32, 1655, 478_778_248_563_219),
            (32, 1047, 4_236_649_556_986_690),
        ];

        for (table_index, start, end) in chains {
            let ctx = build_ascii_ctx(table_index);
            assert_eq!(end, chain_endpoint(start, &ctx), "{start}");
        }
    }

    #[test]
    fn test_chain_is_split_by_columns() {
        let ctx = build_ascii_ctx(32);
        let mut digest = Digest::new();

        let middle = continue_chain(955, 0..40, &ctx, &mut digest);
        let end = continue_chain(middle, 40..99, &ctx, &mut digest);
        assert_eq!(467_938_381_128_153, end);
    }

    #[test]
    fn test_project_endpoint() {
        let ctx = build_ascii_ctx(32);
        let mut buffer = Digest::new();

        // the plaintext at position 83 of the chain starting at 955
        let digest = hex::decode("cbd0ab7936e84a60cf94ce55ab9c1448").unwrap();
        assert_eq!(
            467_938_381_128_153,
            project_endpoint(&digest, 83, &ctx, &mut buffer)
        );

        let middle = continue_chain(955, 0..83, &ctx, &mut buffer);
        assert_eq!(b"v&Uf*Ml\\", index_to_plaintext(middle, &ctx).as_slice());
    }

    #[test]
    fn test_single_column_chain() {
        let ctx = RainbowTableCtxBuilder::new()
            .charset("numeric")
            .min_password_length(1)
            .max_password_length(4)
            .chain_length(1)
            .build()
            .unwrap();

        assert_eq!(42, chain_endpoint(42, &ctx));
    }
}
