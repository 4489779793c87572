use crate::{
    charset::charset_by_name,
    error::{CrackalackError, CrackalackResult},
    hash::HashFunction,
    MAX_PLAINTEXT_LENGTH_ALLOWED, TABLE_OFFSET_STEP,
};

/// A builder for a rainbow table context.
#[derive(Clone, Debug)]
pub struct RainbowTableCtxBuilder {
    hash_function: HashFunction,
    charset_name: String,
    min_password_length: u8,
    max_password_length: u8,
    table_index: u32,
    t: u64,
}

impl Default for RainbowTableCtxBuilder {
    fn default() -> Self {
        Self {
            hash_function: HashFunction::Ntlm,
            charset_name: "ascii-32-95".to_owned(),
            min_password_length: 1,
            max_password_length: 8,
            table_index: 0,
            t: 1000,
        }
    }
}

impl RainbowTableCtxBuilder {
    /// Creates a new RainbowTableCtxBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hash function of the context.
    pub fn hash(mut self, hash_function: HashFunction) -> Self {
        self.hash_function = hash_function;

        self
    }

    /// Sets the charset of the context, by name.
    pub fn charset(mut self, charset_name: &str) -> Self {
        self.charset_name = charset_name.to_owned();

        self
    }

    /// Sets the minimum password length of the context.
    pub fn min_password_length(mut self, min_password_length: u8) -> Self {
        self.min_password_length = min_password_length;

        self
    }

    /// Sets the maximum password length of the context.
    pub fn max_password_length(mut self, max_password_length: u8) -> Self {
        self.max_password_length = max_password_length;

        self
    }

    /// Sets the table index of the context.
    /// Tables covering the same plaintext space use different indices so that their
    /// reduction functions differ.
    pub fn table_index(mut self, table_index: u32) -> Self {
        self.table_index = table_index;

        self
    }

    /// Sets the length of the chain of the context.
    pub fn chain_length(mut self, chain_length: u64) -> Self {
        self.t = chain_length;

        self
    }

    /// Builds a RainbowTableCtx with the specified parameters.
    pub fn build(self) -> CrackalackResult<RainbowTableCtx> {
        let charset = charset_by_name(&self.charset_name)
            .ok_or_else(|| CrackalackError::Charset(self.charset_name.clone()))?;

        if self.max_password_length as usize > MAX_PLAINTEXT_LENGTH_ALLOWED {
            return Err(CrackalackError::PlaintextLength(
                MAX_PLAINTEXT_LENGTH_ALLOWED as u8,
            ));
        }

        if self.min_password_length == 0 || self.min_password_length > self.max_password_length
        {
            return Err(CrackalackError::PlaintextLength(self.max_password_length));
        }

        if self.t == 0 {
            return Err(CrackalackError::ChainLength);
        }

        // search_spaces[i] counts the plaintexts of length min..=i
        let mut n: u128 = 0;
        let mut power: u128 = 1;
        let mut search_spaces = vec![0];

        for i in 1..=self.max_password_length {
            power *= charset.len() as u128;
            if i >= self.min_password_length {
                n += power;
            }

            // make sure the search space is <= 2^64
            if n > u64::MAX as u128 {
                return Err(CrackalackError::Space((n as f64).log2().ceil() as u8));
            }

            search_spaces.push(n as u64);
        }

        Ok(RainbowTableCtx {
            hash_function: self.hash_function,
            charset_name: self.charset_name,
            charset: charset.to_vec(),
            min_password_length: self.min_password_length,
            max_password_length: self.max_password_length,
            table_index: self.table_index,
            t: self.t,
            n: n as u64,
            search_spaces,
        })
    }
}

/// Context used to store all the parameters of a rainbow table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RainbowTableCtx {
    /// The hash function used.
    pub hash_function: HashFunction,
    /// The name of the charset used.
    pub charset_name: String,
    /// The charset used.
    pub charset: Vec<u8>,
    /// The minimum password length.
    pub min_password_length: u8,
    /// The maximum password length.
    pub max_password_length: u8,
    /// The table index.
    pub table_index: u32,
    /// The length of a chain.
    pub t: u64,
    /// The size of the total search space.
    pub n: u64,
    /// A rainbow table has to search through passwords of a variable length.
    /// This is used to determine the search space for each password length.
    pub search_spaces: Vec<u64>,
}

impl RainbowTableCtx {
    /// Returns the offset added by the reduction function of this table.
    #[inline]
    pub fn reduction_offset(&self) -> u64 {
        (self.table_index as u64).wrapping_mul(TABLE_OFFSET_STEP)
    }

    /// Returns the key identifying the tables sharing the same chains mathematics.
    /// Precomputed end indices can be shared by all the tables with the same key.
    pub fn parameter_key(&self) -> String {
        format!(
            "{}_{}#{}-{}_{}_{}",
            self.hash_function,
            self.charset_name,
            self.min_password_length,
            self.max_password_length,
            self.table_index,
            self.t
        )
    }
}

#[cfg(test)]
pub fn build_test_ctx() -> RainbowTableCtx {
    RainbowTableCtxBuilder::new()
        .charset("alpha")
        .min_password_length(1)
        .max_password_length(7)
        .chain_length(100)
        .build()
        .unwrap()
}
