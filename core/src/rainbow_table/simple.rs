use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{RainbowChain, RainbowTable};
use crate::{
    cpu::index_to_plaintext,
    ctx::RainbowTableCtx,
    error::{CrackalackError, CrackalackResult},
    table_name::TableName,
    IO_BUFFER_CAPACITY,
};

/// The size of a chain record in a raw table file.
const CHAIN_RECORD_SIZE: u64 = 16;

/// A simple rainbow table, stored as a flat array of (startpoint, endpoint) records.
pub struct SimpleTable {
    /// The chains of the table.
    chains: Vec<RainbowChain>,
    /// The context.
    ctx: RainbowTableCtx,
}

impl SimpleTable {
    /// Creates a new simple rainbow table from a Vec.
    /// The chains are kept in the given order.
    pub fn from_vec(chains: Vec<RainbowChain>, ctx: RainbowTableCtx) -> Self {
        Self { chains, ctx }
    }

    /// Returns the chains of the table.
    pub fn chains(&self) -> &[RainbowChain] {
        &self.chains
    }
}

impl RainbowTable for SimpleTable {
    fn len(&self) -> usize {
        self.chains.len()
    }

    #[inline]
    fn chain(&self, i: usize) -> RainbowChain {
        self.chains[i]
    }

    fn ctx(&self) -> &RainbowTableCtx {
        &self.ctx
    }

    fn from_rainbow_table<T: RainbowTable>(table: &T) -> Self {
        Self {
            ctx: table.ctx().clone(),
            chains: table.iter().collect(),
        }
    }

    fn store(&self, path: &Path) -> CrackalackResult<()> {
        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut buf_writer = BufWriter::with_capacity(IO_BUFFER_CAPACITY, file);
        for chain in &self.chains {
            buf_writer.write_u64::<LittleEndian>(chain.startpoint)?;
            buf_writer.write_u64::<LittleEndian>(chain.endpoint)?;
        }
        buf_writer.flush()?;

        Ok(())
    }

    fn load(path: &Path, table_name: &TableName) -> CrackalackResult<Self> {
        let ctx = table_name.ctx()?;

        let file = File::open(path)?;
        let size = file.metadata()?.len();

        // the chain count of the name is not trusted, the size of the file is
        if size == 0 || size % CHAIN_RECORD_SIZE != 0 {
            return Err(CrackalackError::Format {
                path: path.to_owned(),
                reason: format!("size {size} is not a non-zero multiple of {CHAIN_RECORD_SIZE}"),
            });
        }

        let chain_count = (size / CHAIN_RECORD_SIZE) as usize;
        let mut buf_reader = BufReader::with_capacity(IO_BUFFER_CAPACITY, file);
        let mut chains = Vec::with_capacity(chain_count);

        for _ in 0..chain_count {
            let startpoint = buf_reader.read_u64::<LittleEndian>()?;
            let endpoint = buf_reader.read_u64::<LittleEndian>()?;
            chains.push(RainbowChain {
                startpoint,
                endpoint,
            });
        }

        Ok(Self { chains, ctx })
    }
}

impl std::fmt::Debug for SimpleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chain in self.chains.iter().take(10) {
            let startpoint = index_to_plaintext(chain.startpoint, &self.ctx);
            let endpoint = index_to_plaintext(chain.endpoint, &self.ctx);

            writeln!(
                f,
                "{} -> {}",
                String::from_utf8_lossy(&startpoint),
                String::from_utf8_lossy(&endpoint)
            )?;
        }
        writeln!(f, "...")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::SimpleTable;
    use crate::{
        error::CrackalackError,
        rainbow_table::{RainbowChain, RainbowTable},
        table_name::TableName,
    };

    const NAME: &str = "ntlm_loweralpha#8-8_0_100x1024_0.rt";

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NAME);
        let table_name: TableName = NAME.parse().unwrap();

        let chains = vec![
            RainbowChain {
                startpoint: 1,
                endpoint: 0x0102030405060708,
            },
            RainbowChain {
                startpoint: 42,
                endpoint: 0x1122334455667788,
            },
        ];
        let table = SimpleTable::from_vec(chains.clone(), table_name.ctx().unwrap());
        table.store(&path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(32, bytes.len());
        assert_eq!([1, 0, 0, 0, 0, 0, 0, 0], bytes[0..8]);
        assert_eq!([8, 7, 6, 5, 4, 3, 2, 1], bytes[8..16]);

        let loaded = SimpleTable::load(&path, &table_name).unwrap();
        assert_eq!(chains, loaded.chains());
    }

    #[test]
    fn test_load_invalid_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NAME);
        let table_name: TableName = NAME.parse().unwrap();

        for size in [0, 15, 17, 33] {
            fs::write(&path, vec![1; size]).unwrap();
            assert!(
                matches!(
                    SimpleTable::load(&path, &table_name),
                    Err(CrackalackError::Format { .. })
                ),
                "{size}"
            );
        }
    }

    #[test]
    fn test_load_more_chains_than_named() {
        let dir = tempfile::tempdir().unwrap();
        let name = "ntlm_loweralpha#8-8_0_100x1_0.rt";
        let path = dir.path().join(name);

        fs::write(&path, vec![1; 16 * 4]).unwrap();
        let table = SimpleTable::load(&path, &name.parse().unwrap()).unwrap();
        assert_eq!(4, table.len());
    }
}
