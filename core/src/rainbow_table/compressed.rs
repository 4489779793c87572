use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use bitvec::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use itertools::Itertools;

use super::{RainbowChain, RainbowTable};
use crate::{
    ctx::RainbowTableCtx,
    error::{CrackalackError, CrackalackResult},
    table_name::TableName,
    IO_BUFFER_CAPACITY,
};

/// "RTC0" read as a little-endian integer.
const RTC_MAGIC: u32 = 0x30435452;

/// The size of the header of a compressed table file.
const HEADER_SIZE: u64 = 32;

/// The header of a compressed table.
/// Startpoints are stored as an offset to `smin` on `sbits` bits.
/// Endpoints are stored as a residual to a line going through `emin` with a slope of `einterval`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Header {
    sbits: u16,
    ebits: u16,
    smin: u64,
    emin: u64,
    einterval: u64,
}

impl Header {
    /// Returns the size of a chain record in bytes.
    #[inline]
    fn chain_size(&self) -> usize {
        (self.sbits as usize + self.ebits as usize).div_ceil(8)
    }
}

/// A rainbow table using the RTC0 bit-packed encoding.
/// The chains are decoded on demand.
pub struct CompressedTable {
    ctx: RainbowTableCtx,
    header: Header,
    chain_bits: usize,
    len: usize,
    body: BitVec<u8, Lsb0>,
}

/// Returns the number of bits needed to represent `x`, at least 1.
#[inline]
fn bit_width(x: u64) -> u16 {
    (u64::BITS - x.leading_zeros()).max(1) as u16
}

impl CompressedTable {
    /// Computes the header of the table encoding the given chains.
    /// The chains are expected to be sorted by endpoint.
    fn header_for(chains: &[RainbowChain]) -> Header {
        let (Some(first), Some(last)) = (chains.first(), chains.last()) else {
            return Header {
                sbits: 1,
                ebits: 1,
                smin: 0,
                emin: 0,
                einterval: 0,
            };
        };

        let (smin, smax) = chains
            .iter()
            .map(|chain| chain.startpoint)
            .minmax()
            .into_option()
            .unwrap_or((0, 0));

        let residuals = |einterval: u64| {
            chains.iter().enumerate().map(move |(i, chain)| {
                chain.endpoint as i128 - first.endpoint as i128 - i as i128 * einterval as i128
            })
        };

        let mut einterval = last.endpoint.wrapping_sub(first.endpoint) / chains.len() as u64;

        let spread = |einterval: u64| {
            let (min, max) = residuals(einterval)
                .minmax()
                .into_option()
                .unwrap_or((0, 0));
            (min, (max - min) as u128)
        };

        let (mut dmin, mut dspread) = spread(einterval);

        // the residuals of badly distributed endpoints may not fit on 64 bits.
        // without a slope they always do, since they are bounded by last - first.
        if dspread > u64::MAX as u128 {
            einterval = 0;
            (dmin, dspread) = spread(einterval);
        }

        Header {
            sbits: bit_width(smax - smin),
            ebits: bit_width(dspread as u64),
            smin,
            emin: first.endpoint.wrapping_add(dmin as u64),
            einterval,
        }
    }

    fn read_header(reader: &mut impl Read, path: &Path) -> CrackalackResult<Header> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != RTC_MAGIC {
            return Err(CrackalackError::Format {
                path: path.to_owned(),
                reason: format!("invalid magic {magic:#010x}"),
            });
        }

        let header = Header {
            sbits: reader.read_u16::<LittleEndian>()?,
            ebits: reader.read_u16::<LittleEndian>()?,
            smin: reader.read_u64::<LittleEndian>()?,
            emin: reader.read_u64::<LittleEndian>()?,
            einterval: reader.read_u64::<LittleEndian>()?,
        };

        if header.sbits > 64 || header.ebits > 64 {
            return Err(CrackalackError::Format {
                path: path.to_owned(),
                reason: format!(
                    "bit widths {} and {} exceed 64 bits",
                    header.sbits, header.ebits
                ),
            });
        }

        if header.chain_size() == 0 {
            return Err(CrackalackError::Format {
                path: path.to_owned(),
                reason: "chains are empty".to_owned(),
            });
        }

        Ok(header)
    }
}

impl RainbowTable for CompressedTable {
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn chain(&self, i: usize) -> RainbowChain {
        let record = self.body[i * self.chain_bits..(i + 1) * self.chain_bits].load_le::<u128>();
        let header = &self.header;

        let smask = match header.sbits {
            0 => 0,
            sbits => u64::MAX >> (64 - sbits),
        };
        let residual = (record >> header.sbits) as u64;

        RainbowChain {
            startpoint: (record as u64 & smask).wrapping_add(header.smin),
            endpoint: header
                .emin
                .wrapping_add(header.einterval.wrapping_mul(i as u64))
                .wrapping_add(residual),
        }
    }

    fn ctx(&self) -> &RainbowTableCtx {
        &self.ctx
    }

    fn from_rainbow_table<T: RainbowTable>(table: &T) -> Self {
        let chains = table.iter().collect_vec();
        let header = Self::header_for(&chains);
        let chain_bits = header.chain_size() * 8;

        let mut body = BitVec::<u8, Lsb0>::with_capacity(chain_bits * chains.len());
        for (i, chain) in chains.iter().enumerate() {
            let start = chain.startpoint.wrapping_sub(header.smin);
            let residual = chain
                .endpoint
                .wrapping_sub(header.emin)
                .wrapping_sub(header.einterval.wrapping_mul(i as u64));

            body.extend_from_bitslice(&start.view_bits::<Lsb0>()[..header.sbits as usize]);
            body.extend_from_bitslice(&residual.view_bits::<Lsb0>()[..header.ebits as usize]);
            // records are padded to a whole number of bytes
            body.resize((i + 1) * chain_bits, false);
        }

        Self {
            ctx: table.ctx().clone(),
            header,
            chain_bits,
            len: chains.len(),
            body,
        }
    }

    fn store(&self, path: &Path) -> CrackalackResult<()> {
        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut buf_writer = BufWriter::with_capacity(IO_BUFFER_CAPACITY, file);
        buf_writer.write_u32::<LittleEndian>(RTC_MAGIC)?;
        buf_writer.write_u16::<LittleEndian>(self.header.sbits)?;
        buf_writer.write_u16::<LittleEndian>(self.header.ebits)?;
        buf_writer.write_u64::<LittleEndian>(self.header.smin)?;
        buf_writer.write_u64::<LittleEndian>(self.header.emin)?;
        buf_writer.write_u64::<LittleEndian>(self.header.einterval)?;
        buf_writer.write_all(self.body.as_raw_slice())?;
        buf_writer.flush()?;

        Ok(())
    }

    fn load(path: &Path, table_name: &TableName) -> CrackalackResult<Self> {
        let ctx = table_name.ctx()?;

        let file = File::open(path)?;
        let size = file.metadata()?.len();
        if size < HEADER_SIZE {
            return Err(CrackalackError::Format {
                path: path.to_owned(),
                reason: "truncated header".to_owned(),
            });
        }

        let mut buf_reader = BufReader::with_capacity(IO_BUFFER_CAPACITY, file);
        let header = Self::read_header(&mut buf_reader, path)?;

        // unlike raw tables, the chain count has to be taken from the name
        let body_size = table_name
            .chain_count
            .checked_mul(header.chain_size() as u64)
            .filter(|&body_size| body_size <= size - HEADER_SIZE);
        let Some(body_size) = body_size else {
            return Err(CrackalackError::ParameterMismatch {
                path: path.to_owned(),
                reason: format!(
                    "{} chains of {} bytes do not fit in {} bytes",
                    table_name.chain_count,
                    header.chain_size(),
                    size - HEADER_SIZE
                ),
            });
        };

        let mut bytes = Vec::with_capacity(body_size as usize);
        buf_reader.take(body_size).read_to_end(&mut bytes)?;

        Ok(Self {
            ctx,
            chain_bits: header.chain_size() * 8,
            header,
            len: table_name.chain_count as usize,
            body: BitVec::from_vec(bytes),
        })
    }
}
