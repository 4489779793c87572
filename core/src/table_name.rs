//! Rainbow table file names.
//!
//! Table files carry their parameters in their name, following the
//! `{hash}_{charset}#{min}-{max}_{table_index}_{chain_length}x{chain_count}_{part}.{rt,rtc}`
//! convention. The name is parsed once into a [`TableName`], which is then turned into a
//! [`RainbowTableCtx`].

use std::{fmt::Display, path::Path, str::FromStr};

use crate::{
    charset::charset_by_name,
    ctx::{RainbowTableCtx, RainbowTableCtxBuilder},
    error::{CrackalackError, CrackalackResult},
    hash::HashFunction,
    MAX_PLAINTEXT_LENGTH_ALLOWED,
};

/// The on-disk representation of a table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableFormat {
    /// Flat array of (start, end) pairs.
    Raw,
    /// Bit-packed RTC0 encoding.
    Compressed,
}

impl TableFormat {
    /// Returns the file extension of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Raw => "rt",
            Self::Compressed => "rtc",
        }
    }
}

/// The parameters of a table, as encoded in its file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableName {
    pub hash_name: String,
    pub charset_name: String,
    pub min_password_length: u8,
    pub max_password_length: u8,
    pub table_index: u32,
    pub chain_length: u64,
    pub chain_count: u64,
    pub part: u32,
    pub format: TableFormat,
}

impl TableName {
    /// Parses the file name of the table at the given path.
    pub fn from_path(path: &Path) -> CrackalackResult<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| CrackalackError::TableName(path.display().to_string()))?
            .parse()
    }

    /// Returns the context of the table.
    pub fn ctx(&self) -> CrackalackResult<RainbowTableCtx> {
        RainbowTableCtxBuilder::new()
            .hash(HashFunction::from_name(&self.hash_name)?)
            .charset(&self.charset_name)
            .min_password_length(self.min_password_length)
            .max_password_length(self.max_password_length)
            .table_index(self.table_index)
            .chain_length(self.chain_length)
            .build()
    }

    /// Returns the same name with another format.
    pub fn with_format(&self, format: TableFormat) -> Self {
        Self {
            format,
            ..self.clone()
        }
    }
}

impl FromStr for TableName {
    type Err = CrackalackError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let invalid = || CrackalackError::TableName(name.to_owned());

        let (stem, format) = if let Some(stem) = name.strip_suffix(".rtc") {
            (stem, TableFormat::Compressed)
        } else if let Some(stem) = name.strip_suffix(".rt") {
            (stem, TableFormat::Raw)
        } else {
            return Err(invalid());
        };

        // the hash and charset names may contain dashes but never '#'
        let (hash_and_charset, numbers) = stem.split_once('#').ok_or_else(invalid)?;
        let (hash_name, charset_name) = hash_and_charset.split_once('_').ok_or_else(invalid)?;

        let mut fields = numbers.split('_');
        let mut next_field = || fields.next().ok_or_else(invalid);

        let (min, max) = next_field()?.split_once('-').ok_or_else(invalid)?;
        let table_index = next_field()?;
        let (chain_length, chain_count) = next_field()?.split_once('x').ok_or_else(invalid)?;
        let part = next_field()?;
        if fields.next().is_some() {
            return Err(invalid());
        }

        let table_name = TableName {
            hash_name: hash_name.to_owned(),
            charset_name: charset_name.to_owned(),
            min_password_length: min.parse().map_err(|_| invalid())?,
            max_password_length: max.parse().map_err(|_| invalid())?,
            table_index: table_index.parse().map_err(|_| invalid())?,
            chain_length: chain_length.parse().map_err(|_| invalid())?,
            chain_count: chain_count.parse().map_err(|_| invalid())?,
            part: part.parse().map_err(|_| invalid())?,
            format,
        };

        let valid = !table_name.hash_name.is_empty()
            && charset_by_name(&table_name.charset_name).is_some()
            && table_name.min_password_length > 0
            && table_name.min_password_length <= table_name.max_password_length
            && (table_name.max_password_length as usize) <= MAX_PLAINTEXT_LENGTH_ALLOWED
            && table_name.chain_length > 0
            && table_name.chain_count > 0;

        if !valid {
            return Err(invalid());
        }

        Ok(table_name)
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}#{}-{}_{}_{}x{}_{}.{}",
            self.hash_name,
            self.charset_name,
            self.min_password_length,
            self.max_password_length,
            self.table_index,
            self.chain_length,
            self.chain_count,
            self.part,
            self.format.extension()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{TableFormat, TableName};
    use crate::hash::HashFunction;

    #[test]
    fn test_parse() {
        let name: TableName = "ntlm_ascii-32-95#8-8_128_100x1024_0.rt".parse().unwrap();

        assert_eq!(
            TableName {
                hash_name: "ntlm".to_owned(),
                charset_name: "ascii-32-95".to_owned(),
                min_password_length: 8,
                max_password_length: 8,
                table_index: 128,
                chain_length: 100,
                chain_count: 1024,
                part: 0,
                format: TableFormat::Raw,
            },
            name
        );
    }

    #[test]
    fn test_parse_compressed_from_path() {
        let path = Path::new("/tables/sub/ntlm_mixalpha-numeric#1-9_3_422000x67108864_12.rtc");
        let name = TableName::from_path(path).unwrap();

        assert_eq!(TableFormat::Compressed, name.format);
        assert_eq!("mixalpha-numeric", name.charset_name);
        assert_eq!((1, 9), (name.min_password_length, name.max_password_length));
        assert_eq!(3, name.table_index);
        assert_eq!(422000, name.chain_length);
        assert_eq!(67108864, name.chain_count);
        assert_eq!(12, name.part);
    }

    #[test]
    fn test_display_round_trip() {
        let raw = "ntlm_loweralpha#8-8_0_100x1024_0.rt";
        let name: TableName = raw.parse().unwrap();
        assert_eq!(raw, name.to_string());
        assert_eq!(
            "ntlm_loweralpha#8-8_0_100x1024_0.rtc",
            name.with_format(TableFormat::Compressed).to_string()
        );
    }

    #[test]
    fn test_invalid_names() {
        let invalid = [
            "ntlm_ascii-32-95#8-8_128_100x1024_0.txt",
            "ntlm_ascii-32-95#8-8_128_100x1024.rt",
            "ntlm_ascii-32-95#8-8_128_100x1024_0_1.rt",
            "ntlm_klingon#8-8_128_100x1024_0.rt",
            "ntlm_ascii-32-95#0-8_128_100x1024_0.rt",
            "ntlm_ascii-32-95#9-8_128_100x1024_0.rt",
            "ntlm_ascii-32-95#8-16_128_100x1024_0.rt",
            "ntlm_ascii-32-95#8-8_128_0x1024_0.rt",
            "ntlm_ascii-32-95#8-8_128_100x0_0.rt",
            "ntlm_ascii-32-95#8-8_-1_100x1024_0.rt",
            "ascii-32-95#8-8_128_100x1024_0.rt",
            "rcracki.precalc.0",
        ];

        for name in invalid {
            assert!(name.parse::<TableName>().is_err(), "{name}");
        }
    }

    #[test]
    fn test_ctx() {
        let name: TableName = "ntlm_ascii-32-95#8-8_96_100x128_0.rtc".parse().unwrap();
        let ctx = name.ctx().unwrap();

        assert_eq!(HashFunction::Ntlm, ctx.hash_function);
        assert_eq!(6_634_204_312_890_625, ctx.n);
        assert_eq!(96 * 65536, ctx.reduction_offset());
    }

    #[test]
    fn test_lm_names_parse_but_have_no_ctx() {
        let name: TableName = "lm_alpha#1-7_0_2400x40000000_0.rt".parse().unwrap();
        assert!(name.ctx().is_err());
    }
}
