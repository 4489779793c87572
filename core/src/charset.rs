//! The named charsets tables can be generated with.

/// All the charsets known by name, with their characters in digit order.
pub const CHARSETS: &[(&str, &[u8])] = &[
    ("numeric", b"0123456789"),
    ("alpha", b"ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
    ("alpha-numeric", b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"),
    ("loweralpha", b"abcdefghijklmnopqrstuvwxyz"),
    ("loweralpha-numeric", b"abcdefghijklmnopqrstuvwxyz0123456789"),
    (
        "mixalpha",
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ",
    ),
    (
        "mixalpha-numeric",
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789",
    ),
    (
        "ascii-32-95",
        b" !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~",
    ),
    (
        "ascii-32-65-123-4",
        b" !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`{|}~",
    ),
    (
        "alpha-numeric-symbol32-space",
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_+=~`[]{}|\\:;\"'<>,.?/ ",
    ),
];

/// Returns the characters of the charset with the given name.
pub fn charset_by_name(name: &str) -> Option<&'static [u8]> {
    CHARSETS
        .iter()
        .find(|(charset_name, _)| *charset_name == name)
        .map(|(_, charset)| *charset)
}

#[cfg(test)]
mod tests {
    use super::{charset_by_name, CHARSETS};

    #[test]
    fn test_charset_sizes() {
        let sizes = [
            ("numeric", 10),
            ("alpha", 26),
            ("alpha-numeric", 36),
            ("loweralpha", 26),
            ("loweralpha-numeric", 36),
            ("mixalpha", 52),
            ("mixalpha-numeric", 62),
            ("ascii-32-95", 95),
            ("ascii-32-65-123-4", 69),
            ("alpha-numeric-symbol32-space", 69),
        ];

        for (name, size) in sizes {
            assert_eq!(size, charset_by_name(name).unwrap().len(), "{name}");
        }
    }

    #[test]
    fn test_ascii_ranges() {
        let ascii_32_95: Vec<u8> = (32..=126).collect();
        assert_eq!(ascii_32_95, charset_by_name("ascii-32-95").unwrap());

        let ascii_32_65_123_4: Vec<u8> = (32..=96).chain(123..=126).collect();
        assert_eq!(
            ascii_32_65_123_4,
            charset_by_name("ascii-32-65-123-4").unwrap()
        );
    }

    #[test]
    fn test_no_duplicate_characters() {
        for (name, charset) in CHARSETS {
            let mut sorted = charset.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(charset.len(), sorted.len(), "{name}");
        }
    }

    #[test]
    fn test_unknown_charset() {
        assert!(charset_by_name("klingon").is_none());
    }
}
