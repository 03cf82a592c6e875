//! base16/base32/base64 renderings of binary data.

use crate::err::{Result, conversion};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Base {
    Base16,
    Base32,
    Base64,
}

pub(crate) fn encode(data: &[u8], base: Base, upper_case: bool) -> String {
    match base {
        Base::Base16 => data
            .iter()
            .fold(String::with_capacity(data.len() * 2), |mut acc, &b| {
                if upper_case {
                    write!(acc, "{:02X}", b).expect("writing to a String cannot fail");
                } else {
                    write!(acc, "{:02x}", b).expect("writing to a String cannot fail");
                }
                acc
            }),
        Base::Base32 => {
            let encoded = base32::encode(base32::Alphabet::RFC4648 { padding: true }, data);
            if upper_case {
                encoded
            } else {
                encoded.to_ascii_lowercase()
            }
        }
        Base::Base64 => STANDARD.encode(data),
    }
}

/// Number of characters [`encode`] produces for `size` bytes.
pub(crate) fn encoded_len(size: usize, base: Base) -> usize {
    match base {
        Base::Base16 => size * 2,
        Base::Base32 => size.div_ceil(5) * 8,
        Base::Base64 => size.div_ceil(3) * 4,
    }
}

pub(crate) fn decode(text: &str, base: Base) -> Result<Vec<u8>> {
    match base {
        Base::Base16 => {
            if text.len() % 2 != 0 {
                return Err(conversion(
                    "base16 string",
                    format!("odd number of digits {}", text.len()),
                ));
            }
            text.as_bytes()
                .chunks_exact(2)
                .map(|pair| Ok((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?))
                .collect()
        }
        Base::Base32 => base32::decode(
            base32::Alphabet::RFC4648 { padding: true },
            &text.to_ascii_uppercase(),
        )
        .ok_or_else(|| conversion("base32 string", "invalid base32 data")),
        Base::Base64 => STANDARD
            .decode(text)
            .map_err(|e| conversion("base64 string", e)),
    }
}

fn hex_digit(b: u8) -> Result<u8> {
    char::from(b)
        .to_digit(16)
        .map(|digit| digit as u8)
        .ok_or_else(|| conversion("base16 string", format!("invalid digit {:?}", char::from(b))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rfc4648_vectors() {
        assert_eq!(encode(b"foobar", Base::Base16, true), "666F6F626172");
        assert_eq!(encode(b"foobar", Base::Base32, true), "MZXW6YTBOI======");
        assert_eq!(encode(b"foobar", Base::Base32, false), "mzxw6ytboi======");
        assert_eq!(encode(b"fooba", Base::Base64, false), "Zm9vYmE=");

        assert_eq!(decode("666f6F626172", Base::Base16).unwrap(), b"foobar");
        assert_eq!(decode("mzxw6ytboi======", Base::Base32).unwrap(), b"foobar");
        assert_eq!(decode("Zm9vYmE=", Base::Base64).unwrap(), b"fooba");
    }

    #[test]
    fn test_encoded_len_matches_encode() {
        for size in 0..12 {
            let data = vec![0xa5_u8; size];
            for base in [Base::Base16, Base::Base32, Base::Base64] {
                assert_eq!(encode(&data, base, true).len(), encoded_len(size, base));
            }
        }
    }

    #[test]
    fn test_malformed_input_is_a_conversion_error() {
        assert!(decode("abc", Base::Base16).is_err());
        assert!(decode("zz", Base::Base16).is_err());
        assert!(decode("+1", Base::Base16).is_err());
        assert!(decode("M1======", Base::Base32).is_err());
        assert!(decode("Zm9=vYmE", Base::Base64).is_err());
    }
}
