//! Decoding of the "modified UTF-8" encoding used by `CONSTANT_Utf8` entries (JVMS §4.4.7).
//!
//! It differs from standard UTF-8 in two ways: the null character is encoded with two bytes
//! (`0xC0 0x80`), and supplementary characters are encoded as surrogate pairs, each surrogate
//! taking three bytes. Four-byte forms never appear.

#[derive(Debug, PartialEq)]
pub struct Error {
    /// Offset of the first byte of the offending sequence.
    pub offset: usize,
}

pub fn from_modified_utf8(bytes: &[u8]) -> Result<String, Error> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let continuation = |k: usize| -> Result<u16, Error> {
            match bytes.get(i + k) {
                Some(&c) if c & 0xC0 == 0x80 => Ok((c & 0x3F) as u16),
                _ => Err(Error { offset: i }),
            }
        };
        match b {
            0x01..=0x7F => {
                units.push(b as u16);
                i += 1;
            },
            0xC0..=0xDF => {
                let lo = continuation(1)?;
                units.push((((b & 0x1F) as u16) << 6) | lo);
                i += 2;
            },
            0xE0..=0xEF => {
                let mid = continuation(1)?;
                let lo = continuation(2)?;
                units.push((((b & 0x0F) as u16) << 12) | (mid << 6) | lo);
                i += 3;
            },
            // 0x00 and 0xF0..=0xFF never appear; stray continuation bytes are invalid too
            _ => return Err(Error { offset: i }),
        }
    }
    String::from_utf16(&units).map_err(|_| Error { offset: 0 })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ascii() {
        assert_eq!(from_modified_utf8(b"java/lang/Object").unwrap(), "java/lang/Object");
    }

    #[test]
    fn two_byte_null() {
        assert_eq!(from_modified_utf8(&[0x61, 0xC0, 0x80, 0x62]).unwrap(), "a\u{0}b");
    }

    #[test]
    fn surrogate_pair() {
        // U+1F600 as the surrogates D83D DE00, three bytes each
        let bytes = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(from_modified_utf8(&bytes).unwrap(), "\u{1F600}");
    }

    #[test]
    fn raw_zero_byte_is_rejected() {
        assert_eq!(from_modified_utf8(&[0x61, 0x00]), Err(Error { offset: 1 }));
    }

    #[test]
    fn truncated_sequence_is_rejected() {
        assert_eq!(from_modified_utf8(&[0xE2, 0x82]), Err(Error { offset: 0 }));
    }
}
