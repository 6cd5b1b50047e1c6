use std::io::Read;

use crate::byte_reader::ByteReader;
use crate::error::{DecodeError, Result};

/// Result of decoding a length/encoding prefix (§4.2): either a plain
/// length or a "special encoding" tag for the caller to interpret.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Length {
    Len(u64),
    Encoded(u8),
}

impl Length {
    pub fn expect_len(self) -> Result<u64> {
        match self {
            Length::Len(len) => Ok(len),
            Length::Encoded(tag) => Err(DecodeError::Corrupt(format!(
                "expected a plain length, got special encoding {}",
                tag
            ))),
        }
    }
}

/// Reads the length/encoding prefix byte(s) documented in spec §4.2.
///
/// The on-disk format specifies the 32-bit and 64-bit length payloads as
/// big-endian; this is the "conforming" reading called out as an open
/// question in §9 (the original Python source reads them little-endian,
/// which this implementation deliberately does not reproduce).
pub fn read_length<R: Read>(reader: &mut ByteReader<R>) -> Result<Length> {
    let byte = reader.read_u8()?;
    match byte >> 6 {
        0b00 => Ok(Length::Len((byte & 0x3F) as u64)),
        0b01 => {
            let low = reader.read_u8()?;
            Ok(Length::Len((((byte & 0x3F) as u64) << 8) | low as u64))
        }
        0b10 => {
            let remaining = byte & 0x3F;
            match remaining {
                0 => Ok(Length::Len(reader.read_u32_be()? as u64)),
                1 => Ok(Length::Len(reader.read_u64_be()?)),
                _ => Ok(Length::Len(reader.read_u32_be()? as u64)),
            }
        }
        _ => Ok(Length::Encoded(byte & 0x3F)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_bit_length() {
        let data: &[u8] = &[0b0010_1010];
        let mut reader = ByteReader::new(data);
        assert_eq!(read_length(&mut reader).unwrap(), Length::Len(0b10_1010));
    }

    #[test]
    fn fourteen_bit_length() {
        let data: &[u8] = &[0b0100_0001, 0xFF];
        let mut reader = ByteReader::new(data);
        assert_eq!(read_length(&mut reader).unwrap(), Length::Len(0x1FF));
    }

    #[test]
    fn thirty_two_bit_length_is_big_endian() {
        let data: &[u8] = &[0x80, 0x00, 0x01, 0x00, 0x00];
        let mut reader = ByteReader::new(data);
        assert_eq!(read_length(&mut reader).unwrap(), Length::Len(0x0001_0000));
    }

    #[test]
    fn sixty_four_bit_length_is_big_endian() {
        let data: &[u8] = &[0x81, 0, 0, 0, 0, 0, 0, 0, 1];
        let mut reader = ByteReader::new(data);
        assert_eq!(read_length(&mut reader).unwrap(), Length::Len(1));
    }

    #[test]
    fn special_encoding_tag() {
        let data: &[u8] = &[0b1100_0011];
        let mut reader = ByteReader::new(data);
        assert_eq!(read_length(&mut reader).unwrap(), Length::Encoded(3));
    }
}
