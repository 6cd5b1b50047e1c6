use std::io::Read;

use crate::byte_reader::ByteReader;
use crate::decompressor::Decompressor;
use crate::error::Result;
use crate::length::{read_length, Length};

/// A string length over this is treated as corrupt.
const MAX_STRING_LEN: u64 = 100 * 1024 * 1024;

const ENC_INT8: u8 = 0;
const ENC_INT16: u8 = 1;
const ENC_INT32: u8 = 2;
const ENC_COMPRESSED: u8 = 3;

/// Reads the raw bytes behind a length/encoding prefix, resolving the
/// integer-inline and compressed encodings, without requiring the result
/// to be valid UTF-8. Used for the payload of a packed container (spec
/// §4.3 "raw read").
pub fn read_raw<R: Read>(
    reader: &mut ByteReader<R>,
    decompressor: &dyn Decompressor,
) -> Result<Vec<u8>> {
    match read_length(reader)? {
        Length::Len(len) => read_plain_bytes(reader, len),
        Length::Encoded(tag) => read_encoded_raw(reader, decompressor, tag),
    }
}

/// Reads a string behind a length/encoding prefix as best-effort UTF-8
/// text.
pub fn read_text<R: Read>(
    reader: &mut ByteReader<R>,
    decompressor: &dyn Decompressor,
) -> Result<String> {
    let bytes = read_raw(reader, decompressor)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_plain_bytes<R: Read>(reader: &mut ByteReader<R>, len: u64) -> Result<Vec<u8>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if len > MAX_STRING_LEN {
        warn!("string length {} exceeds the 100 MiB cap; substituting a placeholder", len);
        return Ok(format!("<invalid_length:{}>", len).into_bytes());
    }
    reader.read_bytes(len as usize)
}

fn read_encoded_raw<R: Read>(
    reader: &mut ByteReader<R>,
    decompressor: &dyn Decompressor,
    tag: u8,
) -> Result<Vec<u8>> {
    match tag {
        ENC_INT8 => Ok(reader.read_i8()?.to_string().into_bytes()),
        ENC_INT16 => Ok(reader.read_i16_le()?.to_string().into_bytes()),
        ENC_INT32 => Ok(reader.read_i32_le()?.to_string().into_bytes()),
        ENC_COMPRESSED => read_compressed(reader, decompressor),
        other => {
            warn!("unexpected string encoding tag {}; substituting a placeholder", other);
            Ok(format!("<parse_error_enc:{}>", other).into_bytes())
        }
    }
}

fn read_compressed<R: Read>(
    reader: &mut ByteReader<R>,
    decompressor: &dyn Decompressor,
) -> Result<Vec<u8>> {
    let compressed_len = read_length(reader)?.expect_len()?;
    let uncompressed_len = read_length(reader)?.expect_len()?;
    let compressed = reader.read_bytes(compressed_len as usize)?;

    match decompressor.decompress(&compressed, uncompressed_len as usize) {
        Some(bytes) => Ok(bytes),
        None => {
            warn!("compressed string ({} -> {} bytes) but no decompressor is available", compressed_len, uncompressed_len);
            Ok(format!("<compressed:{} bytes>", compressed_len).into_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompressor::NullDecompressor;

    fn reader(data: &[u8]) -> ByteReader<&[u8]> {
        ByteReader::new(data)
    }

    #[test]
    fn plain_string() {
        let data: &[u8] = &[5, b'h', b'e', b'l', b'l', b'o'];
        let mut r = reader(data);
        assert_eq!(read_text(&mut r, &NullDecompressor).unwrap(), "hello");
    }

    #[test]
    fn int8_inline() {
        let data: &[u8] = &[0b1100_0000, (-5i8) as u8];
        let mut r = reader(data);
        assert_eq!(read_text(&mut r, &NullDecompressor).unwrap(), "-5");
    }

    #[test]
    fn int16_inline() {
        let data: &[u8] = &[0b1100_0001, 0x2C, 0x01]; // 300 little-endian
        let mut r = reader(data);
        assert_eq!(read_text(&mut r, &NullDecompressor).unwrap(), "300");
    }

    #[test]
    fn int32_inline() {
        let mut data = vec![0b1100_0010];
        data.extend_from_slice(&100_000i32.to_le_bytes());
        let mut r = reader(&data);
        assert_eq!(read_text(&mut r, &NullDecompressor).unwrap(), "100000");
    }

    #[test]
    fn compressed_without_decompressor_becomes_placeholder() {
        let mut data = vec![0b1100_0011]; // tag 3
        data.push(0x02); // compressed_len = 2 (6-bit length)
        data.push(0x05); // uncompressed_len = 5
        data.extend_from_slice(&[0xAB, 0xCD]);
        let mut r = reader(&data);
        let text = read_text(&mut r, &NullDecompressor).unwrap();
        assert_eq!(text, "<compressed:2 bytes>");
    }

    #[test]
    fn over_100mib_string_is_replaced() {
        let mut data = vec![0x81]; // 64-bit length
        data.extend_from_slice(&(200u64 * 1024 * 1024).to_be_bytes());
        let mut r = reader(&data);
        let text = read_text(&mut r, &NullDecompressor).unwrap();
        assert!(text.starts_with("<invalid_length:"));
    }
}
