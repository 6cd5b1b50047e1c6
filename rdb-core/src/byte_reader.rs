use std::io::Read;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::error::{DecodeError, Result};

/// A sequential, forward-only cursor over the snapshot's byte source.
///
/// Mirrors the primitive reads this repo's `loader.rs` pulls off its event
/// stream via `byteorder`, just widened to cover the signed/unsigned,
/// 8/16/32/64-bit and big/little-endian combinations the snapshot format
/// actually uses.
pub struct ByteReader<R> {
    inner: R,
}

impl<R: Read> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        ByteReader { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.inner.read_i8()?)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.inner.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(self.inner.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        Ok(self.inner.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(self.inner.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(self.inner.read_i32::<LittleEndian>()?)
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(self.inner.read_u32::<BigEndian>()?)
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(self.inner.read_u64::<LittleEndian>()?)
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(self.inner.read_u64::<BigEndian>()?)
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(self.inner.read_i64::<LittleEndian>()?)
    }

    pub fn read_f64_le(&mut self) -> Result<f64> {
        Ok(self.inner.read_f64::<LittleEndian>()?)
    }

    /// The older sorted-set encoding's "compact double": one length byte,
    /// then either a sentinel (253/254/255 = NaN/+inf/-inf) or that many
    /// ASCII digits parsed as a decimal float.
    pub fn read_compact_double(&mut self) -> Result<f64> {
        let len = self.read_u8()?;
        match len {
            255 => Ok(f64::NEG_INFINITY),
            254 => Ok(f64::INFINITY),
            253 => Ok(f64::NAN),
            len => {
                let digits = self.read_bytes(len as usize)?;
                let text = std::str::from_utf8(&digits)
                    .map_err(|_| DecodeError::Corrupt("compact double is not ASCII".into()))?;
                text.parse::<f64>()
                    .map_err(|_| DecodeError::Corrupt(format!("bad compact double: {:?}", text)))
            }
        }
    }
}
