use byteorder::{ByteOrder, LittleEndian};

/// Caps the element count so a corrupt header can't make this allocate
/// or iterate without bound.
const MAX_ELEMENTS: u64 = 1_000_000;

/// Decodes an intset: `<u32 element_size><u32 count>`
/// followed by that many little-endian signed integers, emitted as
/// decimal strings in on-disk order.
pub fn decode(data: &[u8]) -> Vec<String> {
    if data.len() < 8 {
        return Vec::new();
    }

    let element_size = LittleEndian::read_u32(&data[0..4]) as usize;
    let count = LittleEndian::read_u32(&data[4..8]) as u64;
    let count = count.min(MAX_ELEMENTS);

    let mut out = Vec::with_capacity(count as usize);
    let mut pos = 8usize;
    for _ in 0..count {
        if pos + element_size > data.len() {
            warn!("intset declared {} elements but the buffer ran out at {} decoded; truncating", count, out.len());
            break;
        }

        let value: i64 = match element_size {
            2 => LittleEndian::read_i16(&data[pos..pos + 2]) as i64,
            4 => LittleEndian::read_i32(&data[pos..pos + 4]) as i64,
            8 => LittleEndian::read_i64(&data[pos..pos + 8]),
            other => {
                warn!("unknown intset element size {}; truncating this container", other);
                break;
            }
        };

        out.push(value.to_string());
        pos += element_size;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(element_size: u32, count: u32) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&element_size.to_le_bytes());
        v.extend_from_slice(&count.to_le_bytes());
        v
    }

    #[test]
    fn two_byte_elements() {
        let mut data = header(2, 3);
        data.extend_from_slice(&(-1i16).to_le_bytes());
        data.extend_from_slice(&2i16.to_le_bytes());
        data.extend_from_slice(&30000i16.to_le_bytes());
        assert_eq!(decode(&data), vec!["-1", "2", "30000"]);
    }

    #[test]
    fn four_byte_elements() {
        let mut data = header(4, 2);
        data.extend_from_slice(&(-70000i32).to_le_bytes());
        data.extend_from_slice(&70000i32.to_le_bytes());
        assert_eq!(decode(&data), vec!["-70000", "70000"]);
    }

    #[test]
    fn eight_byte_elements() {
        let mut data = header(8, 1);
        data.extend_from_slice(&5_000_000_000i64.to_le_bytes());
        assert_eq!(decode(&data), vec!["5000000000"]);
    }

    #[test]
    fn truncated_payload_stops_early_without_panicking() {
        let mut data = header(8, 5);
        data.extend_from_slice(&1i64.to_le_bytes());
        assert_eq!(decode(&data), vec!["1"]);
    }

    #[test]
    fn declared_count_is_capped() {
        let data = header(2, u32::MAX);
        assert!(decode(&data).is_empty());
    }
}
