use std::io::Read;

use chrono::{TimeZone, Utc};

use crate::byte_reader::ByteReader;
use crate::decompressor::Decompressor;
use crate::error::{DecodeError, Result};
use crate::length::read_length;
use crate::snapshot::{Entry, Snapshot};
use crate::string_codec::read_text;
use crate::value::{decode_value, type_name};

const MAGIC: &[u8] = b"REDIS";

const OP_AUX: u8 = 0xFA;
const OP_RESIZE_DB: u8 = 0xFB;
const OP_SELECT_DB: u8 = 0xFE;
const OP_EXPIRE_MS: u8 = 0xFC;
const OP_EXPIRE_S: u8 = 0xFD;
const OP_IDLE: u8 = 0xF8;
const OP_FREQ: u8 = 0xF9;
const OP_EOF: u8 = 0xFF;

/// Parses a complete snapshot stream: validates the header,
/// then loops over opcode-tagged records until EOF or the input runs out.
///
/// `Truncated` encountered mid-stream is not propagated as an error -- per
/// spec §7 it is fatal only to the decode *in progress*, not to the call:
/// whatever was assembled before the cutoff is returned as a normal
/// `Snapshot`. Only a bad header (`BadMagic`/`UnsupportedVersion`) fails
/// the whole call, since nothing trustworthy has been read yet.
pub fn parse<R: Read>(source: R, decompressor: &dyn Decompressor) -> Result<Snapshot> {
    let mut reader = ByteReader::new(source);
    let rdb_version = read_header(&mut reader)?;
    debug!("snapshot header recognized, version {}", rdb_version);

    let mut snapshot = Snapshot::new(rdb_version);
    let mut pending_expiry_ms: Option<u64> = None;
    let mut pending_idle: Option<u64> = None;
    let mut pending_freq: Option<u8> = None;

    macro_rules! stop_on_err {
        ($expr:expr, $what:expr) => {
            match $expr {
                Ok(v) => v,
                Err(e) => {
                    warn!("stopping parse while reading {}: {}", $what, e);
                    break;
                }
            }
        };
    }

    loop {
        let opcode = match reader.read_u8() {
            Ok(b) => b,
            Err(_) => {
                debug!("input exhausted without an explicit EOF opcode");
                break;
            }
        };

        match opcode {
            OP_AUX => {
                let key = stop_on_err!(read_text(&mut reader, decompressor), "aux key");
                let value = stop_on_err!(read_text(&mut reader, decompressor), "aux value");
                trace!("aux {} = {}", key, value);
                snapshot.aux.insert(key, value);
            }
            OP_RESIZE_DB => {
                stop_on_err!(read_length(&mut reader), "resize hint (hash size)");
                stop_on_err!(read_length(&mut reader), "resize hint (expire size)");
            }
            OP_SELECT_DB => {
                let db = stop_on_err!(read_length(&mut reader), "select-db index");
                let db = stop_on_err!(db.expect_len(), "select-db index");
                trace!("select db {}", db);
                snapshot.db = db;
            }
            OP_EXPIRE_MS => {
                let ms = stop_on_err!(reader.read_u64_le(), "millisecond expiry");
                pending_expiry_ms = Some(ms);
            }
            OP_EXPIRE_S => {
                let secs = stop_on_err!(reader.read_u32_le(), "second expiry");
                pending_expiry_ms = Some(secs as u64 * 1000);
            }
            OP_IDLE => {
                let idle = stop_on_err!(read_length(&mut reader), "idle hint");
                let idle = stop_on_err!(idle.expect_len(), "idle hint");
                pending_idle = Some(idle);
            }
            OP_FREQ => {
                let freq = stop_on_err!(reader.read_u8(), "freq hint");
                pending_freq = Some(freq);
            }
            OP_EOF => {
                debug!("EOF opcode reached with {} keys decoded", snapshot.len());
                let _ = reader.read_bytes(8); // optional trailing checksum, unverified
                break;
            }
            tag => {
                let key = stop_on_err!(read_text(&mut reader, decompressor), "key");
                let is_placeholder = key.starts_with('<');

                match decode_value(&mut reader, decompressor, tag) {
                    Ok(value) => {
                        if !is_placeholder {
                            let entry = Entry::Ok {
                                value,
                                type_name: type_name(tag),
                                expiry_ms: pending_expiry_ms,
                                expiry_iso: pending_expiry_ms.map(format_expiry_iso),
                                idle: pending_idle,
                                freq: pending_freq,
                            };
                            snapshot.insert(key, entry);
                        }
                        pending_expiry_ms = None;
                        pending_idle = None;
                        pending_freq = None;
                    }
                    Err(e) => {
                        warn!("failed to decode value for key {:?}: {}", key, e);
                        if !is_placeholder {
                            snapshot.insert(
                                key,
                                Entry::Err {
                                    error: e.to_string(),
                                    type_name: type_name(tag),
                                },
                            );
                        }
                        // The stream's byte alignment can't be trusted past a
                        // failed value read, so there is nothing safe left to
                        // parse.
                        break;
                    }
                }
            }
        }
    }

    Ok(snapshot)
}

fn read_header<R: Read>(reader: &mut ByteReader<R>) -> Result<String> {
    let magic = reader.read_bytes(MAGIC.len())?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version_bytes = reader.read_bytes(4)?;
    let version = String::from_utf8_lossy(&version_bytes).into_owned();
    if version.len() != 4 || !version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    Ok(version)
}

fn format_expiry_iso(expiry_ms: u64) -> String {
    Utc.timestamp_millis_opt(expiry_ms as i64)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompressor::NullDecompressor;
    use crate::value::Value;

    fn run(data: &[u8]) -> Snapshot {
        parse(data, &NullDecompressor).unwrap()
    }

    fn minimal_header() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"REDIS0011");
        data
    }

    #[test]
    fn rejects_bad_magic() {
        let data = b"NOTREDIS0011";
        let err = parse(&data[..], &NullDecompressor).unwrap_err();
        match err {
            DecodeError::BadMagic => {}
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_numeric_version() {
        let mut data = Vec::new();
        data.extend_from_slice(b"REDISABCD");
        let err = parse(&data[..], &NullDecompressor).unwrap_err();
        match err {
            DecodeError::UnsupportedVersion(v) => assert_eq!(v, "ABCD"),
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn minimal_string_scenario() {
        // spec §8 seed scenario 1
        let mut data = minimal_header();
        data.push(0xFA);
        data.push(9);
        data.extend_from_slice(b"redis-ver");
        data.push(5);
        data.extend_from_slice(b"7.2.0");
        data.push(0xFE);
        data.push(0x00);
        data.push(0x00); // string type
        data.push(3);
        data.extend_from_slice(b"key");
        data.push(5);
        data.extend_from_slice(b"hello");
        data.push(0xFF);
        data.extend_from_slice(&[0u8; 8]);

        let snapshot = run(&data);
        assert_eq!(snapshot.rdb_version, "0011");
        assert_eq!(snapshot.db, 0);
        assert_eq!(snapshot.aux.get("redis-ver").map(String::as_str), Some("7.2.0"));
        match snapshot.get("key").unwrap() {
            Entry::Ok { value, type_name, .. } => {
                assert_eq!(*value, Value::Str("hello".into()));
                assert_eq!(type_name, "string");
            }
            _ => panic!("expected Ok entry"),
        }
    }

    #[test]
    fn expiry_scenario_produces_iso_timestamp() {
        // spec §8 seed scenario 2
        let mut data = minimal_header();
        data.push(0xFC);
        data.extend_from_slice(&1_700_000_000_000u64.to_le_bytes());
        data.push(0x00); // string
        data.push(3);
        data.extend_from_slice(b"key");
        data.push(5);
        data.extend_from_slice(b"hello");
        data.push(0xFF);

        let snapshot = run(&data);
        match snapshot.get("key").unwrap() {
            Entry::Ok { expiry_ms, expiry_iso, .. } => {
                assert_eq!(*expiry_ms, Some(1_700_000_000_000));
                assert_eq!(expiry_iso.as_deref(), Some("2023-11-14T22:13:20.000"));
            }
            _ => panic!("expected Ok entry"),
        }
    }

    #[test]
    fn metadata_does_not_leak_to_next_entry() {
        let mut data = minimal_header();
        data.push(0xFC);
        data.extend_from_slice(&1_700_000_000_000u64.to_le_bytes());
        data.push(0x00);
        data.push(1);
        data.extend_from_slice(b"a");
        data.push(1);
        data.extend_from_slice(b"1");
        data.push(0x00);
        data.push(1);
        data.extend_from_slice(b"b");
        data.push(1);
        data.extend_from_slice(b"2");
        data.push(0xFF);

        let snapshot = run(&data);
        match snapshot.get("a").unwrap() {
            Entry::Ok { expiry_ms, .. } => assert_eq!(*expiry_ms, Some(1_700_000_000_000)),
            _ => panic!("expected Ok entry"),
        }
        match snapshot.get("b").unwrap() {
            Entry::Ok { expiry_ms, .. } => assert_eq!(*expiry_ms, None),
            _ => panic!("expected Ok entry"),
        }
    }

    #[test]
    fn placeholder_key_is_skipped_but_value_still_consumed() {
        let mut data = minimal_header();
        data.push(0x00);
        data.push(17);
        data.extend_from_slice(b"<parse_error_key>");
        data.push(3);
        data.extend_from_slice(b"bad");
        data.push(0x00);
        data.push(4);
        data.extend_from_slice(b"real");
        data.push(2);
        data.extend_from_slice(b"ok");
        data.push(0xFF);

        let snapshot = run(&data);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("real").is_some());
    }

    #[test]
    fn truncated_stream_returns_partial_snapshot_instead_of_erroring() {
        let mut data = minimal_header();
        data.push(0x00);
        data.push(3);
        data.extend_from_slice(b"key");
        data.push(5);
        data.extend_from_slice(b"he"); // truncated payload

        let snapshot = parse(&data[..], &NullDecompressor).unwrap();
        assert_eq!(snapshot.len(), 1);
        match snapshot.get("key").unwrap() {
            Entry::Err { type_name, .. } => assert_eq!(type_name, "string"),
            other => panic!("expected Err entry, got {:?}", other),
        }
    }

    #[test]
    fn exactly_k_value_opcodes_yields_k_keys() {
        let mut data = minimal_header();
        for i in 0..3u8 {
            data.push(0x00);
            data.push(1);
            data.push(b'a' + i);
            data.push(1);
            data.push(b'0' + i);
        }
        data.push(0xFF);

        let snapshot = run(&data);
        assert_eq!(snapshot.len(), 3);
    }
}
