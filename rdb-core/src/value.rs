use std::io::Read;

use serde::{Serialize, Serializer};

use crate::byte_reader::ByteReader;
use crate::containers::quicklist::SegmentKind;
use crate::containers::{intset, listpack, quicklist, ziplist, PackedValue};
use crate::decompressor::Decompressor;
use crate::error::Result;
use crate::length::read_length;
use crate::string_codec::{read_raw, read_text};

// Value type tags.
const TYPE_STRING: u8 = 0;
const TYPE_LIST: u8 = 1;
const TYPE_SET: u8 = 2;
const TYPE_ZSET: u8 = 3;
const TYPE_HASH: u8 = 4;
const TYPE_ZSET_2: u8 = 5;
const TYPE_MODULE: u8 = 6;
const TYPE_MODULE_2: u8 = 7;
const TYPE_HASH_ZIPMAP: u8 = 9;
const TYPE_LIST_ZIPLIST: u8 = 10;
const TYPE_SET_INTSET: u8 = 11;
const TYPE_ZSET_ZIPLIST: u8 = 12;
const TYPE_HASH_ZIPLIST: u8 = 13;
const TYPE_LIST_QUICKLIST: u8 = 14;
const TYPE_STREAM_LISTPACKS: u8 = 15;
const TYPE_HASH_LISTPACK: u8 = 16;
const TYPE_ZSET_LISTPACK: u8 = 17;
const TYPE_LIST_QUICKLIST_2: u8 = 18;
const TYPE_STREAM_LISTPACKS_2: u8 = 19;
const TYPE_SET_LISTPACK: u8 = 20;
const TYPE_STREAM_LISTPACKS_3: u8 = 21;

/// A member/score pair of a sorted set, in on-disk order.
#[derive(Clone, Debug, PartialEq)]
pub struct ZSetMember {
    pub member: String,
    pub score: f64,
}

impl Serialize for ZSetMember {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ZSetMember", 2)?;
        state.serialize_field("member", &self.member)?;
        state.serialize_field("score", &Score(self.score))?;
        state.end()
    }
}

/// JSON has no NaN/Infinity literals. The seed scenarios fix
/// the implementation choice: non-finite scores serialize as strings
/// (`"NaN"`, `"inf"`, `"-inf"`) instead of `serde_json`'s default of
/// silently rounding them to `null`.
struct Score(f64);

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0.is_nan() {
            serializer.serialize_str("NaN")
        } else if self.0 == f64::INFINITY {
            serializer.serialize_str("inf")
        } else if self.0 == f64::NEG_INFINITY {
            serializer.serialize_str("-inf")
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// A decoded key's value. Serializes to the JSON shapes
/// described in spec §6.2: strings as JSON strings, list/set as arrays,
/// zset as an array of `{member, score}` objects, hash as an object
/// (built field-by-field to keep on-disk insertion order instead of
/// whatever order a `HashMap` would give), stream/unknown as a
/// placeholder string.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    Set(Vec<String>),
    ZSet(Vec<ZSetMember>),
    Hash(Vec<(String, String)>),
    Stream { element_count: u64 },
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) | Value::Set(items) => items.serialize(serializer),
            Value::ZSet(pairs) => pairs.serialize(serializer),
            Value::Hash(pairs) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (key, value) in pairs {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Stream { element_count } => {
                serializer.serialize_str(&format!("<stream with {} elements>", element_count))
            }
        }
    }
}

/// Maps a value type tag to its output type name. Any tag
/// outside the known table renders as `unknown_type_<n>` -- this also
/// covers the module tags (6, 7), which the on-disk format never
/// otherwise names.
pub fn type_name(tag: u8) -> String {
    match tag {
        TYPE_STRING => "string".to_string(),
        TYPE_LIST | TYPE_LIST_ZIPLIST | TYPE_LIST_QUICKLIST | TYPE_LIST_QUICKLIST_2 => {
            "list".to_string()
        }
        TYPE_SET | TYPE_SET_INTSET | TYPE_SET_LISTPACK => "set".to_string(),
        TYPE_ZSET | TYPE_ZSET_2 | TYPE_ZSET_ZIPLIST | TYPE_ZSET_LISTPACK => "zset".to_string(),
        TYPE_HASH | TYPE_HASH_ZIPMAP | TYPE_HASH_ZIPLIST | TYPE_HASH_LISTPACK => {
            "hash".to_string()
        }
        TYPE_STREAM_LISTPACKS | TYPE_STREAM_LISTPACKS_2 | TYPE_STREAM_LISTPACKS_3 => {
            "stream".to_string()
        }
        other => format!("unknown_type_{}", other),
    }
}

/// Dispatches on the value type tag and decodes the value it introduces.
/// Unknown tags fall back to a best-effort text read, then a
/// placeholder if even that fails, and never abort the parse.
pub fn decode_value<R: Read>(
    reader: &mut ByteReader<R>,
    decompressor: &dyn Decompressor,
    tag: u8,
) -> Result<Value> {
    match tag {
        TYPE_STRING => Ok(Value::Str(read_text(reader, decompressor)?)),
        TYPE_LIST => {
            let count = read_length(reader)?.expect_len()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_text(reader, decompressor)?);
            }
            Ok(Value::List(items))
        }
        TYPE_SET => {
            let count = read_length(reader)?.expect_len()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_text(reader, decompressor)?);
            }
            dedup_preserving_order(&mut items);
            Ok(Value::Set(items))
        }
        TYPE_ZSET | TYPE_ZSET_2 => {
            let count = read_length(reader)?.expect_len()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let member = read_text(reader, decompressor)?;
                let score = if tag == TYPE_ZSET {
                    reader.read_compact_double()?
                } else {
                    reader.read_f64_le()?
                };
                members.push(ZSetMember { member, score });
            }
            Ok(Value::ZSet(members))
        }
        TYPE_HASH => {
            let count = read_length(reader)?.expect_len()?;
            let mut pairs = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let key = read_text(reader, decompressor)?;
                let value = read_text(reader, decompressor)?;
                pairs.push((key, value));
            }
            Ok(Value::Hash(pairs))
        }
        TYPE_HASH_ZIPMAP => {
            let raw = read_raw(reader, decompressor)?;
            Ok(Value::Hash(vec![(
                format!("<zipmap:{} bytes>", raw.len()),
                String::new(),
            )]))
        }
        TYPE_LIST_ZIPLIST => {
            let raw = read_raw(reader, decompressor)?;
            let elements = ziplist::decode(&raw);
            Ok(Value::List(elements.into_iter().map(PackedValue::into_text).collect()))
        }
        TYPE_SET_INTSET => {
            let raw = read_raw(reader, decompressor)?;
            Ok(Value::Set(intset::decode(&raw)))
        }
        TYPE_ZSET_ZIPLIST => {
            let raw = read_raw(reader, decompressor)?;
            Ok(Value::ZSet(pairs_to_zset(ziplist::decode(&raw))))
        }
        TYPE_HASH_ZIPLIST => {
            let raw = read_raw(reader, decompressor)?;
            Ok(Value::Hash(pairs_to_hash(ziplist::decode(&raw))))
        }
        TYPE_LIST_QUICKLIST => {
            let elements = quicklist::decode(reader, decompressor, SegmentKind::Ziplist)?;
            Ok(Value::List(elements.into_iter().map(PackedValue::into_text).collect()))
        }
        TYPE_LIST_QUICKLIST_2 => {
            let elements = quicklist::decode(reader, decompressor, SegmentKind::Listpack)?;
            Ok(Value::List(elements.into_iter().map(PackedValue::into_text).collect()))
        }
        TYPE_STREAM_LISTPACKS | TYPE_STREAM_LISTPACKS_2 | TYPE_STREAM_LISTPACKS_3 => {
            let element_count = read_length(reader)?.expect_len()?;
            Ok(Value::Stream { element_count })
        }
        TYPE_HASH_LISTPACK => {
            let raw = read_raw(reader, decompressor)?;
            Ok(Value::Hash(pairs_to_hash(listpack::decode(&raw))))
        }
        TYPE_ZSET_LISTPACK => {
            let raw = read_raw(reader, decompressor)?;
            Ok(Value::ZSet(pairs_to_zset(listpack::decode(&raw))))
        }
        TYPE_SET_LISTPACK => {
            let raw = read_raw(reader, decompressor)?;
            let elements = listpack::decode(&raw);
            Ok(Value::Set(elements.into_iter().map(PackedValue::into_text).collect()))
        }
        TYPE_MODULE | TYPE_MODULE_2 => Ok(unknown_fallback(reader, decompressor, tag)),
        other => Ok(unknown_fallback(reader, decompressor, other)),
    }
}

fn unknown_fallback<R: Read>(reader: &mut ByteReader<R>, decompressor: &dyn Decompressor, tag: u8) -> Value {
    match read_text(reader, decompressor) {
        Ok(text) => Value::Str(text),
        Err(_) => Value::Str(format!("<unknown type {}>", tag)),
    }
}

fn pairs_to_hash(entries: Vec<PackedValue>) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(entries.len() / 2);
    let mut iter = entries.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        out.push((key.into_text(), value.into_text()));
    }
    out
}

fn pairs_to_zset(entries: Vec<PackedValue>) -> Vec<ZSetMember> {
    let mut out = Vec::with_capacity(entries.len() / 2);
    let mut iter = entries.into_iter();
    while let (Some(member), Some(score)) = (iter.next(), iter.next()) {
        out.push(ZSetMember {
            member: member.into_text(),
            score: score.as_score(),
        });
    }
    out
}

fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.clone()));
}
