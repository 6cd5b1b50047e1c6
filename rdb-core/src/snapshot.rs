use ahash::AHashMap as HashMap;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::value::Value;

/// A single key's decoded record. `Ok` carries the decoded value
/// plus whatever metadata preceded it; `Err` is what Full mode records
/// when the value decoder itself failed partway through a key (spec §7's
/// per-entry error policy) -- the key is kept, the value isn't.
#[derive(Clone, Debug)]
pub enum Entry {
    Ok {
        value: Value,
        type_name: String,
        expiry_ms: Option<u64>,
        expiry_iso: Option<String>,
        idle: Option<u64>,
        freq: Option<u8>,
    },
    Err {
        error: String,
        type_name: String,
    },
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Entry::Ok {
                value,
                type_name,
                expiry_ms,
                expiry_iso,
                idle,
                freq,
            } => {
                map.serialize_entry("value", value)?;
                map.serialize_entry("type_name", type_name)?;
                if let Some(v) = expiry_ms {
                    map.serialize_entry("expiry_ms", v)?;
                }
                if let Some(v) = expiry_iso {
                    map.serialize_entry("expiry_iso", v)?;
                }
                if let Some(v) = idle {
                    map.serialize_entry("idle", v)?;
                }
                if let Some(v) = freq {
                    map.serialize_entry("freq", v)?;
                }
            }
            Entry::Err { error, type_name } => {
                map.serialize_entry("error", error)?;
                map.serialize_entry("type_name", type_name)?;
            }
        }
        map.end()
    }
}

/// The decoded snapshot. Keys preserve on-disk insertion order
/// even across an overwrite -- a duplicate key keeps its first position
/// but the later entry's content, the same index-plus-storage split this
/// repo's `vecvec.rs` uses for its own ordered collection, just keyed by
/// string instead of integer id.
pub struct Snapshot {
    pub rdb_version: String,
    pub aux: HashMap<String, String>,
    pub db: u64,
    order: Vec<String>,
    entries: HashMap<String, Entry>,
}

impl Snapshot {
    pub fn new(rdb_version: String) -> Self {
        Snapshot {
            rdb_version,
            aux: HashMap::default(),
            db: 0,
            order: Vec::new(),
            entries: HashMap::default(),
        }
    }

    /// Inserts or overwrites a key's entry, keeping the key's first-seen
    /// position in iteration order (spec §3 "on a duplicate key the later
    /// wins").
    pub fn insert(&mut self, key: String, entry: Entry) {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.order.iter().map(move |k| (k.as_str(), &self.entries[k]))
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// The Full output shape: `{rdb_version, aux, db, keys}`.
    pub fn as_full(&self) -> FullView<'_> {
        FullView(self)
    }

    /// The Simple output shape: a flat `key -> value` map.
    /// Keys whose value decode failed are silently omitted, per §7's
    /// "in Simple mode the affected key is simply absent".
    pub fn as_simple(&self) -> SimpleView<'_> {
        SimpleView(self)
    }
}

pub struct FullView<'a>(&'a Snapshot);

impl<'a> Serialize for FullView<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Snapshot", 4)?;
        s.serialize_field("rdb_version", &self.0.rdb_version)?;
        s.serialize_field("aux", &self.0.aux)?;
        s.serialize_field("db", &self.0.db)?;
        s.serialize_field("keys", &KeysView(self.0))?;
        s.end()
    }
}

struct KeysView<'a>(&'a Snapshot);

impl<'a> Serialize for KeysView<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, entry) in self.0.iter() {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

pub struct SimpleView<'a>(&'a Snapshot);

impl<'a> Serialize for SimpleView<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, entry) in self.0.iter() {
            if let Entry::Ok { value, .. } = entry {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn ok_entry(text: &str) -> Entry {
        Entry::Ok {
            value: Value::Str(text.into()),
            type_name: "string".into(),
            expiry_ms: None,
            expiry_iso: None,
            idle: None,
            freq: None,
        }
    }

    #[test]
    fn duplicate_key_keeps_first_position_but_latest_value() {
        let mut snapshot = Snapshot::new("0011".into());
        snapshot.insert("a".into(), ok_entry("1"));
        snapshot.insert("b".into(), ok_entry("2"));
        snapshot.insert("a".into(), ok_entry("3"));

        let collected: Vec<_> = snapshot.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(collected, vec!["a".to_string(), "b".to_string()]);

        match snapshot.get("a").unwrap() {
            Entry::Ok { value, .. } => assert_eq!(*value, Value::Str("3".into())),
            _ => panic!("expected Ok entry"),
        }
    }

    #[test]
    fn simple_view_omits_error_entries() {
        let mut snapshot = Snapshot::new("0011".into());
        snapshot.insert("good".into(), ok_entry("hi"));
        snapshot.insert(
            "bad".into(),
            Entry::Err {
                error: "boom".into(),
                type_name: "string".into(),
            },
        );

        let json = serde_json::to_string(&snapshot.as_simple()).unwrap();
        assert!(json.contains("good"));
        assert!(!json.contains("bad"));
    }
}
