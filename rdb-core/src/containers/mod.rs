pub mod intset;
pub mod listpack;
pub mod quicklist;
pub mod ziplist;

/// An element decoded out of a packed container (ziplist/listpack entry).
/// Kept as a tagged union rather than eagerly stringified so that zset
/// pair conversion can tell a numeric score from a literal string one,
/// the same distinction the original parser relies on.
#[derive(Clone, Debug, PartialEq)]
pub enum PackedValue {
    Text(String),
    Int(i64),
}

impl PackedValue {
    pub fn into_text(self) -> String {
        match self {
            PackedValue::Text(s) => s,
            PackedValue::Int(i) => i.to_string(),
        }
    }

    /// Mirrors the original's `float(entry) if isinstance(entry, (int, float)) else 0`:
    /// an integer entry converts directly, a string entry is parsed, and an
    /// unparseable string falls back to zero rather than failing the parse.
    pub fn as_score(&self) -> f64 {
        match self {
            PackedValue::Int(i) => *i as f64,
            PackedValue::Text(s) => s.parse::<f64>().unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck! {
        fn ziplist_decode_never_panics(bytes: Vec<u8>) -> bool {
            let _ = ziplist::decode(&bytes);
            true
        }

        fn listpack_decode_never_panics(bytes: Vec<u8>) -> bool {
            let _ = listpack::decode(&bytes);
            true
        }

        fn intset_decode_never_panics(bytes: Vec<u8>) -> bool {
            let _ = intset::decode(&bytes);
            true
        }
    }
}
