use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Everything that can go wrong while decoding a snapshot.
///
/// `Truncated`, `BadMagic` and `UnsupportedVersion` are always fatal for
/// the parse in progress. `Corrupt`, `UnknownType` and
/// `DecompressorMissing` are recorded and swallowed by the component that
/// hit them so the outer parse can keep going; see the call sites in
/// `string_codec` and `containers` for where that local policy lives.
#[derive(Debug)]
pub enum DecodeError {
    Truncated,
    BadMagic,
    UnsupportedVersion(String),
    Corrupt(String),
    UnknownType(u8),
    DecompressorMissing,
    Io(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::Truncated => write!(f, "unexpected end of input"),
            DecodeError::BadMagic => write!(f, "not a snapshot file (bad magic)"),
            DecodeError::UnsupportedVersion(version) => {
                write!(f, "unsupported snapshot version: {}", version)
            }
            DecodeError::Corrupt(reason) => write!(f, "corrupt snapshot: {}", reason),
            DecodeError::UnknownType(tag) => write!(f, "unknown value type tag: {}", tag),
            DecodeError::DecompressorMissing => {
                write!(f, "compressed string encountered but no decompressor is available")
            }
            DecodeError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl StdError for DecodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DecodeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::Truncated
        } else {
            DecodeError::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
