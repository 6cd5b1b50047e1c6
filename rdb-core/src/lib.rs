#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod byte_reader;
pub mod containers;
pub mod decompressor;
pub mod error;
pub mod length;
pub mod record_stream;
pub mod snapshot;
pub mod string_codec;
pub mod value;

pub use decompressor::{Decompressor, NullDecompressor};
pub use error::{DecodeError, Result};
pub use record_stream::parse;
pub use snapshot::{Entry, Snapshot};
pub use value::{Value, ZSetMember};
