use std::io::Read;

use super::{listpack, ziplist, PackedValue};
use crate::byte_reader::ByteReader;
use crate::decompressor::Decompressor;
use crate::error::Result;
use crate::length::read_length;
use crate::string_codec::read_raw;

/// Which container each quicklist segment is packed with. The original
/// parser always treats segments as ziplists regardless of which outer
/// opcode selected the quicklist; this
/// implementation instead branches on the outer type, which is the
/// "conforming" behavior §9 asks for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Ziplist,
    Listpack,
}

/// Decodes a quicklist: an outer length `N`
/// followed by `N` raw strings, each one a ziplist or listpack segment
/// depending on `kind`. Elements from every segment are concatenated in
/// order.
pub fn decode<R: Read>(
    reader: &mut ByteReader<R>,
    decompressor: &dyn Decompressor,
    kind: SegmentKind,
) -> Result<Vec<PackedValue>> {
    let count = read_length(reader)?.expect_len()?;
    let mut out = Vec::new();

    for segment_index in 0..count {
        let segment = read_raw(reader, decompressor)?;
        let elements = match kind {
            SegmentKind::Ziplist => ziplist::decode(&segment),
            SegmentKind::Listpack => listpack::decode(&segment),
        };
        if elements.is_empty() && !segment.is_empty() {
            warn!(
                "quicklist segment {} ({} bytes, {:?}) decoded no elements; segment may be corrupt",
                segment_index,
                segment.len(),
                kind
            );
        }
        out.extend(elements);
    }

    Ok(out)
}
