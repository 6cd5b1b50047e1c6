/// A pluggable decompression step for the compressed-string encoding.
/// Decompression itself is out of scope for this
/// crate; this trait only defines the seam a caller can plug an
/// implementation into, the way this repo's `common/src/lz4_stream.rs`
/// sits ahead of its own byte buffer as a single decompression step.
pub trait Decompressor {
    /// Returns `None` when the bytes can't be (or aren't going to be)
    /// decompressed; the caller substitutes a diagnostic placeholder and
    /// keeps parsing.
    fn decompress(&self, compressed: &[u8], uncompressed_len: usize) -> Option<Vec<u8>>;
}

/// The default: no decompressor is available. Every compressed string
/// becomes a placeholder.
pub struct NullDecompressor;

impl Decompressor for NullDecompressor {
    fn decompress(&self, _compressed: &[u8], _uncompressed_len: usize) -> Option<Vec<u8>> {
        None
    }
}
