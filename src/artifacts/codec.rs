//! Content hashing and compressed stream transfer
//!
//! Every object is addressed by the SHA-256 of its full uncompressed bytes,
//! rendered as URL-safe base64 without padding. Compression is whole-stream
//! gzip at the best ratio; callers treat it as an atomic transform of a
//! complete file's bytes.

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};

/// Digest a full byte stream into its content address.
///
/// The result is stable across calls for identical content and is always
/// long enough for the object store's sharding slices (43 characters for
/// a 256-bit digest).
pub fn digest(reader: &mut impl Read) -> anyhow::Result<String> {
    let mut hasher = Sha256::new();
    std::io::copy(reader, &mut hasher).context("Unable to hash content stream")?;
    Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

/// Compress the whole of `src` into `dst`, returning the uncompressed size.
pub fn compress(src: &mut impl Read, dst: impl Write) -> anyhow::Result<u64> {
    let mut encoder = flate2::write::GzEncoder::new(dst, flate2::Compression::best());
    let written = std::io::copy(src, &mut encoder).context("Unable to compress content")?;
    encoder
        .finish()
        .context("Unable to finish compressing content")?;
    Ok(written)
}

/// Decompress the whole of `src` into `dst`, returning the uncompressed size.
pub fn decompress(src: impl Read, dst: &mut impl Write) -> anyhow::Result<u64> {
    let mut decoder = flate2::read::GzDecoder::new(src);
    std::io::copy(&mut decoder, dst).context("Unable to decompress content")
}
