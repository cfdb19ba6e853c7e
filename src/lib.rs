//! # imgwand
//!
//! Image conversion built around a pluggable codec registry. A [`wand::Wand`]
//! holds one image and its metadata; codecs turn byte streams into wands and
//! back. PNG text chunks and netpbm header comments carry metadata across
//! conversions, and every image gets a 64-bit difference hash for
//! near-duplicate detection.
//!
//! # Pipeline
//!
//! ```text
//! bytes ─detect─▶ Decoder ─▶ Wand ─transform─▶ Wand ─▶ Encoder ─▶ bytes
//!        (magic)             (pixels + metadata)       (by name)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`codec`] | `Codec`/`Decoder`/`Encoder` traits, signatures, the registry |
//! | [`formats`] | Built-in codecs: PNG with text chunks, netpbm, `image`-backed rasters |
//! | [`chunk`] | `tEXt`/`iTXt` payload codec and the chunk visitor used while decoding |
//! | [`metadata`] | Text entries, comments and the opaque codec payload |
//! | [`wand`] | The facade: decode, resize, crop, hash, format, encode |
//! | [`imaging`] | Area fitting, difference hash, compression and resize parameters |
//! | [`template`] | `%x` / `%[name]` property expansion |
//! | [`batch`] | Parallel identify/convert over many files |
//! | [`config`] | `imgwand.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Registry
//!
//! There is no process-wide codec table. Callers build a
//! [`codec::CodecRegistry`] (usually [`codec::CodecRegistry::with_builtin_codecs`])
//! and pass it by reference. It is immutable once built, so rayon workers share
//! it without locking, and tests register mocks without touching global state.
//!
//! ## Capabilities Recorded at Registration
//!
//! Whether a codec decodes or encodes is asked once, when it is registered.
//! Listing formats and choosing a detection candidate never re-query the codec.
//!
//! ## Metadata Is Lossy by Default
//!
//! A malformed text chunk is dropped with a warning rather than failing the
//! decode; the pixels are usually fine. Strict decoding
//! ([`codec::DecodeOptions::strict`]) turns those drops into errors.

pub mod batch;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod formats;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod template;
pub mod wand;

#[cfg(test)]
pub(crate) mod test_helpers;
