//! Codec capability traits and the registry that dispatches to them.
//!
//! A codec is a named bundle of optional capabilities. The pixel work itself
//! belongs to the `image` and `png` crates; this layer only decides *which*
//! codec handles a stream and threads options and metadata through.
//!
//! | Trait | Capability |
//! |---|---|
//! | [`Codec`] | name, aliases, capability queries |
//! | [`Decoder`] | magic signatures, `decode`, `decode_config` |
//! | [`Encoder`] | `encode` |
//!
//! Capabilities are queried once, when the codec is registered, and recorded
//! in the [`CodecRegistry`] entry.

pub mod registry;
pub mod signature;

use crate::chunk::ChunkError;
use crate::imaging::CompressionLevel;
use crate::metadata::{Metadata, SpecificData};
use image::{ColorType, DynamicImage};
use std::io::{BufRead, Write};
use thiserror::Error;

pub use registry::{CodecRegistry, CodecSummary};
pub use signature::{PeekReader, Signature, WILDCARD};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("no such codec: {0}")]
    NotFound(String),
    #[error("format error: {0}")]
    Format(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("PNG encoding failed: {0}")]
    PngEncoding(#[from] png::EncodingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid codec registration: {0}")]
    Registry(String),
}

/// Options handed to a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Collect ancillary text metadata while decoding.
    pub read_metadata: bool,
    /// Fail the whole decode on a malformed non-critical chunk instead of
    /// dropping it.
    pub strict: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            read_metadata: true,
            strict: false,
        }
    }
}

/// Options handed to an encoder.
#[derive(Clone, Default)]
pub struct EncodeOptions<'a> {
    pub compression_level: CompressionLevel,
    /// Metadata to serialise, if the container can carry it.
    pub metadata: Option<&'a Metadata>,
    /// Encoder-specific settings.
    pub specific: Option<SpecificData>,
}

impl std::fmt::Debug for EncodeOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("compression_level", &self.compression_level)
            .field("metadata", &self.metadata)
            .field("specific", &self.specific.as_ref().map(|_| ".."))
            .finish()
    }
}

/// A decoded image together with the metadata collected while decoding it.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub image: DynamicImage,
    pub metadata: Metadata,
}

/// Dimensions and colour model, read without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub color: ColorType,
}

/// A named image codec.
///
/// Codecs hold no per-call state: every operation takes `&self`, so a single
/// registered instance serves any number of concurrent conversions.
pub trait Codec: Send + Sync {
    /// Canonical, unique name (`"png"`, `"jpeg"`).
    fn name(&self) -> &str;

    /// Alternate names, typically file extensions (`"jpg"`).
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    fn decoder(&self) -> Option<&dyn Decoder> {
        None
    }

    fn encoder(&self) -> Option<&dyn Encoder> {
        None
    }
}

/// Decode capability.
pub trait Decoder: Send + Sync {
    /// Leading-byte patterns identifying this format.
    fn signatures(&self) -> &[Signature];

    fn decode(
        &self,
        reader: &mut dyn BufRead,
        options: &DecodeOptions,
    ) -> Result<Decoded, CodecError>;

    fn decode_config(
        &self,
        reader: &mut dyn BufRead,
        options: &DecodeOptions,
    ) -> Result<ImageInfo, CodecError>;
}

/// Encode capability.
pub trait Encoder: Send + Sync {
    fn encode(
        &self,
        writer: &mut dyn Write,
        image: &DynamicImage,
        options: &EncodeOptions<'_>,
    ) -> Result<(), CodecError>;
}
