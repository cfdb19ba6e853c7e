//! PNG codec with text metadata.
//!
//! Decoding walks the chunk framing once to hand every ancillary chunk to a
//! [`TextChunkCollector`], then lets the `image` crate decode the pixels.
//! Encoding goes through the `png` crate directly so the text chunks can be
//! written between `IHDR` and `IDAT`.

use crate::chunk::{ChunkTag, ChunkVisitor, TextChunkCollector, metadata_to_chunks};
use crate::codec::{
    Codec, CodecError, DecodeOptions, Decoded, Decoder, EncodeOptions, Encoder, ImageInfo,
    Signature,
};
use crate::imaging::CompressionLevel;
use crate::metadata::Metadata;
use image::{DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

const PNG_MAGIC: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

static SIGNATURES: [Signature; 1] = [Signature::from_static(PNG_MAGIC)];

/// The `png` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl Codec for PngCodec {
    fn name(&self) -> &str {
        "png"
    }

    fn decoder(&self) -> Option<&dyn Decoder> {
        Some(self)
    }

    fn encoder(&self) -> Option<&dyn Encoder> {
        Some(self)
    }
}

impl Decoder for PngCodec {
    fn signatures(&self) -> &[Signature] {
        &SIGNATURES
    }

    fn decode(
        &self,
        reader: &mut dyn BufRead,
        options: &DecodeOptions,
    ) -> Result<Decoded, CodecError> {
        let bytes = super::read_all(reader)?;

        let metadata = if options.read_metadata {
            collect_text_metadata(&bytes, options.strict)?
        } else {
            Metadata::new()
        };

        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
        Ok(Decoded { image, metadata })
    }

    fn decode_config(
        &self,
        reader: &mut dyn BufRead,
        _options: &DecodeOptions,
    ) -> Result<ImageInfo, CodecError> {
        super::probe(super::read_all(reader)?, ImageFormat::Png)
    }
}

impl Encoder for PngCodec {
    fn encode(
        &self,
        writer: &mut dyn Write,
        image: &DynamicImage,
        options: &EncodeOptions<'_>,
    ) -> Result<(), CodecError> {
        let chunks = match options.metadata {
            Some(metadata) => metadata_to_chunks(metadata)?,
            None => Vec::new(),
        };
        let (color, depth, data) = png_layout(image);

        let mut encoder = png::Encoder::new(writer, image.width(), image.height());
        encoder.set_color(color);
        encoder.set_depth(depth);
        encoder.set_compression(png_compression(options.compression_level));

        let mut png_writer = encoder.write_header()?;
        for chunk in &chunks {
            png_writer.write_chunk(png::chunk::ChunkType(chunk.tag), &chunk.payload)?;
        }
        debug!(text_chunks = chunks.len(), "writing PNG");
        png_writer.write_image_data(&data)?;
        png_writer.finish()?;
        Ok(())
    }
}

/// Feed every ancillary chunk of `bytes` to a [`TextChunkCollector`].
///
/// A framing error ends the walk. Lenient decoding keeps what was collected
/// before it and leaves the pixel decoder to judge the stream.
fn collect_text_metadata(bytes: &[u8], strict: bool) -> Result<Metadata, CodecError> {
    let mut collector = TextChunkCollector::new(strict);
    for chunk in PngChunks::new(bytes)? {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) if !strict => {
                warn!(error = %err, "stopped reading PNG metadata");
                break;
            }
            Err(err) => return Err(err),
        };
        if chunk.is_ancillary() {
            collector.visit(chunk.tag, chunk.data)?;
        }
    }
    Ok(collector.into_metadata())
}

/// Map the 0–100 level scale onto the `png` crate's presets.
pub fn png_compression(level: CompressionLevel) -> png::Compression {
    match level.value() {
        l if l < 0 => png::Compression::default(),
        0 => png::Compression::NoCompression,
        l if l < 50 => png::Compression::Fast,
        l if l < 75 => png::Compression::Balanced,
        _ => png::Compression::High,
    }
}

/// Colour type, bit depth and big-endian sample bytes for `image`. Layouts
/// PNG has no direct equivalent for are widened to 8-bit RGBA.
fn png_layout(image: &DynamicImage) -> (png::ColorType, png::BitDepth, Cow<'_, [u8]>) {
    use png::{BitDepth, ColorType};

    fn be(samples: &[u16]) -> Cow<'static, [u8]> {
        Cow::Owned(samples.iter().flat_map(|s| s.to_be_bytes()).collect())
    }

    match image {
        DynamicImage::ImageLuma8(b) => (ColorType::Grayscale, BitDepth::Eight, Cow::Borrowed(b.as_raw())),
        DynamicImage::ImageLumaA8(b) => (ColorType::GrayscaleAlpha, BitDepth::Eight, Cow::Borrowed(b.as_raw())),
        DynamicImage::ImageRgb8(b) => (ColorType::Rgb, BitDepth::Eight, Cow::Borrowed(b.as_raw())),
        DynamicImage::ImageRgba8(b) => (ColorType::Rgba, BitDepth::Eight, Cow::Borrowed(b.as_raw())),
        DynamicImage::ImageLuma16(b) => (ColorType::Grayscale, BitDepth::Sixteen, be(b.as_raw())),
        DynamicImage::ImageLumaA16(b) => (ColorType::GrayscaleAlpha, BitDepth::Sixteen, be(b.as_raw())),
        DynamicImage::ImageRgb16(b) => (ColorType::Rgb, BitDepth::Sixteen, be(b.as_raw())),
        DynamicImage::ImageRgba16(b) => (ColorType::Rgba, BitDepth::Sixteen, be(b.as_raw())),
        other => (
            ColorType::Rgba,
            BitDepth::Eight,
            Cow::Owned(other.to_rgba8().into_raw()),
        ),
    }
}

/// One framed chunk inside a PNG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk<'a> {
    pub tag: ChunkTag,
    pub data: &'a [u8],
}

impl RawChunk<'_> {
    /// Lower-case first letter: decoders may skip the chunk.
    pub fn is_ancillary(&self) -> bool {
        self.tag[0] & 0x20 != 0
    }
}

/// Iterator over the `length ‖ tag ‖ data ‖ crc` records of a PNG stream.
///
/// Stops after `IEND`. CRCs are not checked here; the pixel decoder does
/// that.
pub struct PngChunks<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> PngChunks<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, CodecError> {
        if !data.starts_with(PNG_MAGIC) {
            return Err(CodecError::Format("not a PNG stream".into()));
        }
        Ok(Self {
            data,
            pos: PNG_MAGIC.len(),
            done: false,
        })
    }

    fn truncated(&mut self) -> Option<Result<RawChunk<'a>, CodecError>> {
        self.done = true;
        Some(Err(CodecError::Format(format!(
            "truncated PNG chunk at offset {}",
            self.pos
        ))))
    }
}

impl<'a> Iterator for PngChunks<'a> {
    type Item = Result<RawChunk<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos == self.data.len() {
            return None;
        }
        let Some(header) = self.data.get(self.pos..self.pos + 8) else {
            return self.truncated();
        };
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let tag: ChunkTag = [header[4], header[5], header[6], header[7]];

        let start = self.pos + 8;
        let Some(data) = start
            .checked_add(length)
            .filter(|end| end + 4 <= self.data.len())
            .map(|end| &self.data[start..end])
        else {
            return self.truncated();
        };

        self.pos = start + length + 4;
        if &tag == b"IEND" {
            self.done = true;
        }
        Some(Ok(RawChunk { tag, data }))
    }
}
