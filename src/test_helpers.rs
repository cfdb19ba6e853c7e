//! Shared test utilities: synthetic images and a recording mock codec.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let codec = MockCodec::new("fake", &[b"FAKE"]).with_aliases(&["fk"]);
//! let log = codec.log();
//! let mut registry = CodecRegistry::new();
//! registry.register(codec).unwrap();
//!
//! registry.decode(&b"FAKE..."[..], &DecodeOptions::default()).unwrap();
//! assert!(matches!(log.lock().unwrap()[0], RecordedOp::Decode { .. }));
//! ```

use std::io::{BufRead, Cursor, Write};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::codec::{
    Codec, CodecError, DecodeOptions, Decoded, Decoder, EncodeOptions, Encoder, ImageInfo,
    Signature,
};
use crate::metadata::Metadata;

// =========================================================================
// Synthetic images
// =========================================================================

/// Opaque RGBA image whose pixels differ in every channel.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    let w = width.max(1);
    let h = height.max(1);
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / w) as u8,
            (y * 255 / h) as u8,
            ((x + y) * 7 % 256) as u8,
            255,
        ])
    }))
}

/// Single-colour RGBA image.
pub fn solid(width: u32, height: u32, pixel: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(pixel)))
}

/// Encode with the `image` crate's own PNG writer (no text chunks).
pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

// =========================================================================
// Mock codec
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    Decode {
        codec: String,
        bytes: Vec<u8>,
    },
    DecodeConfig {
        codec: String,
    },
    Encode {
        codec: String,
        width: u32,
        height: u32,
        compression_level: i32,
        comments: Vec<String>,
    },
}

/// Codec that records calls instead of touching pixels.
///
/// Decoding yields a blank image of `decoded_size` carrying
/// `decoded_comments`; encoding writes the codec name. The log is shared, so
/// it stays readable after the codec is moved into a registry.
pub struct MockCodec {
    name: String,
    aliases: Vec<&'static str>,
    signatures: Vec<Signature>,
    decodes: bool,
    encodes: bool,
    decoded_size: (u32, u32),
    decoded_comments: Vec<String>,
    log: Arc<Mutex<Vec<RecordedOp>>>,
}

impl MockCodec {
    pub fn new(name: &str, signatures: &[&'static [u8]]) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            signatures: signatures.iter().map(|&s| Signature::from_static(s)).collect(),
            decodes: true,
            encodes: true,
            decoded_size: (2, 2),
            decoded_comments: Vec::new(),
            log: Arc::default(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&'static str]) -> Self {
        self.aliases = aliases.to_vec();
        self
    }

    pub fn decode_only(mut self) -> Self {
        self.encodes = false;
        self
    }

    pub fn encode_only(mut self) -> Self {
        self.decodes = false;
        self
    }

    pub fn with_decoded_size(mut self, width: u32, height: u32) -> Self {
        self.decoded_size = (width, height);
        self
    }

    pub fn with_decoded_comments(mut self, comments: &[&str]) -> Self {
        self.decoded_comments = comments.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<RecordedOp>>> {
        Arc::clone(&self.log)
    }

    fn record(&self, op: RecordedOp) {
        self.log.lock().unwrap().push(op);
    }
}

impl Codec for MockCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[&'static str] {
        &self.aliases
    }

    fn decoder(&self) -> Option<&dyn Decoder> {
        self.decodes.then_some(self as &dyn Decoder)
    }

    fn encoder(&self) -> Option<&dyn Encoder> {
        self.encodes.then_some(self as &dyn Encoder)
    }
}

impl Decoder for MockCodec {
    fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    fn decode(
        &self,
        reader: &mut dyn BufRead,
        options: &DecodeOptions,
    ) -> Result<Decoded, CodecError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.record(RecordedOp::Decode {
            codec: self.name.clone(),
            bytes,
        });

        let mut metadata = Metadata::new();
        if options.read_metadata {
            metadata.comments = self.decoded_comments.clone();
        }
        let (w, h) = self.decoded_size;
        Ok(Decoded {
            image: DynamicImage::new_rgba8(w, h),
            metadata,
        })
    }

    fn decode_config(
        &self,
        _reader: &mut dyn BufRead,
        _options: &DecodeOptions,
    ) -> Result<ImageInfo, CodecError> {
        self.record(RecordedOp::DecodeConfig {
            codec: self.name.clone(),
        });
        let (width, height) = self.decoded_size;
        Ok(ImageInfo {
            width,
            height,
            color: image::ColorType::Rgba8,
        })
    }
}

impl Encoder for MockCodec {
    fn encode(
        &self,
        writer: &mut dyn Write,
        image: &DynamicImage,
        options: &EncodeOptions<'_>,
    ) -> Result<(), CodecError> {
        self.record(RecordedOp::Encode {
            codec: self.name.clone(),
            width: image.width(),
            height: image.height(),
            compression_level: options.compression_level.value(),
            comments: options
                .metadata
                .map(|m| m.comments.clone())
                .unwrap_or_default(),
        });
        writer.write_all(self.name.as_bytes())?;
        Ok(())
    }
}
