//! Netpbm family (`pnm`, `pbm`, `pgm`, `ppm`, `pam`) with header comments.
//!
//! All five names share the `P1`..`P7` signatures and decode anything in the
//! family; they differ in which subtype they write. `#` comment lines in the
//! header map to [`Metadata::comments`] in both directions.

use crate::codec::{
    Codec, CodecError, DecodeOptions, Decoded, Decoder, EncodeOptions, Encoder, ImageInfo,
    Signature,
};
use crate::metadata::Metadata;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::io::{BufRead, Write};

static SIGNATURES: [Signature; 7] = [
    Signature::from_static(b"P1"),
    Signature::from_static(b"P2"),
    Signature::from_static(b"P3"),
    Signature::from_static(b"P4"),
    Signature::from_static(b"P5"),
    Signature::from_static(b"P6"),
    Signature::from_static(b"P7"),
];

/// Which member of the family a codec writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PnmKind {
    /// Graymap or pixmap depending on the image.
    Any,
    Bitmap,
    Graymap,
    Pixmap,
    Arbitrary,
}

impl PnmKind {
    pub const ALL: [PnmKind; 5] = [
        Self::Any,
        Self::Bitmap,
        Self::Graymap,
        Self::Pixmap,
        Self::Arbitrary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "pnm",
            Self::Bitmap => "pbm",
            Self::Graymap => "pgm",
            Self::Pixmap => "ppm",
            Self::Arbitrary => "pam",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetpbmCodec {
    kind: PnmKind,
}

impl NetpbmCodec {
    pub fn new(kind: PnmKind) -> Self {
        Self { kind }
    }
}

impl Codec for NetpbmCodec {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn decoder(&self) -> Option<&dyn Decoder> {
        Some(self)
    }

    fn encoder(&self) -> Option<&dyn Encoder> {
        Some(self)
    }
}

impl Decoder for NetpbmCodec {
    fn signatures(&self) -> &[Signature] {
        &SIGNATURES
    }

    fn decode(
        &self,
        reader: &mut dyn BufRead,
        options: &DecodeOptions,
    ) -> Result<Decoded, CodecError> {
        let bytes = super::read_all(reader)?;
        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Pnm)?;
        let mut metadata = Metadata::new();
        if options.read_metadata {
            metadata.comments = header_comments(&bytes);
        }
        Ok(Decoded { image, metadata })
    }

    fn decode_config(
        &self,
        reader: &mut dyn BufRead,
        _options: &DecodeOptions,
    ) -> Result<ImageInfo, CodecError> {
        super::probe(super::read_all(reader)?, ImageFormat::Pnm)
    }
}

impl Encoder for NetpbmCodec {
    fn encode(
        &self,
        writer: &mut dyn Write,
        image: &DynamicImage,
        options: &EncodeOptions<'_>,
    ) -> Result<(), CodecError> {
        let (subtype, pixels) = self.layout(image);
        let mut encoded = Vec::new();
        let encoder = match subtype {
            Some(subtype) => PnmEncoder::new(&mut encoded).with_subtype(subtype),
            None => PnmEncoder::new(&mut encoded),
        };
        pixels.write_with_encoder(encoder)?;

        let comments = options
            .metadata
            .map(|m| m.comments.as_slice())
            .unwrap_or_default();
        insert_header_comments(&mut encoded, comments);
        writer.write_all(&encoded)?;
        Ok(())
    }
}

impl NetpbmCodec {
    /// Subtype to force and the pixels converted to what it accepts.
    fn layout<'a>(&self, image: &'a DynamicImage) -> (Option<PnmSubtype>, Cow<'a, DynamicImage>) {
        let binary = SampleEncoding::Binary;
        match self.kind {
            PnmKind::Bitmap => (Some(PnmSubtype::Bitmap(binary)), bitmap_pixels(image)),
            PnmKind::Graymap => (
                Some(PnmSubtype::Graymap(binary)),
                Cow::Owned(image.to_luma8().into()),
            ),
            PnmKind::Pixmap => (
                Some(PnmSubtype::Pixmap(binary)),
                Cow::Owned(image.to_rgb8().into()),
            ),
            PnmKind::Arbitrary => (Some(PnmSubtype::ArbitraryMap), pam_pixels(image)),
            PnmKind::Any => (None, pnm_pixels(image)),
        }
    }
}

/// Threshold to the 0/1 samples a bitmap holds. 1 is black.
fn bitmap_pixels(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    let mut gray = image.to_luma8();
    for pixel in gray.pixels_mut() {
        pixel.0[0] = u8::from(pixel.0[0] < 128);
    }
    Cow::Owned(DynamicImage::ImageLuma8(gray))
}

fn pnm_pixels(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            Cow::Owned(image.to_luma8().into())
        }
        _ => Cow::Owned(image.to_rgb8().into()),
    }
}

fn pam_pixels(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
        _ if image.color().has_alpha() => Cow::Owned(image.to_rgba8().into()),
        _ => Cow::Owned(image.to_rgb8().into()),
    }
}

/// `# ` comment lines from a netpbm header, without the marker.
///
/// Scans only the header: for `P1`..`P6` up to the last size token, for `P7`
/// up to `ENDHDR`. A single space after `#` is dropped.
pub fn header_comments(bytes: &[u8]) -> Vec<String> {
    let mut comments = Vec::new();
    let Some(magic) = bytes.get(..2) else {
        return comments;
    };
    let tokens_needed = match magic {
        b"P1" | b"P4" => 2,
        b"P2" | b"P3" | b"P5" | b"P6" => 3,
        b"P7" => usize::MAX,
        _ => return comments,
    };

    let mut pos = 2;
    let mut tokens = 0;
    while pos < bytes.len() && tokens < tokens_needed {
        match bytes[pos] {
            b'#' => {
                let end = bytes[pos..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |n| pos + n);
                let text = &bytes[pos + 1..end];
                let text = text.strip_prefix(b" ").unwrap_or(text);
                let text = text.strip_suffix(b"\r").unwrap_or(text);
                comments.push(String::from_utf8_lossy(text).into_owned());
                pos = end;
            }
            b if b.is_ascii_whitespace() => pos += 1,
            _ => {
                let end = bytes[pos..]
                    .iter()
                    .position(|b| b.is_ascii_whitespace())
                    .map_or(bytes.len(), |n| pos + n);
                if &bytes[pos..end] == b"ENDHDR" {
                    break;
                }
                tokens += 1;
                pos = end;
            }
        }
    }
    comments
}

/// Insert `comments` as header lines directly after the magic number.
fn insert_header_comments(encoded: &mut Vec<u8>, comments: &[String]) {
    if comments.is_empty() || encoded.len() < 2 {
        return;
    }
    let mut block = Vec::new();
    // Keep the magic on its own line.
    let at = if encoded.get(2) == Some(&b'\n') {
        3
    } else {
        block.push(b'\n');
        2
    };
    for comment in comments {
        block.extend_from_slice(b"# ");
        // A line break would end the comment early.
        block.extend(comment.bytes().map(|b| if b == b'\n' || b == b'\r' { b' ' } else { b }));
        block.push(b'\n');
    }
    encoded.splice(at..at, block);
}
