//! Adapters for the `image` crate's codecs that carry no metadata.
//!
//! | Codec | Decode | Encode |
//! |---|---|---|
//! | JPEG | `image` | `JpegEncoder`, quality = 100 − level |
//! | GIF | `image` | `GifEncoder`, single frame |
//! | WebP | `image` | (none) |
//! | BMP | `image` | `BmpEncoder` |
//! | TIFF | `image` | `TiffEncoder` (buffered, needs `Seek`) |
//! | QOI | `image` | `QoiEncoder` |
//! | AVIF | (none) | `AvifEncoder` (rav1e, speed 6) |
//!
//! AVIF decoding needs the `avif-native` feature (dav1d, a C library), so the
//! codec is encode-only.

use crate::codec::{
    Codec, CodecError, DecodeOptions, Decoded, Decoder, EncodeOptions, Encoder, ImageInfo,
    Signature,
};
use crate::imaging::CompressionLevel;
use crate::metadata::Metadata;
use image::codecs::avif::AvifEncoder;
use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::qoi::QoiEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, Frame, ImageFormat};
use std::borrow::Cow;
use std::io::{BufRead, Cursor, Write};

/// JPEG quality when the level is left to the codec.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;
/// AVIF quality when the level is left to the codec.
pub const DEFAULT_AVIF_QUALITY: u8 = 90;
const AVIF_SPEED: u8 = 6;

static JPEG_SIGNATURES: [Signature; 1] = [Signature::from_static(b"\xff\xd8")];
static GIF_SIGNATURES: [Signature; 2] = [
    Signature::from_static(b"GIF89a"),
    Signature::from_static(b"GIF87a"),
];
static WEBP_SIGNATURES: [Signature; 1] = [Signature::from_static(b"RIFF????WEBPVP8")];
static BMP_SIGNATURES: [Signature; 1] = [Signature::from_static(b"BM????\0\0\0\0")];
static TIFF_SIGNATURES: [Signature; 2] = [
    Signature::from_static(b"II*\0"),
    Signature::from_static(b"MM\0*"),
];
static QOI_SIGNATURES: [Signature; 1] = [Signature::from_static(b"qoif")];

/// Container formats handled by [`RasterCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Raster {
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Qoi,
    Avif,
}

impl Raster {
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Qoi => "qoi",
            Self::Avif => "avif",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jfif", "jpi"],
            Self::Bmp => &["dib"],
            Self::Tiff => &["tif"],
            _ => &[],
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
            Self::WebP => ImageFormat::WebP,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
            Self::Qoi => ImageFormat::Qoi,
            Self::Avif => ImageFormat::Avif,
        }
    }

    /// Magic signatures; empty for formats this crate cannot decode.
    pub fn signatures(self) -> &'static [Signature] {
        match self {
            Self::Jpeg => &JPEG_SIGNATURES,
            Self::Gif => &GIF_SIGNATURES,
            Self::WebP => &WEBP_SIGNATURES,
            Self::Bmp => &BMP_SIGNATURES,
            Self::Tiff => &TIFF_SIGNATURES,
            Self::Qoi => &QOI_SIGNATURES,
            Self::Avif => &[],
        }
    }

    pub fn can_decode(self) -> bool {
        self != Self::Avif
    }

    pub fn can_encode(self) -> bool {
        self != Self::WebP
    }
}

/// A metadata-less codec backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RasterCodec {
    raster: Raster,
}

impl RasterCodec {
    pub fn new(raster: Raster) -> Self {
        Self { raster }
    }

    pub fn raster(&self) -> Raster {
        self.raster
    }
}

impl Codec for RasterCodec {
    fn name(&self) -> &str {
        self.raster.name()
    }

    fn aliases(&self) -> &[&'static str] {
        self.raster.aliases()
    }

    fn decoder(&self) -> Option<&dyn Decoder> {
        self.raster.can_decode().then_some(self as &dyn Decoder)
    }

    fn encoder(&self) -> Option<&dyn Encoder> {
        self.raster.can_encode().then_some(self as &dyn Encoder)
    }
}

impl Decoder for RasterCodec {
    fn signatures(&self) -> &[Signature] {
        self.raster.signatures()
    }

    fn decode(
        &self,
        reader: &mut dyn BufRead,
        _options: &DecodeOptions,
    ) -> Result<Decoded, CodecError> {
        let bytes = super::read_all(reader)?;
        let image = image::load_from_memory_with_format(&bytes, self.raster.image_format())?;
        Ok(Decoded {
            image,
            metadata: Metadata::new(),
        })
    }

    fn decode_config(
        &self,
        reader: &mut dyn BufRead,
        _options: &DecodeOptions,
    ) -> Result<ImageInfo, CodecError> {
        super::probe(super::read_all(reader)?, self.raster.image_format())
    }
}

impl Encoder for RasterCodec {
    fn encode(
        &self,
        mut writer: &mut dyn Write,
        image: &DynamicImage,
        options: &EncodeOptions<'_>,
    ) -> Result<(), CodecError> {
        let level = options.compression_level;
        match self.raster {
            Raster::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(writer, jpeg_quality(level));
                without_alpha(image).write_with_encoder(encoder)?;
            }
            Raster::Gif => {
                let mut encoder = GifEncoder::new(writer);
                encoder.encode_frame(Frame::new(image.to_rgba8()))?;
            }
            Raster::Bmp => {
                let encoder = BmpEncoder::new(&mut writer);
                eight_bit(image).write_with_encoder(encoder)?;
            }
            Raster::Tiff => {
                // TIFF offsets are patched after the fact, which needs `Seek`.
                let mut buf = Cursor::new(Vec::new());
                eight_bit(image).write_with_encoder(TiffEncoder::new(&mut buf))?;
                writer.write_all(buf.get_ref())?;
            }
            Raster::Qoi => {
                let rgb = match image {
                    DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
                    _ if image.color().has_alpha() => Cow::Owned(image.to_rgba8().into()),
                    _ => Cow::Owned(image.to_rgb8().into()),
                };
                rgb.write_with_encoder(QoiEncoder::new(writer))?;
            }
            Raster::Avif => {
                let encoder =
                    AvifEncoder::new_with_speed_quality(writer, AVIF_SPEED, avif_quality(level));
                eight_bit(image).write_with_encoder(encoder)?;
            }
            Raster::WebP => {
                return Err(CodecError::Unsupported("webp encoding".into()));
            }
        }
        Ok(())
    }
}

/// JPEG quality for a compression level: `100 - level`, or the codec default
/// when the level is unset or leaves no quality at all.
pub fn jpeg_quality(level: CompressionLevel) -> u8 {
    match level.value() {
        l @ 0..100 => (100 - l) as u8,
        _ => DEFAULT_JPEG_QUALITY,
    }
}

/// AVIF quality for a compression level, floored at 1.
pub fn avif_quality(level: CompressionLevel) -> u8 {
    if level.is_default() {
        DEFAULT_AVIF_QUALITY
    } else {
        (100 - level.value()).max(1) as u8
    }
}

/// Drop the alpha channel (JPEG has none); grayscale stays grayscale.
fn without_alpha(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            Cow::Owned(image.to_luma8().into())
        }
        _ => Cow::Owned(image.to_rgb8().into()),
    }
}

/// Narrow to the 8-bit layouts every encoder here accepts.
fn eight_bit(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            Cow::Borrowed(image)
        }
        _ if image.color().has_alpha() => Cow::Owned(image.to_rgba8().into()),
        _ => Cow::Owned(image.to_rgb8().into()),
    }
}
