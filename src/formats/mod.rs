//! Built-in codecs.
//!
//! Pixel decoding and encoding are delegated to the `image` crate (and to the
//! `png` crate for PNG output, which needs to place text chunks). These
//! adapters only map names, signatures and options.
//!
//! | Codec | Aliases | Decode | Encode | Metadata |
//! |---|---|---|---|---|
//! | `png` | | yes | yes | text entries + comments |
//! | `jpeg` | `jpg` `jfif` `jpi` | yes | yes | |
//! | `gif` | | yes | yes | |
//! | `webp` | | yes | | |
//! | `bmp` | `dib` | yes | yes | |
//! | `tiff` | `tif` | yes | yes | |
//! | `qoi` | | yes | yes | |
//! | `pnm` `pbm` `pgm` `ppm` `pam` | | yes | yes | comments |
//! | `avif` | | | yes | |

pub mod netpbm;
pub mod png;
pub mod raster;

use crate::codec::{CodecError, CodecRegistry, ImageInfo};
use image::{ImageDecoder, ImageFormat, ImageReader};
use std::io::{BufRead, Cursor};

pub use self::png::{PngChunks, PngCodec, RawChunk};
pub use netpbm::{NetpbmCodec, PnmKind};
pub use raster::{Raster, RasterCodec};

/// Register every built-in codec, in detection order.
pub fn register_builtin(registry: &mut CodecRegistry) -> Result<(), CodecError> {
    registry.register(PngCodec)?;
    for raster in [Raster::Jpeg, Raster::Gif, Raster::WebP, Raster::Bmp, Raster::Tiff, Raster::Qoi] {
        registry.register(RasterCodec::new(raster))?;
    }
    for kind in PnmKind::ALL {
        registry.register(NetpbmCodec::new(kind))?;
    }
    registry.register(RasterCodec::new(Raster::Avif))?;
    Ok(())
}

/// Drain a stream into memory. The `image` decoders want `Seek`, which a
/// pipe cannot offer.
pub(crate) fn read_all(reader: &mut dyn BufRead) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Header-only probe: dimensions and colour type without decoding pixels.
pub(crate) fn probe(bytes: Vec<u8>, format: ImageFormat) -> Result<ImageInfo, CodecError> {
    let decoder = ImageReader::with_format(Cursor::new(bytes), format).into_decoder()?;
    let (width, height) = decoder.dimensions();
    Ok(ImageInfo {
        width,
        height,
        color: decoder.color_type(),
    })
}
