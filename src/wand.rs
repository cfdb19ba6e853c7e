//! The Wand: one image in progress plus its metadata.
//!
//! A [`Wand`] is acquired from a stream ([`Wand::decode`], [`Wand::read_image`])
//! or allocated ([`Wand::new_image`]), transformed any number of times, then
//! persisted ([`Wand::encode`], [`Wand::write_image`]). Encoding leaves the
//! state alone, so one decoded image can be written to several formats.
//!
//! A wand with no pixel buffer is *empty*. Its dimensions and hash are 0 and
//! it encodes as a 0×0 placeholder rather than failing, so a batch still
//! produces an output for every input.
//!
//! A wand is not synchronised; give each worker its own. The
//! [`CodecRegistry`] it borrows is read-only and can be shared.

use crate::codec::{CodecError, CodecRegistry, DecodeOptions, EncodeOptions};
use crate::imaging::{
    CompressionLevel, HASH_GRID_HEIGHT, HASH_GRID_WIDTH, ResizeStrategy, area_fit, diff_hash,
};
use crate::metadata::Metadata;
use crate::template;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use serde::Serialize;
use std::cell::OnceCell;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Format used by [`Wand::write_image`] when the target names none.
pub const DEFAULT_FORMAT: &str = "png";

/// Path meaning stdin for reads and stdout for writes.
pub const STDIO_PATH: &str = "-";

#[derive(Debug, Clone, Default)]
pub struct Wand {
    image: Option<DynamicImage>,
    metadata: Metadata,
    decode_options: DecodeOptions,
    compression_level: CompressionLevel,
}

/// Payload of the `json` property.
#[derive(Serialize)]
struct Properties {
    width: u32,
    height: u32,
    hash: u64,
}

impl Wand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pixel buffer with a zeroed RGBA image. `new_image(0, 0)`
    /// resets the wand to empty.
    pub fn new_image(&mut self, width: u32, height: u32) {
        self.image = Some(DynamicImage::new_rgba8(width, height));
    }

    pub fn set_image(&mut self, image: DynamicImage) {
        self.image = Some(image);
    }

    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref()
    }

    pub fn take_image(&mut self) -> Option<DynamicImage> {
        self.image.take()
    }

    /// True when there is no buffer or the buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn width(&self) -> u32 {
        self.image.as_ref().map_or(0, DynamicImage::width)
    }

    pub fn height(&self) -> u32 {
        self.image.as_ref().map_or(0, DynamicImage::height)
    }

    // =====================================================================
    // Acquire and persist
    // =====================================================================

    /// Detect the format of `reader` and decode it into this wand.
    ///
    /// Decoded metadata is appended after what the wand already holds. Codec
    /// errors are returned as-is and leave the wand untouched.
    pub fn decode(&mut self, registry: &CodecRegistry, reader: impl Read) -> Result<(), CodecError> {
        let decoded = registry.decode(reader, &self.decode_options)?;
        debug!(
            width = decoded.image.width(),
            height = decoded.image.height(),
            comments = decoded.metadata.comments.len(),
            text = decoded.metadata.text.len(),
            "decoded image"
        );
        self.image = Some(decoded.image);
        self.metadata.absorb(decoded.metadata);
        Ok(())
    }

    /// Encode the image as `format`, together with the wand's metadata.
    pub fn encode(
        &self,
        registry: &CodecRegistry,
        writer: &mut dyn Write,
        format: &str,
    ) -> Result<(), CodecError> {
        let placeholder;
        let image = match &self.image {
            Some(image) => image,
            None => {
                placeholder = DynamicImage::new_rgba8(0, 0);
                &placeholder
            }
        };
        let options = EncodeOptions {
            compression_level: self.compression_level,
            metadata: Some(&self.metadata),
            specific: self.metadata.specific.clone(),
        };
        registry.encode(format, writer, image, &options)
    }

    /// Decode the file at `path`, or stdin for `-`.
    pub fn read_image(&mut self, registry: &CodecRegistry, path: &str) -> Result<(), CodecError> {
        if path == STDIO_PATH {
            return self.decode(registry, io::stdin().lock());
        }
        let file = File::open(path)?;
        self.decode(registry, BufReader::new(file))
    }

    /// Write the image to `target` and return the canonical format used.
    ///
    /// The format comes from a `format:` prefix if it names an encoder, else
    /// from the file extension, else [`DEFAULT_FORMAT`]. `-` is stdout.
    pub fn write_image(&self, registry: &CodecRegistry, target: &str) -> Result<String, CodecError> {
        self.write_image_or(registry, target, DEFAULT_FORMAT)
    }

    /// [`Wand::write_image`] with a caller-chosen fallback format.
    pub fn write_image_or(
        &self,
        registry: &CodecRegistry,
        target: &str,
        fallback: &str,
    ) -> Result<String, CodecError> {
        let (format, path) = output_target(registry, target, fallback);
        if path == STDIO_PATH {
            let mut out = io::stdout().lock();
            self.encode(registry, &mut out, &format)?;
            out.flush()?;
        } else {
            let mut out = BufWriter::new(File::create(path)?);
            self.encode(registry, &mut out, &format)?;
            out.flush()?;
        }
        Ok(format)
    }

    // =====================================================================
    // Transforms
    // =====================================================================

    /// Resample to `width`×`height`.
    ///
    /// Same size is a no-op. If either the current or the requested size has
    /// no pixels, the result is a zeroed buffer of the requested size.
    pub fn resize(&mut self, width: u32, height: u32, strategy: ResizeStrategy) {
        if (self.width(), self.height()) == (width, height) && self.image.is_some() {
            return;
        }
        debug!(from_w = self.width(), from_h = self.height(), width, height, ?strategy, "resize");
        self.image = Some(match &self.image {
            Some(img) if !self.is_empty() && width > 0 && height > 0 => {
                img.resize_exact(width, height, strategy.filter())
            }
            _ => DynamicImage::new_rgba8(width, height),
        });
    }

    /// Resize to the largest same-aspect size within `max_area` pixels.
    pub fn resize_max_area(&mut self, max_area: u64, strategy: ResizeStrategy) {
        let (width, height) = area_fit(self.width(), self.height(), max_area);
        self.resize(width, height, strategy);
    }

    /// Cut a `width`×`height` window whose top-left corner sits at
    /// (`x_offset`, `y_offset`) in the current image.
    ///
    /// The window may extend past the image on any side; those pixels are
    /// zero.
    pub fn crop(&mut self, width: u32, height: u32, x_offset: i64, y_offset: i64) {
        let (cur_w, cur_h) = (self.width(), self.height());
        if (cur_w, cur_h) == (width, height) && x_offset == 0 && y_offset == 0 && self.image.is_some() {
            return;
        }
        debug!(width, height, x_offset, y_offset, "crop");

        let cropped = match &self.image {
            Some(img) if !self.is_empty() && width > 0 && height > 0 => {
                // Past these bounds the window misses the image entirely.
                let x = x_offset.clamp(-i64::from(width), i64::from(cur_w));
                let y = y_offset.clamp(-i64::from(height), i64::from(cur_h));
                let inside = x >= 0
                    && y >= 0
                    && x + i64::from(width) <= i64::from(cur_w)
                    && y + i64::from(height) <= i64::from(cur_h);
                if inside {
                    img.crop_imm(x as u32, y as u32, width, height)
                } else {
                    let mut canvas = RgbaImage::new(width, height);
                    imageops::replace(&mut canvas, &img.to_rgba8(), -x, -y);
                    DynamicImage::ImageRgba8(canvas)
                }
            }
            _ => DynamicImage::new_rgba8(width, height),
        };
        self.image = Some(cropped);
    }

    /// Convert the buffer to 8-bit RGBA. Opaque sources get alpha 255.
    pub fn force_rgba(&mut self) {
        if let Some(img) = &mut self.image {
            if !matches!(img, DynamicImage::ImageRgba8(_)) {
                *img = DynamicImage::ImageRgba8(img.to_rgba8());
            }
        }
    }

    // =====================================================================
    // Derived properties
    // =====================================================================

    /// 64-bit difference hash of a nearest-neighbour 9×8 grayscale
    /// thumbnail; 0 for an empty wand.
    pub fn hash(&self) -> u64 {
        match &self.image {
            Some(img) if !self.is_empty() => {
                let grid = img
                    .resize_exact(HASH_GRID_WIDTH, HASH_GRID_HEIGHT, FilterType::Nearest)
                    .to_luma8();
                diff_hash(&grid)
            }
            _ => 0,
        }
    }

    /// Expand `%` properties in `template`.
    ///
    /// | Name | Value |
    /// |---|---|
    /// | `w`, `width` | width in pixels |
    /// | `h`, `height` | height in pixels |
    /// | `H`, `hash` | difference hash, unsigned decimal |
    /// | `J`, `json` | `{"width":…,"height":…,"hash":…}` |
    /// | `c`, `comment` | comments joined by `"; "` |
    /// | `n`, `comments` | number of comments |
    /// | `%` | a literal `%` |
    ///
    /// Unknown names expand to nothing.
    pub fn format_string(&self, template: &str) -> String {
        let hash = OnceCell::new();
        let hash = || *hash.get_or_init(|| self.hash());
        template::expand(template, |name| match name {
            "w" | "width" => self.width().to_string(),
            "h" | "height" => self.height().to_string(),
            "H" | "hash" => hash().to_string(),
            "J" | "json" => serde_json::to_string(&Properties {
                width: self.width(),
                height: self.height(),
                hash: hash(),
            })
            .unwrap_or_default(),
            "c" | "comment" => self.metadata.comments.join("; "),
            "n" | "comments" => self.metadata.comments.len().to_string(),
            "%" => "%".to_string(),
            _ => String::new(),
        })
        .into_owned()
    }

    // =====================================================================
    // Metadata
    // =====================================================================

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn comments(&self) -> &[String] {
        &self.metadata.comments
    }

    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.metadata.comments.push(comment.into());
    }

    /// Replace all comments.
    pub fn set_comments(&mut self, comments: Vec<String>) {
        self.metadata.comments = comments;
    }

    /// Drop all metadata.
    pub fn strip(&mut self) {
        self.metadata.clear();
    }

    // =====================================================================
    // Options
    // =====================================================================

    pub fn compression_level(&self) -> CompressionLevel {
        self.compression_level
    }

    /// `-1` for the codec default, otherwise clamped to `0..=100`.
    pub fn set_compression_level(&mut self, level: i32) {
        self.compression_level = CompressionLevel::new(level);
    }

    /// Lossy quality, stored as level `100 - quality`.
    pub fn set_compression_quality(&mut self, quality: u32) {
        self.compression_level = CompressionLevel::from_quality(quality);
    }

    pub fn decode_options(&self) -> DecodeOptions {
        self.decode_options
    }

    /// Abort decoding on malformed metadata instead of dropping it.
    pub fn set_strict(&mut self, strict: bool) {
        self.decode_options.strict = strict;
    }

    pub fn set_read_metadata(&mut self, read: bool) {
        self.decode_options.read_metadata = read;
    }
}

/// Split a write target into the canonical output format and the path.
///
/// `fmt:path` selects `fmt` when it names an encoder; otherwise the
/// extension of the path decides, then `fallback`.
pub fn output_target<'a>(
    registry: &CodecRegistry,
    target: &'a str,
    fallback: &str,
) -> (String, &'a str) {
    if let Some((prefix, rest)) = target.split_once(':') {
        if registry.can_encode(prefix) {
            if let Some(name) = registry.canonical_name(prefix) {
                return (name.to_string(), rest);
            }
        }
    }
    let by_extension = Path::new(target)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| registry.can_encode(ext))
        .and_then(|ext| registry.canonical_name(&ext).map(str::to_string));
    (by_extension.unwrap_or_else(|| fallback.to_string()), target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockCodec, RecordedOp, gradient, solid};
    use image::{GenericImageView, GrayImage, Luma, Rgba};
    use std::sync::{Arc, Mutex};

    fn mock_registry() -> (CodecRegistry, Arc<Mutex<Vec<RecordedOp>>>) {
        let codec = MockCodec::new("fake", &[b"FAKE"])
            .with_decoded_size(6, 4)
            .with_decoded_comments(&["from file"]);
        let log = codec.log();
        let mut registry = CodecRegistry::new();
        registry.register(codec).unwrap();
        registry
            .register(MockCodec::new("other", &[b"OTHR"]).with_aliases(&["oth"]))
            .unwrap();
        (registry, log)
    }

    fn builtin() -> CodecRegistry {
        CodecRegistry::with_builtin_codecs().unwrap()
    }

    fn wand_with(image: DynamicImage) -> Wand {
        let mut wand = Wand::new();
        wand.set_image(image);
        wand
    }

    // =========================================================================
    // Acquire / persist
    // =========================================================================

    #[test]
    fn empty_wand_encodes_zero_size_placeholder() {
        let (registry, log) = mock_registry();
        let mut out = Vec::new();
        Wand::new().encode(&registry, &mut out, "fake").unwrap();

        assert_eq!(out, b"fake");
        assert!(matches!(
            &log.lock().unwrap()[0],
            RecordedOp::Encode { width: 0, height: 0, .. }
        ));
    }

    #[test]
    fn decode_appends_decoded_metadata() {
        let (registry, _) = mock_registry();
        let mut wand = Wand::new();
        wand.add_comment("already here");
        wand.decode(&registry, &b"FAKE rest"[..]).unwrap();

        assert_eq!((wand.width(), wand.height()), (6, 4));
        assert_eq!(wand.comments(), ["already here", "from file"]);
    }

    #[test]
    fn decode_error_propagates_and_keeps_state() {
        let (registry, _) = mock_registry();
        let mut wand = wand_with(gradient(3, 3));
        let err = wand.decode(&registry, &b"????"[..]).unwrap_err();
        assert!(matches!(err, CodecError::NotFound(n) if n == "unknown"));
        assert_eq!(wand.width(), 3);
    }

    #[test]
    fn encode_does_not_consume_state() {
        let (registry, log) = mock_registry();
        let mut wand = wand_with(gradient(5, 2));
        wand.add_comment("kept");
        wand.set_compression_level(40);

        let mut a = Vec::new();
        let mut b = Vec::new();
        wand.encode(&registry, &mut a, "fake").unwrap();
        wand.encode(&registry, &mut b, "oth").unwrap();

        assert_eq!((a.as_slice(), b.as_slice()), (&b"fake"[..], &b"other"[..]));
        let ops = log.lock().unwrap();
        assert_eq!(
            ops[0],
            RecordedOp::Encode {
                codec: "fake".into(),
                width: 5,
                height: 2,
                compression_level: 40,
                comments: vec!["kept".into()],
            }
        );
        assert_eq!(wand.width(), 5);
    }

    #[test]
    fn png_round_trip_keeps_pixels_and_comments() {
        let registry = builtin();
        let mut wand = wand_with(gradient(8, 5));
        wand.add_comment("one");
        wand.add_comment("two");
        wand.metadata_mut().text.add_string("Author", "someone");

        let mut bytes = Vec::new();
        wand.encode(&registry, &mut bytes, "png").unwrap();

        let mut back = Wand::new();
        back.decode(&registry, &bytes[..]).unwrap();
        assert_eq!(back.image().unwrap().to_rgba8(), gradient(8, 5).to_rgba8());
        assert_eq!(back.comments(), ["one", "two"]);
        assert_eq!(back.metadata().text.get_string("Author"), Some("someone"));
    }

    #[test]
    fn write_and_read_files() {
        let registry = builtin();
        let tmp = tempfile::TempDir::new().unwrap();
        let wand = wand_with(gradient(4, 4));

        let by_ext = tmp.path().join("out.bmp");
        assert_eq!(wand.write_image(&registry, by_ext.to_str().unwrap()).unwrap(), "bmp");

        let by_prefix = tmp.path().join("out.data");
        let target = format!("qoi:{}", by_prefix.display());
        assert_eq!(wand.write_image(&registry, &target).unwrap(), "qoi");

        let fallback = tmp.path().join("noext");
        assert_eq!(wand.write_image(&registry, fallback.to_str().unwrap()).unwrap(), "png");

        for path in [&by_ext, &by_prefix, &fallback] {
            let mut back = Wand::new();
            back.read_image(&registry, path.to_str().unwrap()).unwrap();
            assert_eq!((back.width(), back.height()), (4, 4));
        }
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let err = Wand::new()
            .read_image(&builtin(), "/definitely/not/here.png")
            .unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }

    #[test]
    fn output_target_resolution() {
        let registry = builtin();
        assert_eq!(output_target(&registry, "jpg:x.png", "png"), ("jpeg".into(), "x.png"));
        assert_eq!(output_target(&registry, "a/b.TIF", "png"), ("tiff".into(), "a/b.TIF"));
        assert_eq!(output_target(&registry, "photo.webp", "png"), ("png".into(), "photo.webp"));
        assert_eq!(output_target(&registry, "nope:x", "gif"), ("gif".into(), "nope:x"));
        assert_eq!(output_target(&registry, "-", "png"), ("png".into(), "-"));
    }

    // =========================================================================
    // Resize
    // =========================================================================

    #[test]
    fn resize_to_same_size_is_noop() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_fn(4, 3, |x, _| Luma([x as u8])));
        let mut wand = wand_with(gray.clone());
        wand.resize(4, 3, ResizeStrategy::Lanczos3);
        assert_eq!(wand.image(), Some(&gray));
    }

    #[test]
    fn resize_changes_dimensions() {
        let mut wand = wand_with(gradient(40, 20));
        wand.resize(10, 5, ResizeStrategy::Bilinear);
        assert_eq!((wand.width(), wand.height()), (10, 5));
    }

    #[test]
    fn resize_from_empty_allocates_blank() {
        let mut wand = Wand::new();
        wand.resize(3, 2, ResizeStrategy::Nearest);
        let img = wand.image().unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert!(img.to_rgba8().pixels().all(|p| p.0 == [0; 4]));
    }

    #[test]
    fn resize_to_zero_empties() {
        let mut wand = wand_with(gradient(4, 4));
        wand.resize(0, 0, ResizeStrategy::Bilinear);
        assert!(wand.is_empty());
        assert_eq!(wand.hash(), 0);
    }

    #[test]
    fn resize_max_area_fits_budget() {
        let mut wand = wand_with(gradient(192, 108));
        wand.resize_max_area(1024, ResizeStrategy::Bilinear);
        assert_eq!((wand.width(), wand.height()), area_fit(192, 108, 1024));
        assert!(wand.width() * wand.height() <= 1024);
    }

    // =========================================================================
    // Crop
    // =========================================================================

    #[test]
    fn crop_to_same_size_without_offset_is_noop() {
        let img = gradient(5, 5);
        let mut wand = wand_with(img.clone());
        wand.crop(5, 5, 0, 0);
        assert_eq!(wand.image(), Some(&img));
    }

    #[test]
    fn crop_inside_copies_window() {
        let img = gradient(10, 10);
        let mut wand = wand_with(img.clone());
        wand.crop(3, 2, 4, 5);
        let out = wand.image().unwrap();
        assert_eq!(out.dimensions(), (3, 2));
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(4, 5));
        assert_eq!(out.get_pixel(2, 1), img.get_pixel(6, 6));
    }

    #[test]
    fn crop_past_edge_leaves_zero_pixels() {
        let mut wand = wand_with(solid(4, 4, [255, 0, 0, 255]));
        wand.crop(4, 4, 2, 2);
        let out = wand.image().unwrap().to_rgba8();
        assert_eq!(out.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(2, 2), &Rgba([0, 0, 0, 0]));
        assert_eq!(out.get_pixel(3, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn crop_negative_offset_shifts_source() {
        let mut wand = wand_with(solid(2, 2, [9, 9, 9, 255]));
        wand.crop(3, 3, -1, -1);
        let out = wand.image().unwrap().to_rgba8();
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(out.get_pixel(1, 1), &Rgba([9, 9, 9, 255]));
        assert_eq!(out.get_pixel(2, 2), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn crop_with_extreme_offsets_is_blank() {
        for (x, y) in [(i64::MAX, 0), (i64::MIN, 0), (0, i64::MAX), (0, i64::MIN)] {
            let mut wand = wand_with(gradient(4, 4));
            wand.crop(2, 2, x, y);
            assert_eq!((wand.width(), wand.height()), (2, 2));
            let out = wand.image().unwrap().to_rgba8();
            assert!(out.pixels().all(|p| p.0 == [0, 0, 0, 0]), "offset ({x}, {y})");
        }
    }

    #[test]
    fn crop_offset_just_past_edge_is_blank() {
        let mut wand = wand_with(solid(4, 4, [9, 9, 9, 255]));
        wand.crop(2, 2, -2, 4);
        let out = wand.image().unwrap().to_rgba8();
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    // =========================================================================
    // Pixel format, clone, hash
    // =========================================================================

    #[test]
    fn force_rgba_is_idempotent() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([77])));
        let mut wand = wand_with(gray);
        wand.force_rgba();
        let once = wand.image().cloned();
        wand.force_rgba();
        assert_eq!(wand.image().cloned(), once);
        assert_eq!(
            wand.image().unwrap().as_rgba8().unwrap().get_pixel(0, 0),
            &Rgba([77, 77, 77, 255])
        );
    }

    #[test]
    fn clone_shares_nothing_mutable() {
        let mut original = wand_with(gradient(3, 3));
        original.add_comment("original");
        let mut copy = original.clone();
        copy.add_comment("copy only");
        copy.crop(1, 1, 0, 0);
        copy.set_compression_level(90);

        assert_eq!(original.comments(), ["original"]);
        assert_eq!(original.width(), 3);
        assert!(original.compression_level().is_default());
    }

    #[test]
    fn hash_of_empty_wand_is_zero() {
        assert_eq!(Wand::new().hash(), 0);
    }

    #[test]
    fn hash_of_darkening_rows_sets_every_bit() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(9, 8, |x, _| Luma([250 - x as u8 * 20])));
        assert_eq!(wand_with(img).hash(), u64::MAX);
    }

    #[test]
    fn hash_is_deterministic_and_ignores_metadata() {
        let mut a = wand_with(gradient(33, 17));
        let b = wand_with(gradient(33, 17));
        a.add_comment("noise");
        assert_eq!(a.hash(), b.hash());
    }

    // =========================================================================
    // format_string
    // =========================================================================

    #[test]
    fn format_dimensions_and_hash() {
        let wand = wand_with(gradient(12, 7));
        let expected = format!("12x7 {}", wand.hash());
        assert_eq!(wand.format_string("%wx%h %H"), expected);
        assert_eq!(wand.format_string("%[width]/%[height]/%[hash]"), format!("12/7/{}", wand.hash()));
    }

    #[test]
    fn format_json_keeps_field_order() {
        let wand = wand_with(gradient(2, 1));
        let json = wand.format_string("%J");
        assert_eq!(json, format!(r#"{{"width":2,"height":1,"hash":{}}}"#, wand.hash()));
    }

    #[test]
    fn format_comments_and_escapes() {
        let mut wand = Wand::new();
        wand.set_comments(vec!["a".into(), "b".into()]);
        assert_eq!(wand.format_string("%n: %c (100%%)"), "2: a; b (100%)");
        assert_eq!(wand.format_string("[%z][%[]]"), "[][]");
    }

    #[test]
    fn format_empty_wand() {
        assert_eq!(Wand::new().format_string("%[json]"), r#"{"width":0,"height":0,"hash":0}"#);
    }

    // =========================================================================
    // Metadata and options
    // =========================================================================

    #[test]
    fn strip_clears_metadata() {
        let mut wand = Wand::new();
        wand.add_comment("c");
        wand.metadata_mut().text.add_string("k", "v");
        wand.strip();
        assert!(wand.metadata().is_empty());
    }

    #[test]
    fn quality_sets_inverse_level() {
        let mut wand = Wand::new();
        wand.set_compression_quality(85);
        assert_eq!(wand.compression_level().value(), 15);
        wand.set_compression_level(-20);
        assert!(wand.compression_level().is_default());
    }

    #[test]
    fn strict_flag_reaches_decode_options() {
        let mut wand = Wand::new();
        assert!(!wand.decode_options().strict);
        wand.set_strict(true);
        assert!(wand.decode_options().strict);
    }
}
