//! Name → codec mapping with alias resolution and format sniffing.
//!
//! The registry is an ordinary value: build it once at start-up (usually via
//! [`CodecRegistry::with_builtin_codecs`]), then share it by reference. After
//! construction nothing mutates it, so any number of workers can consult it
//! concurrently without locking.
//!
//! ## Detection order
//!
//! [`CodecRegistry::detect`] tries decoders in registration order and returns
//! the first whose signature matches. Several formats share a signature (the
//! netpbm family all start `P1`..`P7`), so which one wins for those is a
//! property of registration order; callers should not rely on it.
//! [`CodecRegistry::list`] is always sorted by name.

use super::signature::{PeekReader, Signature};
use super::{Codec, CodecError, DecodeOptions, Decoded, Encoder, EncodeOptions, ImageInfo};
use image::DynamicImage;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::debug;

/// Capabilities recorded when a codec is registered.
struct Entry {
    codec: Arc<dyn Codec>,
    signatures: Vec<Signature>,
    can_decode: bool,
    can_encode: bool,
}

/// One line of the codec listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSummary {
    pub name: String,
    pub aliases: Vec<String>,
    pub can_decode: bool,
    pub can_encode: bool,
}

#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Entry>,
    aliases: HashMap<String, String>,
    /// Canonical names in first-registration order.
    detection_order: Vec<String>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every codec in [`crate::formats`].
    pub fn with_builtin_codecs() -> Result<Self, CodecError> {
        let mut registry = Self::new();
        crate::formats::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Register a codec. A later registration under the same name replaces
    /// the earlier one (keeping its detection position).
    ///
    /// Fails if one of the codec's aliases is another codec's canonical name
    /// or already aliases another codec, or if its name is already an alias.
    pub fn register(&mut self, codec: impl Codec + 'static) -> Result<(), CodecError> {
        self.register_arc(Arc::new(codec))
    }

    pub fn register_arc(&mut self, codec: Arc<dyn Codec>) -> Result<(), CodecError> {
        let name = codec.name().to_string();

        if let Some(owner) = self.aliases.get(&name) {
            if *owner != name {
                return Err(CodecError::Registry(format!(
                    "codec name {name:?} is already an alias of {owner:?}"
                )));
            }
        }
        for alias in codec.aliases() {
            if *alias != name && self.codecs.contains_key(*alias) {
                return Err(CodecError::Registry(format!(
                    "alias {alias:?} of {name:?} collides with a codec name"
                )));
            }
            if let Some(owner) = self.aliases.get(*alias) {
                if *owner != name {
                    return Err(CodecError::Registry(format!(
                        "alias {alias:?} of {name:?} already refers to {owner:?}"
                    )));
                }
            }
        }

        // Drop aliases left over from a previous registration of this name.
        self.aliases.retain(|_, owner| *owner != name);
        for alias in codec.aliases() {
            self.aliases.insert((*alias).to_string(), name.clone());
        }

        let decoder = codec.decoder();
        let entry = Entry {
            signatures: decoder
                .map(|d| d.signatures().to_vec())
                .unwrap_or_default(),
            can_decode: decoder.is_some(),
            can_encode: codec.encoder().is_some(),
            codec: Arc::clone(&codec),
        };

        debug!(
            codec = %name,
            decode = entry.can_decode,
            encode = entry.can_encode,
            "registered codec"
        );

        if self.codecs.insert(name.clone(), entry).is_none() {
            self.detection_order.push(name);
        }
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<&Entry, CodecError> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.codecs
            .get(canonical)
            .ok_or_else(|| CodecError::NotFound(canonical.to_string()))
    }

    /// Look up a codec by canonical name or alias.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Codec>, CodecError> {
        self.entry(name).map(|e| Arc::clone(&e.codec))
    }

    /// Resolve `name` and require a decode capability.
    pub fn decoder(&self, name: &str) -> Result<Arc<dyn Codec>, CodecError> {
        match self.entry(name)? {
            e if e.can_decode => Ok(Arc::clone(&e.codec)),
            _ => Err(CodecError::NotFound(name.to_string())),
        }
    }

    /// Resolve `name` and require an encode capability.
    pub fn encoder(&self, name: &str) -> Result<Arc<dyn Codec>, CodecError> {
        match self.entry(name)? {
            e if e.can_encode => Ok(Arc::clone(&e.codec)),
            _ => Err(CodecError::NotFound(name.to_string())),
        }
    }

    /// Canonical name for a name or alias, if registered.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.entry(name).ok().map(|e| e.codec.name())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_ok()
    }

    /// True if `name` resolves to a codec that can decode.
    pub fn can_decode(&self, name: &str) -> bool {
        self.entry(name).is_ok_and(|e| e.can_decode)
    }

    /// True if `name` resolves to a codec that can encode.
    pub fn can_encode(&self, name: &str) -> bool {
        self.entry(name).is_ok_and(|e| e.can_encode)
    }

    /// All codecs, sorted by canonical name.
    pub fn list(&self) -> Vec<CodecSummary> {
        let mut out: Vec<CodecSummary> = self
            .codecs
            .iter()
            .map(|(name, entry)| CodecSummary {
                name: name.clone(),
                aliases: entry.codec.aliases().iter().map(|a| a.to_string()).collect(),
                can_decode: entry.can_decode,
                can_encode: entry.can_encode,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Identify the format of `reader` from its leading bytes.
    ///
    /// Peeks as many bytes as the longest registered signature; nothing is
    /// consumed, so the same reader can be handed to the chosen decoder.
    pub fn detect<R: Read>(&self, reader: &mut PeekReader<R>) -> Result<Arc<dyn Codec>, CodecError> {
        let longest = self
            .codecs
            .values()
            .flat_map(|e| e.signatures.iter().map(Signature::len))
            .max()
            .unwrap_or(0);
        let peeked = reader.peek(longest)?.to_vec();

        for name in &self.detection_order {
            let Some(entry) = self.codecs.get(name) else {
                continue;
            };
            if !entry.can_decode {
                continue;
            }
            if entry.signatures.iter().any(|s| s.matches_prefix_of(&peeked)) {
                debug!(codec = %name, "detected format");
                return Ok(Arc::clone(&entry.codec));
            }
        }
        Err(CodecError::NotFound("unknown".into()))
    }

    /// Detect the format of `reader` and decode it.
    pub fn decode(&self, reader: impl Read, options: &DecodeOptions) -> Result<Decoded, CodecError> {
        let mut reader = PeekReader::new(reader);
        let codec = self.detect(&mut reader)?;
        let decoder = codec
            .decoder()
            .ok_or_else(|| CodecError::NotFound(codec.name().to_string()))?;
        decoder.decode(&mut reader, options)
    }

    /// Detect the format of `reader` and read its dimensions and colour model.
    pub fn decode_config(
        &self,
        reader: impl Read,
        options: &DecodeOptions,
    ) -> Result<ImageInfo, CodecError> {
        let mut reader = PeekReader::new(reader);
        let codec = self.detect(&mut reader)?;
        let decoder = codec
            .decoder()
            .ok_or_else(|| CodecError::NotFound(codec.name().to_string()))?;
        decoder.decode_config(&mut reader, options)
    }

    /// Encode `image` with the codec registered under `name`.
    ///
    /// A codec without an encoder is reported as [`CodecError::NotFound`].
    pub fn encode(
        &self,
        name: &str,
        writer: &mut dyn Write,
        image: &DynamicImage,
        options: &EncodeOptions<'_>,
    ) -> Result<(), CodecError> {
        let codec = self.encoder(name)?;
        let encoder: &dyn Encoder = codec
            .encoder()
            .ok_or_else(|| CodecError::NotFound(name.to_string()))?;
        debug!(codec = %codec.name(), width = image.width(), height = image.height(), "encoding");
        encoder.encode(writer, image, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockCodec, RecordedOp};
    use image::GenericImageView;

    fn registry_with(codecs: Vec<MockCodec>) -> CodecRegistry {
        let mut registry = CodecRegistry::new();
        for codec in codecs {
            registry.register(codec).unwrap();
        }
        registry
    }

    // =========================================================================
    // Registration and lookup
    // =========================================================================

    #[test]
    fn alias_resolves_to_canonical_codec() {
        let registry = registry_with(vec![
            MockCodec::new("jpeg", &[b"\xff\xd8"]).with_aliases(&["jpg", "jfif"]),
        ]);
        let by_name = registry.resolve("jpeg").unwrap();
        for alias in ["jpg", "jfif"] {
            let by_alias = registry.resolve(alias).unwrap();
            assert!(Arc::ptr_eq(&by_name, &by_alias));
        }
        assert_eq!(registry.canonical_name("jpg"), Some("jpeg"));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = CodecRegistry::new();
        let err = registry.resolve("xcf").err().unwrap();
        assert!(matches!(err, CodecError::NotFound(n) if n == "xcf"));
    }

    #[test]
    fn re_registering_replaces_previous_codec() {
        let mut registry = CodecRegistry::new();
        registry
            .register(MockCodec::new("png", &[b"\x89PNG"]).with_aliases(&["old"]))
            .unwrap();
        registry
            .register(MockCodec::new("png", &[b"\x89PNG"]).encode_only())
            .unwrap();

        assert!(!registry.can_decode("png"));
        assert!(registry.can_encode("png"));
        assert!(!registry.contains("old"));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn alias_colliding_with_codec_name_is_rejected() {
        let mut registry = registry_with(vec![MockCodec::new("tiff", &[b"II*\0"])]);
        let err = registry
            .register(MockCodec::new("other", &[]).with_aliases(&["tiff"]))
            .unwrap_err();
        assert!(matches!(err, CodecError::Registry(_)));
    }

    #[test]
    fn list_is_sorted_with_capabilities() {
        let registry = registry_with(vec![
            MockCodec::new("webp", &[b"RIFF????WEBPVP8"]).decode_only(),
            MockCodec::new("avif", &[]).encode_only(),
            MockCodec::new("bmp", &[b"BM"]).with_aliases(&["dib"]),
        ]);
        let list = registry.list();
        let names: Vec<&str> = list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["avif", "bmp", "webp"]);
        assert!(!list[0].can_decode && list[0].can_encode);
        assert_eq!(list[1].aliases, ["dib"]);
        assert!(list[2].can_decode && !list[2].can_encode);
    }

    // =========================================================================
    // Detection
    // =========================================================================

    #[test]
    fn detects_matching_signature() {
        let registry = registry_with(vec![
            MockCodec::new("gif", &[b"GIF89a", b"GIF87a"]),
            MockCodec::new("qoi", &[b"qoif"]),
        ]);
        let mut reader = PeekReader::new(&b"GIF87a\x01\x00"[..]);
        assert_eq!(registry.detect(&mut reader).unwrap().name(), "gif");
    }

    #[test]
    fn detects_through_wildcards() {
        let registry = registry_with(vec![MockCodec::new("webp", &[b"RIFF????WEBPVP8"])]);
        let mut reader = PeekReader::new(&b"RIFF\x24\x00\x00\x00WEBPVP8 rest"[..]);
        assert_eq!(registry.detect(&mut reader).unwrap().name(), "webp");
    }

    #[test]
    fn no_signature_match_is_not_found() {
        let registry = registry_with(vec![MockCodec::new("qoi", &[b"qoif"])]);
        let mut reader = PeekReader::new(&b"not an image"[..]);
        let err = registry.detect(&mut reader).err().unwrap();
        assert!(matches!(err, CodecError::NotFound(n) if n == "unknown"));
    }

    #[test]
    fn short_stream_never_matches_longer_signature() {
        let registry = registry_with(vec![MockCodec::new("gif", &[b"GIF89a"])]);
        let mut reader = PeekReader::new(&b"GIF8"[..]);
        assert!(registry.detect(&mut reader).is_err());
    }

    #[test]
    fn encode_only_codec_is_skipped_by_detection() {
        let registry = registry_with(vec![
            MockCodec::new("first", &[b"MAGIC"]).encode_only(),
            MockCodec::new("second", &[b"MAGIC"]),
        ]);
        let mut reader = PeekReader::new(&b"MAGIC"[..]);
        assert_eq!(registry.detect(&mut reader).unwrap().name(), "second");
    }

    #[test]
    fn shared_signature_resolves_by_registration_order() {
        let registry = registry_with(vec![
            MockCodec::new("pnm", &[b"P6"]),
            MockCodec::new("ppm", &[b"P6"]),
        ]);
        let mut reader = PeekReader::new(&b"P6\n1 1\n255\n"[..]);
        assert_eq!(registry.detect(&mut reader).unwrap().name(), "pnm");
    }

    #[test]
    fn re_registration_keeps_detection_slot_ahead_of_later_codec() {
        let mut registry = registry_with(vec![
            MockCodec::new("png", &[b"\x89PNG"]),
            MockCodec::new("zng", &[b"\x89PNG"]),
        ]);
        registry
            .register(MockCodec::new("png", &[b"\x89PNG"]).with_decoded_size(5, 3))
            .unwrap();

        let mut reader = PeekReader::new(&b"\x89PNG\r\n"[..]);
        assert_eq!(registry.detect(&mut reader).unwrap().name(), "png");

        // The replacement, not the original, answers for the slot.
        let decoded = registry
            .decode(&b"\x89PNG\r\n"[..], &DecodeOptions::default())
            .unwrap();
        assert_eq!(decoded.image.dimensions(), (5, 3));
    }

    #[test]
    fn decode_hands_whole_stream_to_decoder() {
        let codec = MockCodec::new("qoif", &[b"qoif"]);
        let log = codec.log();
        let registry = registry_with(vec![codec]);

        let data = b"qoif\x00\x00\x00\x02payload";
        registry.decode(&data[..], &DecodeOptions::default()).unwrap();

        let ops = log.lock().unwrap();
        assert_eq!(
            ops[0],
            RecordedOp::Decode {
                codec: "qoif".into(),
                bytes: data.to_vec(),
            }
        );
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    #[test]
    fn encode_resolves_alias() {
        let codec = MockCodec::new("jpeg", &[b"\xff\xd8"]).with_aliases(&["jpg"]);
        let log = codec.log();
        let registry = registry_with(vec![codec]);

        let mut out = Vec::new();
        let image = DynamicImage::new_rgba8(3, 2);
        registry
            .encode("jpg", &mut out, &image, &EncodeOptions::default())
            .unwrap();

        assert_eq!(out, b"jpeg");
        assert!(matches!(
            &log.lock().unwrap()[0],
            RecordedOp::Encode { width: 3, height: 2, .. }
        ));
    }

    #[test]
    fn capability_lookup_requires_facet() {
        let registry = registry_with(vec![
            MockCodec::new("webp", &[b"RIFF????WEBPVP8"]).decode_only(),
            MockCodec::new("avif", &[]).encode_only(),
        ]);
        assert!(registry.decoder("webp").is_ok());
        assert!(matches!(registry.encoder("webp"), Err(CodecError::NotFound(_))));
        assert!(registry.encoder("avif").is_ok());
        assert!(matches!(registry.decoder("avif"), Err(CodecError::NotFound(_))));
    }

    #[test]
    fn encode_with_decode_only_codec_is_not_found() {
        let registry = registry_with(vec![
            MockCodec::new("webp", &[b"RIFF????WEBPVP8"]).decode_only(),
        ]);
        let mut out = Vec::new();
        let err = registry
            .encode("webp", &mut out, &DynamicImage::new_rgba8(1, 1), &EncodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, CodecError::NotFound(_)));
    }
}
