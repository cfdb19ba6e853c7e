//! Text metadata ⇄ PNG-style ancillary chunks.
//!
//! Two on-wire encodings are produced and understood, byte-for-byte
//! compatible with PNG's `tEXt` and `iTXt` chunks:
//!
//! ```text
//! tEXt   key 00 value
//! iTXt   key 00 flag(00) method(00) language 00 alternate-key 00 value
//! ```
//!
//! `tEXt` fields are ISO-8859-1; a plain entry that does not fit in Latin-1
//! is written as `iTXt` instead. `iTXt` fields are UTF-8.
//!
//! Values are written verbatim and may contain NUL bytes: the container's
//! length prefix bounds them, not an in-band terminator. Compressed `iTXt`
//! is recognised but not decodable.
//!
//! Comments have no key of their own, so they ride through the same
//! mechanism as an `iTXt` entry keyed [`COMMENT_KEY`]. On decode those entries
//! are routed to [`Metadata::comments`] and never surface as text entries. A
//! user entry literally keyed `__COMMENT__` is indistinguishable from a
//! comment.

use crate::metadata::{Metadata, TextEntry};
use thiserror::Error;
use tracing::{trace, warn};

/// Four-byte chunk name.
pub type ChunkTag = [u8; 4];

/// Simple (Latin-1) text chunk.
pub const TEXT: ChunkTag = *b"tEXt";
/// International (UTF-8) text chunk.
pub const INTERNATIONAL_TEXT: ChunkTag = *b"iTXt";

/// Reserved key carrying a comment through the text channel.
pub const COMMENT_KEY: &str = "__COMMENT__";

const SEPARATOR: u8 = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// Structurally malformed: missing separator or truncated field.
    #[error("malformed chunk: {0}")]
    Format(String),
    /// Well-formed but not handled (compressed text, foreign chunk tag).
    #[error("unsupported chunk: {0}")]
    Unsupported(String),
}

/// One encoded chunk, without the container's length and CRC framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub tag: ChunkTag,
    pub payload: Vec<u8>,
}

/// Printable form of a chunk tag for error messages.
pub fn tag_name(tag: &ChunkTag) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

/// Encode one entry into a `tEXt` (plain) or `iTXt` chunk.
///
/// Fails if a framed field (key, language, alternate key) contains NUL,
/// since the result could not be split back apart.
pub fn encode_text_entry(entry: &TextEntry) -> Result<TextChunk, ChunkError> {
    reject_separator("key", &entry.key)?;

    if entry.is_plain() {
        if let (Some(key), Some(value)) =
            (latin1_bytes(&entry.key), latin1_bytes(&entry.value))
        {
            let mut payload = key;
            payload.push(SEPARATOR);
            payload.extend_from_slice(&value);
            return Ok(TextChunk {
                tag: TEXT,
                payload,
            });
        }
    }

    let mut payload = Vec::with_capacity(entry.key.len() + entry.value.len() + 5);
    payload.extend_from_slice(entry.key.as_bytes());
    payload.push(SEPARATOR);

    reject_separator("language", &entry.language)?;
    reject_separator("alternate key", &entry.alternate_key)?;

    payload.push(0); // compression flag
    payload.push(0); // compression method
    payload.extend_from_slice(entry.language.as_bytes());
    payload.push(SEPARATOR);
    payload.extend_from_slice(entry.alternate_key.as_bytes());
    payload.push(SEPARATOR);
    payload.extend_from_slice(entry.value.as_bytes());

    Ok(TextChunk {
        tag: INTERNATIONAL_TEXT,
        payload,
    })
}

fn reject_separator(field: &str, value: &str) -> Result<(), ChunkError> {
    if value.as_bytes().contains(&SEPARATOR) {
        return Err(ChunkError::Format(format!("{field} contains a NUL byte")));
    }
    Ok(())
}

/// Decode a `tEXt` or `iTXt` chunk payload into an entry.
pub fn decode_text_entry(tag: ChunkTag, payload: &[u8]) -> Result<TextEntry, ChunkError> {
    let name = tag_name(&tag);
    let (key, rest) = match split_field(payload) {
        Split::Missing => return Err(ChunkError::Format(format!("invalid {name} chunk"))),
        Split::Truncated => return Err(ChunkError::Format(format!("truncated {name} chunk"))),
        Split::Field(key, rest) => (key, rest),
    };

    match tag {
        TEXT => Ok(TextEntry {
            key: latin1_field(key),
            value: latin1_field(rest),
            ..TextEntry::default()
        }),
        INTERNATIONAL_TEXT => {
            let mut entry = TextEntry {
                key: utf8_field(key, "key")?,
                is_utf8: true,
                ..TextEntry::default()
            };

            if rest[0] != 0 {
                return Err(ChunkError::Unsupported("compressed iTXt chunk".into()));
            }
            if rest.len() < 4 {
                return Err(ChunkError::Format("truncated iTXt chunk".into()));
            }

            let (language, rest) = match split_field(&rest[2..]) {
                Split::Missing => {
                    return Err(ChunkError::Format(
                        "truncated iTXt chunk: missing language".into(),
                    ));
                }
                Split::Truncated => {
                    return Err(ChunkError::Format(
                        "truncated iTXt chunk after language".into(),
                    ));
                }
                Split::Field(language, rest) => (language, rest),
            };

            let (alternate_key, value) = match split_field(rest) {
                Split::Missing => {
                    return Err(ChunkError::Format(
                        "truncated iTXt chunk: missing alternate key".into(),
                    ));
                }
                Split::Truncated => {
                    return Err(ChunkError::Format(
                        "truncated iTXt chunk after alternate key".into(),
                    ));
                }
                Split::Field(alternate_key, value) => (alternate_key, value),
            };

            entry.language = utf8_field(language, "language")?;
            entry.alternate_key = utf8_field(alternate_key, "alternate key")?;
            entry.value = utf8_field(value, "value")?;
            Ok(entry)
        }
        _ => Err(ChunkError::Unsupported(format!("text-type chunk {name}"))),
    }
}

enum Split<'a> {
    /// No separator at all.
    Missing,
    /// Separator is the final byte; nothing follows it.
    Truncated,
    Field(&'a [u8], &'a [u8]),
}

/// Split `data` at its first NUL. The remainder is never empty.
fn split_field(data: &[u8]) -> Split<'_> {
    match data.iter().position(|&b| b == SEPARATOR) {
        None => Split::Missing,
        Some(i) if i + 1 == data.len() => Split::Truncated,
        Some(i) => Split::Field(&data[..i], &data[i + 1..]),
    }
}

/// `tEXt` is ISO-8859-1: every byte maps to the code point of the same value.
fn latin1_field(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// `None` if any character lies outside ISO-8859-1.
fn latin1_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

fn utf8_field(bytes: &[u8], field: &str) -> Result<String, ChunkError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ChunkError::Format(format!("{field} is not valid UTF-8")))
}

/// The entry a comment is smuggled in.
pub fn comment_entry(comment: &str) -> TextEntry {
    TextEntry::new(COMMENT_KEY, comment).utf8()
}

/// Lower metadata into chunks: every text entry in order, then every comment
/// in order.
pub fn metadata_to_chunks(metadata: &Metadata) -> Result<Vec<TextChunk>, ChunkError> {
    let text = metadata.text.iter().map(encode_text_entry);
    let comments = metadata
        .comments
        .iter()
        .map(|c| encode_text_entry(&comment_entry(c)));
    text.chain(comments).collect()
}

/// Receives ancillary chunks while a container is being decoded.
///
/// Returning an error aborts the decode.
pub trait ChunkVisitor {
    fn visit(&mut self, tag: ChunkTag, payload: &[u8]) -> Result<(), ChunkError>;
}

/// Accumulates text chunks into a [`Metadata`].
///
/// Malformed text chunks are dropped unless `strict` is set, in which case
/// the first failure aborts. Chunks of any other tag are ignored.
#[derive(Debug, Default)]
pub struct TextChunkCollector {
    strict: bool,
    metadata: Metadata,
}

impl TextChunkCollector {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            metadata: Metadata::new(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn into_metadata(self) -> Metadata {
        self.metadata
    }

    fn accept(&mut self, entry: TextEntry) {
        if entry.key == COMMENT_KEY {
            self.metadata.comments.push(entry.value);
        } else {
            self.metadata.text.add(entry);
        }
    }
}

impl ChunkVisitor for TextChunkCollector {
    fn visit(&mut self, tag: ChunkTag, payload: &[u8]) -> Result<(), ChunkError> {
        if tag != TEXT && tag != INTERNATIONAL_TEXT {
            trace!(chunk = %tag_name(&tag), "ignoring ancillary chunk");
            return Ok(());
        }
        match decode_text_entry(tag, payload) {
            Ok(entry) => {
                self.accept(entry);
                Ok(())
            }
            Err(e) if self.strict => Err(e),
            Err(e) => {
                warn!(chunk = %tag_name(&tag), error = %e, "dropping malformed text chunk");
                Ok(())
            }
        }
    }
}
