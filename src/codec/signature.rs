//! Magic byte signatures with wildcard positions.
//!
//! A [`Signature`] is compared against the leading bytes of a stream. The
//! wildcard byte `?` matches any value at its position; every other byte must
//! match exactly. Length is significant: a prefix shorter than the pattern
//! never matches.
//!
//! ```text
//! RIFF????WEBPVP8     WebP (bytes 4..8 are the RIFF chunk size)
//! BM????\0\0\0\0      BMP  (file size, then four reserved zero bytes)
//! ```

use std::borrow::Cow;
use std::io::{self, BufRead, Read};

/// Byte that matches anything inside a [`Signature`].
pub const WILDCARD: u8 = b'?';

/// A fixed-length byte pattern identifying a container format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Cow<'static, [u8]>);

impl Signature {
    pub const fn from_static(pattern: &'static [u8]) -> Self {
        Self(Cow::Borrowed(pattern))
    }

    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        Self(Cow::Owned(pattern.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True if `prefix` has exactly this signature's length and agrees with it
    /// at every non-wildcard position.
    pub fn matches(&self, prefix: &[u8]) -> bool {
        prefix.len() == self.0.len()
            && self
                .0
                .iter()
                .zip(prefix)
                .all(|(&want, &got)| want == WILDCARD || want == got)
    }

    /// Compare against the start of `peeked`, which may be longer than the
    /// signature.
    pub fn matches_prefix_of(&self, peeked: &[u8]) -> bool {
        peeked
            .get(..self.0.len())
            .is_some_and(|prefix| self.matches(prefix))
    }
}

const FILL_CHUNK: usize = 8 * 1024;

/// Buffering adapter that supports look-ahead of arbitrary length.
///
/// Detection needs to see as many leading bytes as the longest registered
/// signature without consuming them, so the bytes can still be handed to the
/// chosen decoder. Peeked bytes are replayed by [`Read`] and [`BufRead`].
pub struct PeekReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
}

impl<R: Read> PeekReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Return up to `len` upcoming bytes without consuming them. Fewer than
    /// `len` bytes are returned only at end of stream.
    pub fn peek(&mut self, len: usize) -> io::Result<&[u8]> {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        while self.buf.len() < len {
            let filled = self.buf.len();
            self.buf.resize(len, 0);
            match self.inner.read(&mut self.buf[filled..]) {
                Ok(0) => {
                    self.buf.truncate(filled);
                    break;
                }
                Ok(n) => self.buf.truncate(filled + n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => self.buf.truncate(filled),
                Err(e) => {
                    self.buf.truncate(filled);
                    return Err(e);
                }
            }
        }
        Ok(&self.buf[..len.min(self.buf.len())])
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for PeekReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.buf.len() {
            let n = out.len().min(self.buf.len() - self.pos);
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(out)
    }
}

impl<R: Read> BufRead for PeekReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.pos = 0;
            self.buf.resize(FILL_CHUNK, 0);
            let n = loop {
                match self.inner.read(&mut self.buf) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.buf.clear();
                        return Err(e);
                    }
                }
            };
            self.buf.truncate(n);
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}
