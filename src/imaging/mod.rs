//! Pixel-independent image math and the parameters transforms take.
//!
//! | Piece | Module |
//! |---|---|
//! | **Area fit** (aspect-preserving resize under a pixel budget) | `calculations` |
//! | **Difference hash** (64-bit perceptual fingerprint) | `hash` |
//! | **Compression level, resize strategy** | `params` |
//!
//! Resampling kernels and pixel codecs live in the `image` crate; nothing
//! here allocates an image.

mod calculations;
pub mod hash;
mod params;

pub use calculations::area_fit;
pub use hash::{HASH_GRID_HEIGHT, HASH_GRID_WIDTH, diff_hash, hamming_distance};
pub use params::{CompressionLevel, ResizeStrategy};
