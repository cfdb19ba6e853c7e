//! 64-bit difference hash.

use image::GrayImage;

/// Width of the grid [`diff_hash`] expects.
pub const HASH_GRID_WIDTH: u32 = 9;
/// Height of the grid [`diff_hash`] expects.
pub const HASH_GRID_HEIGHT: u32 = 8;

/// Difference hash of a 9×8 grayscale grid.
///
/// Bit `row * 8 + col` (bit 0 least significant) is set when the pixel at
/// `(col, row)` is strictly brighter than its right-hand neighbour. Similar
/// images produce hashes with a small Hamming distance.
///
/// # Panics
///
/// If `grid` is not exactly 9×8. Callers normalise the image first.
pub fn diff_hash(grid: &GrayImage) -> u64 {
    assert_eq!(
        grid.dimensions(),
        (HASH_GRID_WIDTH, HASH_GRID_HEIGHT),
        "difference hash needs a 9x8 grid"
    );

    let mut hash = 0u64;
    for row in 0..HASH_GRID_HEIGHT {
        for col in 0..HASH_GRID_WIDTH - 1 {
            let left = grid.get_pixel(col, row).0[0];
            let right = grid.get_pixel(col + 1, row).0[0];
            if left > right {
                hash |= 1 << (row * 8 + col);
            }
        }
    }
    hash
}

/// Number of differing bits between two hashes.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
