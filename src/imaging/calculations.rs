//! Pure dimension arithmetic.
//!
//! Nothing here touches pixels or I/O, so every function is tested with plain
//! numbers.

/// Largest dimensions with the aspect ratio of `width`×`height` whose area does
/// not exceed `max_area`.
///
/// The short side is found by a downward integer search for the largest `s`
/// with `long * s² <= max_area * short`; the long side is then
/// `long * s / short`, truncated. The search starts one step above the integer
/// square root of the exact bound, so it runs at most a couple of iterations,
/// and lands on the same value an exhaustive search from `isqrt(max_area)`
/// would. All products are computed in `u128` and cannot overflow.
///
/// A zero input dimension yields `(0, 0)`. A square input yields
/// `isqrt(max_area)` on both sides.
///
/// ```
/// # use imgwand::imaging::area_fit;
/// assert_eq!(area_fit(1920, 1080, 1024 * 1024), (1365, 768));
/// assert_eq!(area_fit(1080, 1920, 1024 * 1024), (768, 1365));
/// ```
pub fn area_fit(width: u32, height: u32, max_area: u64) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let root = max_area.isqrt();
    if width == height {
        let side = saturate(u128::from(root));
        return (side, side);
    }

    let (long, short) = (u128::from(width.max(height)), u128::from(width.min(height)));
    let area = u128::from(max_area);

    let mut s = u128::from(root).min((area * short / long).isqrt() + 1);
    while s > 0 && long * s * s > area * short {
        s -= 1;
    }
    let l = long * s / short;

    if width > height {
        (saturate(l), saturate(s))
    } else {
        (saturate(s), saturate(l))
    }
}

fn saturate(v: u128) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}
