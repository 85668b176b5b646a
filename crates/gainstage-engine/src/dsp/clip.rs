/// Largest `f32` strictly below 1.0.
const SOFT_CEILING: f32 = 1.0 - f32::EPSILON / 2.0;

#[inline]
pub fn hard_clamp<T: PartialOrd>(x: T, lo: T, hi: T) -> T {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

/// Saturating curve: odd, non-decreasing, close to `x` near zero and
/// strictly inside (-1, 1) for every finite input.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    // tanh rounds to exactly 1.0 in f32 for |x| > ~9, hence the ceiling.
    x.tanh().clamp(-SOFT_CEILING, SOFT_CEILING)
}
