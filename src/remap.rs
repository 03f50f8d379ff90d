//! Log-to-linear frequency remapping.
//!
//! Display bins live on a log-like perceptual axis; the analyzer produces
//! linearly spaced bins. The squared index warp approximates the mapping
//! between the two over the audible range without a logarithm call, and the
//! same fractional position is used to sample both the raw spectrum and the
//! noise floor so compensation stays registered.

/// Fractional raw-bin position for perceptual bin `i` out of `bin_count`.
pub fn warp_position(i: usize, bin_count: usize) -> f32 {
    let t = i as f32 / bin_count as f32;
    t * t * bin_count as f32
}

/// Linear interpolation of `seq` at a fractional index. The right neighbor is
/// clamped at the end of the sequence.
pub fn lerp_at(pos: f32, seq: &[f32]) -> f32 {
    let left = pos.floor() as usize;
    let frac = pos - left as f32;

    let right = if left + 1 >= seq.len() { left } else { left + 1 };

    seq[left] * (1.0 - frac) + seq[right] * frac
}
