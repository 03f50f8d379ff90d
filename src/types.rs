use crate::config::BIN_COUNT;

/// One frame of decibel magnitudes, one value per raw frequency bin.
pub type Bins = [f32; BIN_COUNT];

/// Sentinel written at bin 0 by a source that has not produced data yet.
pub const NOT_READY: f32 = f32::NEG_INFINITY;

pub fn is_ready(bins: &Bins) -> bool {
    bins[0] != NOT_READY
}

pub fn zeroed() -> Box<Bins> {
    Box::new([0.0; BIN_COUNT])
}

pub fn not_ready() -> Box<Bins> {
    let mut bins = zeroed();
    bins[0] = NOT_READY;
    bins
}
