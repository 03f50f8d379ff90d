pub const FFT_SIZE: usize = 1024;
pub const BIN_COUNT: usize = FFT_SIZE / 2;
pub const BAR_COUNT: usize = 128;
pub const HISTORY_DEPTH: usize = 4;

pub const SMOOTHING_TIME_CONSTANT: f32 = 0.2;
pub const TICK_INTERVAL_MS: u64 = 16;

pub const AMBIENT_NOISE_SAMPLES: usize = 128;
pub const NOISE_FLOOR_MARGIN_DB: f32 = 5.0;
pub const CALIBRATION_SETTLE_MS: u64 = 500;

// Empirically tuned display constants. The squared index warp, the per-bar
// stride/offset and the hue multiplier were calibrated together against real
// program material; changing any of them detunes the visible frequency band.
pub const BAR_BIN_STRIDE: usize = 3;
pub const BAR_BIN_OFFSET: usize = 30;
pub const BAR_WIDTH_DIVISOR: f32 = 1.5;
pub const HUE_PER_LIGHTNESS: f32 = 10.0;
pub const HUE_STEP_DEGREES: u16 = 4;

// Logical draw surface, in device pixels. Bar rows are 8 px apart counting up
// from the bottom edge, so bar 127 lands at y = 1024 - 127*8 = 8.
pub const SURFACE_WIDTH: f32 = 1024.0;
pub const SURFACE_HEIGHT: f32 = 1024.0;
pub const BAR_ROW_SPACING: f32 = 8.0;
