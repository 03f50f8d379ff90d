use crate::config::{
    BAR_BIN_OFFSET, BAR_BIN_STRIDE, BAR_COUNT, BAR_ROW_SPACING, BAR_WIDTH_DIVISOR,
    HUE_PER_LIGHTNESS, SURFACE_HEIGHT, SURFACE_WIDTH,
};
use crate::types::Bins;

pub type Rgb = (u8, u8, u8);

pub const BACKGROUND: Rgb = (0, 0, 0);
const PROGRESS_GREY: Rgb = (100, 100, 100);

/// Draw primitives in device pixels. The terminal canvas implements this for
/// live display; tests implement it with a recording stub.
pub trait DrawSurface {
    fn clear(&mut self, color: Rgb);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb);
}

/// HSL to RGB, hue in degrees (wraps), saturation/lightness in percent.
/// Lightness is clamped to 0..=100 so out-of-range spectral values produce a
/// white bar instead of garbage.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    let h = h.rem_euclid(360.0);
    let s = (s / 100.0).clamp(0.0, 1.0);
    let l = (l / 100.0).clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

/// Draw all bars for one tick: 128 bars, four strata per bar (one per history
/// slot) for the motion-trail look, mirrored about the horizontal center.
pub fn draw_spectrum(surface: &mut impl DrawSurface, slots: &[Bins], rot: u16) {
    let center = SURFACE_WIDTH / 2.0;
    for i in 0..BAR_COUNT {
        for (stratum, slot) in slots.iter().enumerate() {
            let v = slot[i * BAR_BIN_STRIDE + BAR_BIN_OFFSET];
            let half_width = v.abs() / BAR_WIDTH_DIVISOR;
            let lightness = v.round().abs();
            let hue = (lightness * HUE_PER_LIGHTNESS + rot as f32).round();
            let color = hsl_to_rgb(hue, 100.0, lightness);
            surface.fill_rect(
                center - half_width,
                SURFACE_HEIGHT - (i as f32 * BAR_ROW_SPACING) + stratum as f32,
                half_width * 2.0,
                1.0,
                color,
            );
        }
    }
}

/// One small grey square per collected calibration sample, stacked up from
/// the bottom of the display.
pub fn draw_calibration_progress(surface: &mut impl DrawSurface, collected: usize) {
    let center = SURFACE_WIDTH / 2.0;
    surface.fill_rect(
        center - 2.0,
        SURFACE_HEIGHT - (collected as f32 * BAR_ROW_SPACING),
        4.0,
        4.0,
        PROGRESS_GREY,
    );
}
