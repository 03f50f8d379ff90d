use std::time::{Duration, Instant};

use crate::calibrate::Accumulator;
use crate::config::{BIN_COUNT, CALIBRATION_SETTLE_MS, HUE_STEP_DEGREES};
use crate::history::HistoryRing;
use crate::remap::{lerp_at, warp_position};
use crate::render::{self, BACKGROUND, DrawSurface};
use crate::store::{self, KvStore};
use crate::types::{Bins, is_ready, zeroed};

enum Mode {
    Playback,
    /// Waiting out the settle delay so the audio graph stabilizes before the
    /// first calibration sample.
    Settling { until: Instant, acc: Accumulator },
    Collecting { acc: Accumulator },
}

/// All pipeline state plus the tick state machine. One instance per process;
/// every mutation happens inside `tick` or `begin_calibration`, both driven
/// from the single driver loop.
pub struct Pipeline<S: KvStore> {
    store: S,
    noise_floor: Box<Bins>,
    history: HistoryRing,
    rot: u16,
    mode: Mode,
}

impl<S: KvStore> Pipeline<S> {
    pub fn new(store: S) -> Pipeline<S> {
        let mut noise_floor = zeroed();
        store::load_noise_floor(&store, &mut noise_floor);
        Pipeline {
            store,
            noise_floor,
            history: HistoryRing::new(),
            rot: 0,
            mode: Mode::Playback,
        }
    }

    pub fn is_calibrating(&self) -> bool {
        !matches!(self.mode, Mode::Playback)
    }

    #[allow(dead_code)]
    pub fn noise_floor(&self) -> &Bins {
        &self.noise_floor
    }

    #[allow(dead_code)]
    pub fn tick_counter(&self) -> usize {
        self.history.cursor()
    }

    #[allow(dead_code)]
    pub fn rot(&self) -> u16 {
        self.rot
    }

    /// Start a calibration run. A no-op while one is already in progress.
    pub fn begin_calibration(&mut self, now: Instant, surface: &mut impl DrawSurface) {
        if self.is_calibrating() {
            return;
        }
        surface.clear(BACKGROUND);
        self.history.clear();
        self.mode = Mode::Settling {
            until: now + Duration::from_millis(CALIBRATION_SETTLE_MS),
            acc: Accumulator::new(),
        };
    }

    /// One 16 ms tick. A sentinel spectrum (source not ready) is skipped
    /// without advancing any state.
    pub fn tick(&mut self, now: Instant, raw: &Bins, surface: &mut impl DrawSurface) {
        if let Mode::Settling { until, .. } = &self.mode {
            if now < *until {
                return;
            }
            let Mode::Settling { acc, .. } = std::mem::replace(&mut self.mode, Mode::Playback)
            else {
                unreachable!()
            };
            self.mode = Mode::Collecting { acc };
        }

        if !is_ready(raw) {
            return;
        }

        match self.mode {
            Mode::Collecting { .. } => self.calibration_tick(raw, surface),
            _ => self.playback_tick(raw, surface),
        }
    }

    fn calibration_tick(&mut self, raw: &Bins, surface: &mut impl DrawSurface) {
        let Mode::Collecting { acc } = &mut self.mode else {
            return;
        };

        render::draw_calibration_progress(surface, acc.collected());
        acc.add(raw);

        if acc.is_complete() {
            self.noise_floor = acc.finish();
            if let Err(err) = store::save_noise_floor(&mut self.store, &self.noise_floor) {
                eprintln!("failed to persist noise floor: {err:#}");
            }
            self.mode = Mode::Playback;
        }
    }

    fn playback_tick(&mut self, raw: &Bins, surface: &mut impl DrawSurface) {
        surface.clear(BACKGROUND);

        if self.history.advance() {
            self.rot = (self.rot + HUE_STEP_DEGREES) % 360;
        }

        let floor = &self.noise_floor;
        let slot = self.history.current_mut();
        for (i, out) in slot.iter_mut().enumerate() {
            let pos = warp_position(i, BIN_COUNT);
            *out = lerp_at(pos, raw) - lerp_at(pos, floor.as_slice());
        }

        render::draw_spectrum(surface, self.history.slots(), self.rot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AMBIENT_NOISE_SAMPLES, BAR_COUNT, NOISE_FLOOR_MARGIN_DB, SURFACE_WIDTH};
    use crate::render::recording::RecordingSurface;
    use crate::store::mem::MemStore;
    use crate::types::{NOT_READY, not_ready};

    fn pipeline() -> Pipeline<MemStore> {
        Pipeline::new(MemStore::default())
    }

    fn run_calibration(p: &mut Pipeline<MemStore>, surface: &mut RecordingSurface, raw: &Bins) {
        let t0 = Instant::now();
        p.begin_calibration(t0, surface);
        let after_settle = t0 + Duration::from_millis(CALIBRATION_SETTLE_MS);
        for _ in 0..AMBIENT_NOISE_SAMPLES {
            p.tick(after_settle, raw, surface);
        }
    }

    #[test]
    fn sentinel_tick_is_a_noop() {
        let mut p = pipeline();
        let mut surface = RecordingSurface::default();
        p.tick(Instant::now(), &not_ready(), &mut surface);
        assert_eq!(p.tick_counter(), 0);
        assert_eq!(surface.clears, 0);
        assert!(surface.rects.is_empty());
    }

    #[test]
    fn counter_and_hue_after_n_ticks() {
        let mut p = pipeline();
        let mut surface = RecordingSurface::default();
        let raw = [0.0; BIN_COUNT];
        let n = 11;
        for _ in 0..n {
            p.tick(Instant::now(), &raw, &mut surface);
        }
        assert_eq!(p.tick_counter(), n % 4);
        assert_eq!(p.rot() as usize, 4 * (n / 4) % 360);
    }

    #[test]
    fn hue_wraps_at_360() {
        let mut p = pipeline();
        let mut surface = RecordingSurface::default();
        let raw = [0.0; BIN_COUNT];
        for _ in 0..4 * 90 {
            p.tick(Instant::now(), &raw, &mut surface);
        }
        assert_eq!(p.rot(), 0);
    }

    #[test]
    fn silence_collapses_every_bar() {
        let mut p = pipeline();
        let mut surface = RecordingSurface::default();
        p.tick(Instant::now(), &[0.0; BIN_COUNT], &mut surface);
        assert!(!surface.rects.is_empty());
        for rect in &surface.rects {
            assert_eq!(rect.w, 0.0);
            assert_eq!(rect.x, SURFACE_WIDTH / 2.0);
        }
    }

    #[test]
    fn calibration_averages_and_persists() {
        let mut store = MemStore::default();
        let mut surface = RecordingSurface::default();
        let raw = [-48.0; BIN_COUNT];

        let mut p = Pipeline::new(MemStore::default());
        run_calibration(&mut p, &mut surface, &raw);

        assert!(!p.is_calibrating());
        for &v in p.noise_floor().iter() {
            assert!((v - (-48.0 + NOISE_FLOOR_MARGIN_DB)).abs() < 1e-3);
        }

        // persisted copy round-trips into a fresh pipeline
        store::save_noise_floor(&mut store, p.noise_floor()).unwrap();
        let p2 = Pipeline::new(store);
        assert_eq!(&p.noise_floor()[..], &p2.noise_floor()[..]);
    }

    #[test]
    fn settle_delay_defers_sampling() {
        let mut p = pipeline();
        let mut surface = RecordingSurface::default();
        let raw = [-20.0; BIN_COUNT];

        let t0 = Instant::now();
        p.begin_calibration(t0, &mut surface);
        surface.clears = 0;

        // still settling: nothing drawn, nothing counted
        p.tick(t0 + Duration::from_millis(100), &raw, &mut surface);
        assert!(surface.rects.is_empty());

        // settle elapsed: first sample draws one progress square
        p.tick(t0 + Duration::from_millis(CALIBRATION_SETTLE_MS), &raw, &mut surface);
        assert_eq!(surface.rects.len(), 1);
    }

    #[test]
    fn sentinel_does_not_count_toward_calibration() {
        let mut p = pipeline();
        let mut surface = RecordingSurface::default();
        let mut raw = [-20.0; BIN_COUNT];

        let t0 = Instant::now();
        p.begin_calibration(t0, &mut surface);
        let t = t0 + Duration::from_millis(CALIBRATION_SETTLE_MS);

        p.tick(t, &raw, &mut surface);
        raw[0] = NOT_READY;
        p.tick(t, &raw, &mut surface);
        raw[0] = -20.0;
        p.tick(t, &raw, &mut surface);

        // one progress square per counted sample
        assert_eq!(surface.rects.len(), 2);
    }

    #[test]
    fn reentrant_calibration_request_is_ignored() {
        let mut p = pipeline();
        let mut surface = RecordingSurface::default();
        let raw = [-20.0; BIN_COUNT];

        let t0 = Instant::now();
        p.begin_calibration(t0, &mut surface);
        let t = t0 + Duration::from_millis(CALIBRATION_SETTLE_MS);
        for _ in 0..5 {
            p.tick(t, &raw, &mut surface);
        }

        // second request must not reset progress or clear the display
        p.begin_calibration(t, &mut surface);
        assert_eq!(surface.rects.len(), 5);

        for _ in 0..AMBIENT_NOISE_SAMPLES - 5 {
            p.tick(t, &raw, &mut surface);
        }
        assert!(!p.is_calibrating());
    }

    #[test]
    fn calibration_clears_history_ring() {
        let mut p = pipeline();
        let mut surface = RecordingSurface::default();

        // leave residue in slot 1
        p.tick(Instant::now(), &[12.0; BIN_COUNT], &mut surface);
        assert_eq!(p.tick_counter(), 1);

        run_calibration(&mut p, &mut surface, &[-30.0; BIN_COUNT]);

        // floor is now -25, so zero input compensates to +25 in the slot
        // written this tick, while the stale slots were wiped at entry
        p.tick(Instant::now(), &[0.0; BIN_COUNT], &mut surface);
        assert_eq!(p.tick_counter(), 2);
        for bar in 0..BAR_COUNT {
            assert_eq!(surface.rects[4 * bar + 1].w, 0.0);
            assert!(surface.rects[4 * bar + 2].w > 0.0);
        }
    }

    #[test]
    fn compensation_subtracts_loaded_floor() {
        let mut store = MemStore::default();
        let mut floor = zeroed();
        floor.fill(7.0);
        store::save_noise_floor(&mut store, &floor).unwrap();

        let mut p = Pipeline::new(store);
        let mut surface = RecordingSurface::default();
        p.tick(Instant::now(), &[7.0; BIN_COUNT], &mut surface);

        // raw == floor, so every compensated value and bar width is zero
        for rect in &surface.rects {
            assert_eq!(rect.w, 0.0);
        }
    }
}
