use crate::config::{AMBIENT_NOISE_SAMPLES, NOISE_FLOOR_MARGIN_DB};
use crate::types::{Bins, zeroed};

/// Running element-wise sum of raw spectra during a calibration run. Created
/// fresh at the start of each run and consumed by `finish`.
pub struct Accumulator {
    sums: Box<Bins>,
    collected: usize,
}

impl Accumulator {
    pub fn new() -> Accumulator {
        Accumulator {
            sums: zeroed(),
            collected: 0,
        }
    }

    pub fn add(&mut self, raw: &Bins) {
        for (sum, &v) in self.sums.iter_mut().zip(raw.iter()) {
            *sum += v;
        }
        self.collected += 1;
    }

    pub fn collected(&self) -> usize {
        self.collected
    }

    pub fn is_complete(&self) -> bool {
        self.collected >= AMBIENT_NOISE_SAMPLES
    }

    /// Average the collected samples into a new noise floor. The margin keeps
    /// legitimate low-level signal from being over-subtracted later.
    pub fn finish(&self) -> Box<Bins> {
        let mut floor = zeroed();
        for (out, &sum) in floor.iter_mut().zip(self.sums.iter()) {
            *out = sum / AMBIENT_NOISE_SAMPLES as f32 + NOISE_FLOOR_MARGIN_DB;
        }
        floor
    }
}
