use crate::config::{BIN_COUNT, HISTORY_DEPTH};
use crate::types::Bins;

/// Rotating buffer of the last four noise-compensated spectra. The cursor
/// selects the slot written on the current tick; all slots are read together
/// each render to produce the trailing-blend effect.
pub struct HistoryRing {
    slots: Vec<Bins>,
    cursor: usize,
}

impl HistoryRing {
    pub fn new() -> HistoryRing {
        HistoryRing {
            slots: vec![[0.0; BIN_COUNT]; HISTORY_DEPTH],
            cursor: 0,
        }
    }

    /// Move the cursor to the next slot. Returns true when it wraps back to
    /// slot 0, which is what paces the hue rotation.
    pub fn advance(&mut self) -> bool {
        self.cursor += 1;
        if self.cursor >= HISTORY_DEPTH {
            self.cursor = 0;
            return true;
        }
        false
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_mut(&mut self) -> &mut Bins {
        &mut self.slots[self.cursor]
    }

    pub fn slots(&self) -> &[Bins] {
        &self.slots
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_cycles_through_four_slots() {
        let mut ring = HistoryRing::new();
        let mut wraps = 0;
        for n in 1..=9 {
            if ring.advance() {
                wraps += 1;
            }
            assert_eq!(ring.cursor(), n % 4);
        }
        assert_eq!(wraps, 2);
    }

    #[test]
    fn clear_zeroes_every_slot() {
        let mut ring = HistoryRing::new();
        ring.current_mut()[17] = -42.0;
        ring.advance();
        ring.current_mut()[0] = 3.0;
        ring.clear();
        for slot in ring.slots() {
            assert!(slot.iter().all(|&v| v == 0.0));
        }
    }
}
