// src/wsola/ring.rs

/// A contiguous circular store of mono signed-16-bit samples, indexed
/// externally by absolute stream offset (count of samples since the ring was
/// created) rather than physical position. Callers never see wraparound.
///
/// Single-owner, not thread-safe — matches the engine's single-caller
/// contract (spec §5).
pub struct RingStore {
    buffer: Vec<i16>,
    capacity: usize,
    write_pos: usize,
    read_pos: usize,
    content: usize,
    ring_base_offset: u64,
}

impl RingStore {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self {
            buffer: vec![0i16; capacity],
            capacity,
            write_pos: 0,
            read_pos: 0,
            content: 0,
            ring_base_offset: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn content(&self) -> usize {
        self.content
    }

    pub fn ring_base_offset(&self) -> u64 {
        self.ring_base_offset
    }

    /// Highest absolute offset one past the last occupied sample.
    pub fn write_offset(&self) -> u64 {
        self.ring_base_offset + self.content as u64
    }

    /// Appends `samples`. If doing so would exceed capacity, the oldest
    /// samples are discarded (`ring_base_offset` advances) and the number of
    /// discarded samples is returned and logged as a warning. A return value
    /// of 0 means no overflow occurred.
    pub fn append(&mut self, samples: &[i16]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        let overrun =
            (self.content as i64 + samples.len() as i64 - self.capacity as i64).max(0) as usize;

        // Only the trailing `capacity` samples of an oversized input can
        // ever end up resident; anything before that is evicted before it
        // would ever be touched.
        let incoming = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let mut pos = self.write_pos;
        let mut remaining = incoming;
        while !remaining.is_empty() {
            let chunk = (self.capacity - pos).min(remaining.len());
            self.buffer[pos..pos + chunk].copy_from_slice(&remaining[..chunk]);
            pos = (pos + chunk) % self.capacity;
            remaining = &remaining[chunk..];
        }
        self.write_pos = pos;
        self.content = (self.content + samples.len()).min(self.capacity);

        if overrun > 0 {
            self.read_pos = (self.read_pos + overrun) % self.capacity;
            self.ring_base_offset += overrun as u64;
            log::warn!("{}", crate::error::EngineError::RingOverflow { overrun });
        }

        overrun
    }

    /// Returns a contiguous copy of `length` samples starting at absolute
    /// offset `start_abs`, or `None` if that span isn't wholly resident.
    pub fn read_segment(&self, start_abs: u64, length: usize) -> Option<Vec<i16>> {
        if length == 0 {
            return Some(Vec::new());
        }
        if start_abs < self.ring_base_offset {
            return None;
        }
        let end_abs = start_abs + length as u64;
        if end_abs > self.write_offset() {
            return None;
        }

        let offset_from_base = (start_abs - self.ring_base_offset) as usize;
        let physical_start = (self.read_pos + offset_from_base) % self.capacity;

        let mut out = Vec::with_capacity(length);
        let mut pos = physical_start;
        let mut remaining = length;
        while remaining > 0 {
            let chunk = (self.capacity - pos).min(remaining);
            out.extend_from_slice(&self.buffer[pos..pos + chunk]);
            pos = (pos + chunk) % self.capacity;
            remaining -= chunk;
        }
        Some(out)
    }

    /// Advances `read_pos`/`ring_base_offset` so that `ring_base_offset >=
    /// min_retain_abs`, clamped to the available content (never discards
    /// data that hasn't been written yet, and never retreats).
    pub fn discard_to(&mut self, min_retain_abs: u64) {
        let max_target = self.write_offset();
        let target = min_retain_abs.min(max_target).max(self.ring_base_offset);
        let advance = (target - self.ring_base_offset) as usize;
        if advance == 0 {
            return;
        }
        self.read_pos = (self.read_pos + advance) % self.capacity;
        self.content -= advance;
        self.ring_base_offset = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_read_back() {
        let mut ring = RingStore::new(16);
        ring.append(&[1, 2, 3, 4, 5]);
        assert_eq!(ring.content(), 5);
        assert_eq!(ring.read_segment(0, 5).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(ring.read_segment(1, 3).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn read_out_of_range_fails() {
        let mut ring = RingStore::new(16);
        ring.append(&[1, 2, 3]);
        assert!(ring.read_segment(0, 4).is_none());
        assert!(ring.read_segment(10, 1).is_none());
    }

    #[test]
    fn wraparound_is_transparent() {
        let mut ring = RingStore::new(4);
        ring.append(&[1, 2, 3, 4]);
        ring.discard_to(2);
        ring.append(&[5, 6]);
        assert_eq!(ring.read_segment(2, 4).unwrap(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn overflow_advances_base_offset_and_caps_content() {
        let mut ring = RingStore::new(8);
        let overrun = ring.append(&vec![0i16; 80]);
        assert_eq!(overrun, 72);
        assert_eq!(ring.content(), 8);
        assert_eq!(ring.ring_base_offset(), 72);
    }

    #[test]
    fn discard_clamps_to_available_content() {
        let mut ring = RingStore::new(16);
        ring.append(&[1, 2, 3]);
        ring.discard_to(1_000_000);
        assert_eq!(ring.ring_base_offset(), 3);
        assert_eq!(ring.content(), 0);
    }

    #[test]
    fn content_matches_write_minus_read_mod_capacity() {
        let mut ring = RingStore::new(6);
        ring.append(&[1, 2, 3, 4, 5]);
        ring.discard_to(2);
        ring.append(&[6, 7]);
        let expected = (ring.write_pos + ring.capacity - ring.read_pos) % ring.capacity;
        assert_eq!(ring.content(), expected);
    }
}
