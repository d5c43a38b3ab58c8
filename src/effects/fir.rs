// src/effects/fir.rs

/// Maximum number of taps a [`FirFilter`] may carry. Chosen to bound the
/// worst-case per-chunk convolution cost for a realtime playback loop.
pub const MAX_FIR_TAPS: usize = 64;

/// A fixed-point-free, double-precision FIR coefficient table.
#[derive(Debug, Clone)]
pub struct FirFilter {
    pub name: &'static str,
    pub taps: Vec<f64>,
}

impl FirFilter {
    /// Identity filter: a single unity tap, equivalent to pass-through.
    pub fn flat() -> Self {
        Self { name: "Flat", taps: vec![1.0] }
    }

    /// A gentle low-pass-leaning FIR that emphasises low frequencies.
    pub fn bass_boost() -> Self {
        Self {
            name: "BassBoost",
            taps: vec![
                0.02, 0.04, 0.08, 0.12, 0.16, 0.18, 0.16, 0.12, 0.08, 0.04, 0.02,
            ],
        }
    }

    /// A gentle high-pass-leaning FIR that emphasises high frequencies.
    pub fn treble() -> Self {
        Self {
            name: "Treble",
            taps: vec![
                -0.02, -0.04, -0.06, 0.0, 0.3, 0.6, 0.3, 0.0, -0.06, -0.04, -0.02,
            ],
        }
    }

    /// The three shipped presets, in CLI/key-selection order (§6: digit keys
    /// `1`..`k` index into this table).
    pub fn presets() -> Vec<FirFilter> {
        vec![Self::flat(), Self::bass_boost(), Self::treble()]
    }
}

/// Per-stream convolution history, carrying the last `taps - 1` samples of
/// the previous chunk across calls. Reset to zeros whenever the preset or
/// the active track changes.
#[derive(Debug, Clone)]
pub struct FirHistory {
    samples: Vec<i16>,
}

impl FirHistory {
    pub fn new(taps: usize) -> Self {
        Self { samples: vec![0i16; taps.saturating_sub(1)] }
    }

    pub fn reset(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0);
    }

    fn resize_for(&mut self, taps: usize) {
        let needed = taps.saturating_sub(1);
        if self.samples.len() != needed {
            self.samples = vec![0i16; needed];
        }
    }
}

#[inline]
fn clamp16(v: f64) -> i16 {
    v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Convolves `input` with `filter`, writing `input.len()` samples to
/// `output` (which must be at least that long) and updating `history` in
/// place with this call's trailing samples.
///
/// Zero taps, or a tap count above [`MAX_FIR_TAPS`], degrade to a
/// pass-through copy rather than an error — the filter is advisory, not a
/// correctness-critical path.
pub fn apply_fir(input: &[i16], output: &mut [i16], filter: &FirFilter, history: &mut FirHistory) {
    debug_assert!(output.len() >= input.len());

    let taps = filter.taps.len();
    if taps == 0 || taps > MAX_FIR_TAPS {
        output[..input.len()].copy_from_slice(input);
        return;
    }
    if taps == 1 {
        let g = filter.taps[0];
        for (o, &x) in output.iter_mut().zip(input.iter()) {
            *o = clamp16(x as f64 * g);
        }
        return;
    }

    history.resize_for(taps);
    let hist_len = history.samples.len();

    for (i, out) in output[..input.len()].iter_mut().enumerate() {
        let mut acc = 0.0f64;
        for (k, &coeff) in filter.taps.iter().enumerate() {
            // Sample at relative offset `i - k` from the current position,
            // pulled from `history` when that offset lands before this chunk.
            let rel = i as i64 - k as i64;
            let sample = if rel >= 0 {
                input[rel as usize]
            } else {
                let hist_idx = hist_len as i64 + rel;
                if hist_idx >= 0 {
                    history.samples[hist_idx as usize]
                } else {
                    0
                }
            };
            acc += sample as f64 * coeff;
        }
        *out = clamp16(acc);
    }

    if hist_len > 0 {
        let take = hist_len.min(input.len());
        let mut new_hist = vec![0i16; hist_len];
        new_hist[hist_len - take..].copy_from_slice(&input[input.len() - take..]);
        if take < hist_len {
            let keep = hist_len - take;
            new_hist[..keep].copy_from_slice(&history.samples[history.samples.len() - keep..]);
        }
        history.samples = new_hist;
    }
}
