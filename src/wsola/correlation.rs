// src/wsola/correlation.rs

use super::ring::RingStore;

/// Result of a correlation search: the chosen offset from the ideal centre
/// and its normalised cross-correlation score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub delta: i64,
    pub ncc: f64,
}

/// Searches `ring` for the `n_o`-sample segment around absolute offset
/// `center` that best matches `tail` by normalised cross-correlation,
/// scanning `delta` in `[-s_w, +s_w]` (or only `delta = 0` if `s_w == 0`).
///
/// Returns `None` if every candidate fell outside the ring (the caller
/// should treat that as "not enough data yet", not as an error to surface).
pub fn search(tail: &[i16], ring: &RingStore, center: u64, s_w: i64) -> Option<SearchResult> {
    let n_o = tail.len();

    // First-frame special case: an all-zero tail scores every candidate 0,
    // so the search is meaningless; pick delta = 0 deterministically.
    if n_o == 0 || tail.iter().all(|&s| s == 0) {
        return Some(SearchResult { delta: 0, ncc: 0.0 });
    }

    let mut best: Option<SearchResult> = None;

    for delta in -s_w..=s_w {
        let start = center as i64 + delta;
        if start < 0 {
            continue;
        }
        let candidate = match ring.read_segment(start as u64, n_o) {
            Some(c) => c,
            None => continue,
        };

        let ncc = normalised_cross_correlation(tail, &candidate);
        let is_better = match best {
            None => true,
            Some(b) => {
                if ncc > b.ncc {
                    true
                } else if ncc < b.ncc {
                    false
                } else {
                    (delta.abs(), delta) < (b.delta.abs(), b.delta)
                }
            }
        };
        if is_better {
            best = Some(SearchResult { delta, ncc });
        }

        if s_w == 0 {
            break;
        }
    }

    best
}

/// `ncc = sum(a_i*b_i) / sqrt(sum(a_i^2) * sum(b_i^2))`, summed in 64-bit
/// signed arithmetic with the final division in double precision. Returns
/// 0.0 if either energy sum is zero.
fn normalised_cross_correlation(a: &[i16], b: &[i16]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot: i64 = 0;
    let mut energy_a: i64 = 0;
    let mut energy_b: i64 = 0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = x as i64;
        let y = y as i64;
        dot += x * y;
        energy_a += x * x;
        energy_b += y * y;
    }
    if energy_a == 0 || energy_b == 0 {
        return 0.0;
    }
    (dot as f64) / ((energy_a as f64) * (energy_b as f64)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_segments_score_one() {
        let a = vec![100i16, -200, 300, -400];
        assert!((normalised_cross_correlation(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_energy_scores_zero() {
        let a = vec![0i16; 4];
        let b = vec![1i16, 2, 3, 4];
        assert_eq!(normalised_cross_correlation(&a, &b), 0.0);
    }

    #[test]
    fn first_frame_picks_delta_zero() {
        let mut ring = RingStore::new(64);
        ring.append(&vec![7i16; 64]);
        let tail = vec![0i16; 8];
        let result = search(&tail, &ring, 20, 5).unwrap();
        assert_eq!(result.delta, 0);
        assert_eq!(result.ncc, 0.0);
    }

    #[test]
    fn finds_exact_match_within_window() {
        let mut ring = RingStore::new(128);
        let mut samples = vec![0i16; 128];
        // A distinctive 8-sample blip at offset 40 and a matching one at offset 44.
        for (i, s) in [10i16, -20, 30, -40, 50, -60, 70, -80].into_iter().enumerate() {
            samples[40 + i] = s;
            samples[44 + i] = s;
        }
        ring.append(&samples);
        let tail: Vec<i16> = samples[44..52].to_vec();
        let result = search(&tail, &ring, 40, 6).unwrap();
        assert_eq!(result.delta, 4);
        assert!(result.ncc > 0.99);
    }

    #[test]
    fn no_candidates_fetchable_returns_none() {
        let mut ring = RingStore::new(16);
        ring.append(&[1, 2, 3, 4]);
        let tail = vec![1i16, 2, 3, 4, 5, 6, 7, 8];
        assert!(search(&tail, &ring, 100, 2).is_none());
    }

    #[test]
    fn ties_prefer_smallest_abs_delta_then_smaller_delta() {
        // An all-equal-energy, zero-correlation scenario forces a tie at ncc
        // == 0 across every candidate; the result must be delta == 0, not the
        // first or last candidate scanned.
        let mut ring = RingStore::new(64);
        ring.append(&vec![1i16; 64]);
        let tail = vec![-1i16; 8];
        // tail . candidate = -8 for every aligned candidate here with equal
        // energies throughout, so ncc is identical for every delta; the
        // tie-break must still choose delta = 0.
        let result = search(&tail, &ring, 20, 5).unwrap();
        assert_eq!(result.delta, 0);
    }
}
