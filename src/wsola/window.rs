// src/wsola/window.rs

/// Precomputes a Hann window of length `n` in signed Q15, i.e.
/// `w[i] = round(32767 * 0.5 * (1 - cos(2*pi*i/(n-1))))`.
///
/// Windowing a sample `x` by a Q15 weight `w` is `((x as i32) * (w as i32)) >> 15`.
pub fn hann_q15(n: usize) -> Vec<i16> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![32767];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * (i as f64) / denom;
            let v = 0.5 * (1.0 - phase.cos());
            (32767.0 * v).round() as i16
        })
        .collect()
}

/// Windows `x` by the Q15 weight `w` using an arithmetic right shift,
/// matching the fixed-point scaling the rest of the engine uses.
#[inline]
pub fn apply_q15(x: i16, w: i16) -> i16 {
    (((x as i32) * (w as i32)) >> 15) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_near_zero() {
        let w = hann_q15(661);
        assert!(w[0].abs() <= 1);
        assert!(w[w.len() - 1].abs() <= 1);
    }

    #[test]
    fn centre_is_near_full_scale() {
        let w = hann_q15(661);
        let mid = w.len() / 2;
        assert!(w[mid] > 32000);
    }

    #[test]
    fn apply_q15_scales_down() {
        assert_eq!(apply_q15(32767, 16384), 16383);
        assert_eq!(apply_q15(0, 16384), 0);
        assert_eq!(apply_q15(-32768, 32767), -32768);
    }

    #[test]
    fn single_sample_window_is_unity() {
        let w = hann_q15(1);
        assert_eq!(w, vec![32767]);
    }
}
