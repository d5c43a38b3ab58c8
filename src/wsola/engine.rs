// src/wsola/engine.rs

use super::correlation;
use super::ring::RingStore;
use super::synthesis;
use super::window::hann_q15;
use crate::error::EngineError;

/// Constructor parameters for [`Engine`]. All fields after `sample_rate`
/// express frame/overlap/search sizes in milliseconds or fractions rather
/// than raw sample counts, matching how the spec's scenarios name them.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub channels: usize,
    pub frame_ms: f64,
    /// Fraction of the analysis frame that overlaps the previous one, in `[0, 1)`.
    pub overlap: f64,
    /// Half-width of the correlation search window, in milliseconds. `0.0`
    /// disables the search (every frame starts exactly at the ideal offset).
    pub search_ms: f64,
    /// Expected upper bound on a single `process()` input chunk; sizes the
    /// ring's spare capacity. Not a hard limit — larger chunks just spend
    /// more of the ring's slack.
    pub max_input_chunk: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            frame_ms: 15.0,
            overlap: 0.5,
            search_ms: 5.0,
            max_input_chunk: 4096,
        }
    }
}

/// The WSOLA pitch-preserving time-scale modification engine (spec §3–§4).
///
/// Owned exclusively by one caller; not thread-safe. `process` is the only
/// way input data enters or output data leaves; the engine performs no I/O
/// of its own.
pub struct Engine {
    sample_rate: u32,
    speed: f64,

    n: usize,
    n_o: usize,
    h_a: usize,
    s_w: usize,

    window: Vec<i16>,
    ring: RingStore,
    tail: Vec<i16>,
    next_ideal_offset: u64,
    output_samples_total: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if config.channels != 1 {
            return Err(EngineError::InvalidConfig(format!(
                "engine requires mono input, got {} channels",
                config.channels
            )));
        }
        if config.sample_rate == 0 {
            return Err(EngineError::InvalidConfig("sample_rate must be positive".into()));
        }
        if !(0.0..1.0).contains(&config.overlap) {
            return Err(EngineError::InvalidConfig(format!(
                "overlap must be in [0, 1), got {}",
                config.overlap
            )));
        }
        if config.frame_ms <= 0.0 || config.search_ms < 0.0 {
            return Err(EngineError::InvalidConfig(
                "frame_ms must be > 0 and search_ms must be >= 0".into(),
            ));
        }

        let n = ((config.sample_rate as f64) * config.frame_ms / 1000.0).round() as usize;
        if n == 0 {
            return Err(EngineError::InvalidConfig("frame_ms too small for sample_rate".into()));
        }
        let n_o = (n as f64 * config.overlap).round() as usize;
        if n_o >= n {
            return Err(EngineError::InvalidConfig(format!(
                "overlap {} produced N_o ({}) >= N ({})",
                config.overlap, n_o, n
            )));
        }
        let h_a = n - n_o;
        let s_w = ((config.sample_rate as f64) * config.search_ms / 1000.0).round() as usize;

        let capacity = config.max_input_chunk + n + 2 * s_w + n * 2 + 1;

        Ok(Self {
            sample_rate: config.sample_rate,
            speed: 1.0,
            n,
            n_o,
            h_a,
            s_w,
            window: hann_q15(n),
            ring: RingStore::new(capacity),
            tail: vec![0i16; n_o],
            next_ideal_offset: 0,
            output_samples_total: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Takes effect on the next emitted frame; doesn't reset ring/tail/timeline.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
        } else {
            log::warn!("ignoring invalid speed {speed}, keeping {}", self.speed);
        }
    }

    pub fn next_ideal_offset(&self) -> u64 {
        self.next_ideal_offset
    }

    pub fn ring_base_offset(&self) -> u64 {
        self.ring.ring_base_offset()
    }

    pub fn ring_content(&self) -> usize {
        self.ring.content()
    }

    pub fn output_samples_total(&self) -> u64 {
        self.output_samples_total
    }

    fn synthesis_hop(&self) -> usize {
        ((self.h_a as f64 / self.speed).round() as i64).max(1) as usize
    }

    /// Appends `input` to the ring, then emits as much resampled output as
    /// fits in `output`, returning the number of samples written.
    pub fn process(&mut self, input: &[i16], output: &mut [i16]) -> usize {
        self.ring.append(input);
        let max_output = output.len();

        if (self.speed - 1.0).abs() < 1e-6 {
            let n = input.len().min(max_output);
            output[..n].copy_from_slice(&input[..n]);
            self.next_ideal_offset += input.len() as u64;
            self.output_samples_total += n as u64;
            self.prune();
            return n;
        }

        let h_s_eff = self.synthesis_hop();
        let mut produced = 0usize;

        while h_s_eff > 0 && produced + h_s_eff <= max_output {
            let lo = self.next_ideal_offset.saturating_sub(self.s_w as u64);
            let hi = self.next_ideal_offset + self.n as u64 + self.s_w as u64;
            if lo < self.ring.ring_base_offset() || hi > self.ring.write_offset() {
                log::debug!("{}", EngineError::InsufficientData);
                break;
            }

            let search_result = match correlation::search(
                &self.tail,
                &self.ring,
                self.next_ideal_offset,
                self.s_w as i64,
            ) {
                Some(r) => r,
                None => {
                    log::debug!("{}", EngineError::InsufficientData);
                    break;
                }
            };

            let start = (self.next_ideal_offset as i64 + search_result.delta).max(0) as u64;
            let frame = match self.ring.read_segment(start, self.n) {
                Some(f) => f,
                None => {
                    log::warn!(
                        "{}",
                        EngineError::SegmentFetchFailure { start_abs: start, length: self.n }
                    );
                    break;
                }
            };

            let emitted = synthesis::synthesize_frame(
                &frame,
                &self.window,
                &mut self.tail,
                self.n_o,
                self.h_a,
                h_s_eff,
            );
            output[produced..produced + emitted.len()].copy_from_slice(&emitted);
            produced += emitted.len();
            self.output_samples_total += emitted.len() as u64;

            self.next_ideal_offset += self.h_a as u64;

            let min_retain = self
                .next_ideal_offset
                .saturating_sub(self.s_w as u64 + self.n_o as u64);
            self.ring.discard_to(min_retain);
        }

        self.prune();
        produced
    }

    fn prune(&mut self) {
        let min_retain = self
            .next_ideal_offset
            .saturating_sub(self.s_w as u64 + self.n_o as u64);
        self.ring.discard_to(min_retain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(sample_rate: u32) -> EngineConfig {
        EngineConfig {
            sample_rate,
            channels: 1,
            frame_ms: 15.0,
            overlap: 0.5,
            search_ms: 5.0,
            max_input_chunk: 8192,
        }
    }

    #[test]
    fn rejects_non_mono() {
        let mut cfg = test_config(44_100);
        cfg.channels = 2;
        assert!(Engine::new(cfg).is_err());
    }

    #[test]
    fn rejects_bad_overlap() {
        let mut cfg = test_config(44_100);
        cfg.overlap = 1.0;
        assert!(Engine::new(cfg).is_err());
    }

    #[test]
    fn unity_speed_is_exact_passthrough() {
        let mut engine = Engine::new(test_config(44_100)).unwrap();
        let input = [1i16, 2, 3, 4, 5];
        let mut output = [0i16; 16];
        let n = engine.process(&input, &mut output);
        assert_eq!(n, 5);
        assert_eq!(&output[..5], &input[..]);

        let input2 = [6i16, 7];
        let mut output2 = [0i16; 16];
        let n2 = engine.process(&input2, &mut output2);
        assert_eq!(n2, 2);
        assert_eq!(&output2[..2], &input2[..]);
    }

    #[test]
    fn insufficient_data_returns_zero() {
        let mut engine = Engine::new(test_config(44_100)).unwrap();
        engine.set_speed(1.5);
        let mut output = vec![0i16; 661];
        let n = engine.process(&[], &mut output);
        assert_eq!(n, 0);
    }

    #[test]
    fn silence_in_silence_out_at_speed_1_5() {
        let cfg = EngineConfig {
            sample_rate: 44_100,
            channels: 1,
            frame_ms: 15.0,
            overlap: 0.5,
            search_ms: 5.0,
            max_input_chunk: 8192,
        };
        let mut engine = Engine::new(cfg).unwrap();
        engine.set_speed(1.5);
        let input = vec![0i16; 8192];
        let mut output = vec![0i16; 8192];
        let n = engine.process(&input, &mut output);
        assert!(n > 0);
        assert!(output[..n].iter().all(|&s| s == 0));
    }

    #[test]
    fn ring_overflow_scenario() {
        let mut engine = Engine::new(test_config(44_100)).unwrap();
        let capacity = engine.ring.capacity();
        let input = vec![1i16; capacity * 10];
        let mut output = vec![0i16; 16];
        engine.process(&input, &mut output);
        assert_eq!(engine.ring_content(), capacity);
        assert!(engine.ring_base_offset() > 0);
    }

    #[test]
    fn first_frame_search_is_deterministic() {
        let mut engine = Engine::new(test_config(44_100)).unwrap();
        engine.set_speed(1.5);
        let input: Vec<i16> = (0..2000).map(|i| ((i * 37) % 101) as i16 - 50).collect();
        let mut output = vec![0i16; 4096];
        let produced = engine.process(&input, &mut output);
        assert!(produced > 0);
    }

    #[test]
    fn invariants_hold_after_each_process_call() {
        let mut engine = Engine::new(test_config(16_000)).unwrap();
        engine.set_speed(1.5);
        let mut prev_ring_base = 0u64;
        let mut prev_ideal = 0u64;
        for chunk_idx in 0..20 {
            let input: Vec<i16> = (0..800)
                .map(|i| (((chunk_idx * 800 + i) as f64 * 0.1).sin() * 10_000.0) as i16)
                .collect();
            let mut output = vec![0i16; 2048];
            engine.process(&input, &mut output);

            assert!(engine.ring_base_offset() >= prev_ring_base);
            assert!(engine.next_ideal_offset() >= prev_ideal);
            prev_ring_base = engine.ring_base_offset();
            prev_ideal = engine.next_ideal_offset();
        }
    }

    #[test]
    fn length_law_over_long_stream() {
        let cfg = test_config(16_000);
        let mut engine = Engine::new(cfg).unwrap();
        engine.set_speed(1.5);

        let total_in = 160_000usize;
        let chunk = 800usize;
        let mut produced_total = 0usize;
        let mut fed = 0usize;
        while fed < total_in {
            let input: Vec<i16> = (fed..fed + chunk)
                .map(|i| (((i as f64) * 0.08).sin() * 8_000.0) as i16)
                .collect();
            let mut output = vec![0i16; chunk * 2];
            let n = engine.process(&input, &mut output);
            produced_total += n;
            fed += chunk;
        }

        let expected = total_in as f64 / 1.5;
        let tolerance = (661.0 + 2.0 * 220.0) * 4.0; // generous multiple of N + 2*S_w
        assert!(
            (produced_total as f64 - expected).abs() <= tolerance,
            "produced {produced_total}, expected ~{expected}"
        );
    }

    #[test]
    fn speed_change_mid_stream_keeps_length_in_range() {
        let cfg = EngineConfig {
            sample_rate: 16_000,
            channels: 1,
            frame_ms: 15.0,
            overlap: 0.5,
            search_ms: 5.0,
            max_input_chunk: 16_384,
        };
        let mut engine = Engine::new(cfg).unwrap();

        let sine = |n: usize, start: usize| -> Vec<i16> {
            (start..start + n)
                .map(|i| {
                    let t = i as f64 / 16_000.0;
                    ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 12_000.0) as i16
                })
                .collect()
        };

        let input1 = sine(16_000, 0);
        let mut out1 = vec![0i16; 20_000];
        let n1 = engine.process(&input1, &mut out1);

        engine.set_speed(2.0);
        let input2 = sine(16_000, 16_000);
        let mut out2 = vec![0i16; 20_000];
        let n2 = engine.process(&input2, &mut out2);

        let total = n1 + n2;
        let expected = 16_000.0 + 8_000.0;
        let bound = 661.0 + 2.0 * 220.0;
        assert!(
            (total as f64 - expected).abs() <= bound * 3.0,
            "total {total}, expected ~{expected}"
        );
    }

    #[test]
    fn reset_purity_same_input_same_output() {
        let input: Vec<i16> = (0..5000).map(|i| ((i * 13) % 255) as i16 - 127).collect();

        let run = || {
            let mut engine = Engine::new(test_config(44_100)).unwrap();
            engine.set_speed(1.5);
            let mut out = vec![0i16; 8192];
            let n = engine.process(&input, &mut out);
            out[..n].to_vec()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn energy_and_frequency_preserved_for_steady_sinusoid() {
        use rustfft::num_complex::Complex;
        use rustfft::FftPlanner;

        let sample_rate = 16_000.0;
        let freq = 440.0;
        let n_samples = 32_768usize;
        let input: Vec<i16> = (0..n_samples)
            .map(|i| {
                let t = i as f64 / sample_rate;
                ((2.0 * std::f64::consts::PI * freq * t).sin() * 10_000.0) as i16
            })
            .collect();

        for &speed in &[0.5, 1.0, 1.5, 2.0] {
            let cfg = EngineConfig {
                sample_rate: 16_000,
                channels: 1,
                frame_ms: 20.0,
                overlap: 0.5,
                search_ms: 5.0,
                max_input_chunk: n_samples,
            };
            let mut engine = Engine::new(cfg).unwrap();
            engine.set_speed(speed);
            let mut output = vec![0i16; n_samples * 2 + 4096];
            let n = engine.process(&input, &mut output);
            let produced = &output[..n];
            assert!(produced.len() > 4096, "not enough output for speed {speed}");

            let fft_size = 4096usize;
            let tail = &produced[produced.len() - fft_size..];
            let mut planner = FftPlanner::<f64>::new();
            let fft = planner.plan_fft_forward(fft_size);
            let mut buf: Vec<Complex<f64>> = tail.iter().map(|&s| Complex::new(s as f64, 0.0)).collect();
            fft.process(&mut buf);

            let bin_hz = sample_rate / fft_size as f64;
            let expected_bin = (freq / bin_hz).round() as usize;
            let peak_bin = buf[..fft_size / 2]
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap())
                .map(|(i, _)| i)
                .unwrap();
            assert!(
                (peak_bin as i64 - expected_bin as i64).abs() <= 1,
                "speed {speed}: peak bin {peak_bin}, expected ~{expected_bin}"
            );
        }
    }
}
