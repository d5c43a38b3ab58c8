// src/playback/driver.rs

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::StreamTrait;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapProd, HeapRb};

use crate::audio::{build_stream, setup_output_device};
use crate::cli::{build_mixer, Args};
use crate::effects::{apply_fir, FirFilter, FirHistory};
use crate::mixer::Mixer;
use crate::playback::transport::{self, TransportCommand};
use crate::wav::{self, WavHeader};
use crate::wsola::{Engine, EngineConfig};

/// Number of raw PCM bytes read from the file per driver iteration. Chosen
/// generously relative to the engine's analysis frame so the ring rarely
/// starves even at the fastest supported speed.
const CHUNK_SAMPLES: usize = 4096;

/// A seek of ten seconds, expressed at the point of use against a track's
/// own sample rate.
const SEEK_SECONDS: f64 = 10.0;

/// Ties the file reader, FIR equalizer, WSOLA engine, mixer, and host audio
/// writer together into the transport described in §6. Owns exactly one
/// `cpal` stream and never calls the engine from more than one thread.
pub struct PlaybackDriver {
    args: Args,
    mixer: Mixer,
    presets: Vec<FirFilter>,
    preset_idx: usize,
    fir_history: FirHistory,
    playlist: Vec<PathBuf>,
    track_idx: usize,
    paused: bool,
    speed: f64,
    is_playing: Arc<AtomicBool>,
    volume_bits: Arc<AtomicU32>,
    _stream: cpal::Stream,
    producer: HeapProd<f32>,
}

struct OpenTrack {
    file: File,
    header: WavHeader,
    format: wav::SampleFormat,
    bytes_per_frame: usize,
    data_start: u64,
    data_end: u64,
    engine: Engine,
}

impl PlaybackDriver {
    pub fn new(args: Args) -> Result<Self> {
        if args.files.is_empty() {
            anyhow::bail!("no input files given");
        }

        let output = setup_output_device()?;
        let rb = HeapRb::<f32>::new(output.output_sample_rate as usize);
        let (producer, consumer) = rb.split();

        let is_playing = Arc::new(AtomicBool::new(true));
        let volume_bits = Arc::new(AtomicU32::new(1.0f32.to_bits()));
        let current_time_samples = Arc::new(std::sync::atomic::AtomicU64::new(0));

        let err_fn = |err| log::warn!("host audio stream error: {err}");
        let sample_format = output.sample_format;
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32, _>(
                output.device,
                output.config,
                is_playing.clone(),
                volume_bits.clone(),
                current_time_samples,
                consumer,
                err_fn,
            )?,
            cpal::SampleFormat::I16 => build_stream::<i16, _>(
                output.device,
                output.config,
                is_playing.clone(),
                volume_bits.clone(),
                current_time_samples,
                consumer,
                err_fn,
            )?,
            cpal::SampleFormat::U16 => build_stream::<u16, _>(
                output.device,
                output.config,
                is_playing.clone(),
                volume_bits.clone(),
                current_time_samples,
                consumer,
                err_fn,
            )?,
            other => anyhow::bail!("unsupported host output sample format: {other:?}"),
        };
        stream.play().context("failed to start host audio stream")?;

        let mixer = build_mixer(&args);
        let presets = FirFilter::presets();

        Ok(Self {
            playlist: args.files.clone(),
            args,
            mixer,
            fir_history: FirHistory::new(presets[0].taps.len()),
            presets,
            preset_idx: 0,
            track_idx: 0,
            paused: false,
            speed: 1.0,
            is_playing,
            volume_bits,
            _stream: stream,
            producer,
        })
    }

    fn open_track(&self, path: &PathBuf) -> Result<OpenTrack> {
        let (header, file) = wav::read_header(path)?;
        let format = self.args.resolve_format(header.bits_per_sample);
        let rate = self.args.resolve_rate(header.sample_rate);
        let bytes_per_frame = format.bytes_per_sample() * header.channels as usize;

        let config = EngineConfig {
            sample_rate: rate,
            channels: 1,
            frame_ms: 15.0,
            overlap: 0.5,
            search_ms: 5.0,
            max_input_chunk: CHUNK_SAMPLES * 4,
        };
        let engine = Engine::new(config)?;

        let data_start = wav::HEADER_LEN;
        let data_end = data_start + header.data_size as u64;

        Ok(OpenTrack { file, header, format, bytes_per_frame, data_start, data_end, engine })
    }

    /// Runs the transport loop until the playlist ends or the user quits.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("failed to enable terminal raw mode")?;
        let result = self.run_inner();
        disable_raw_mode().ok();
        result
    }

    fn run_inner(&mut self) -> Result<()> {
        'playlist: while self.track_idx < self.playlist.len() {
            let path = self.playlist[self.track_idx].clone();
            log::info!("now playing: {}", path.display());
            let mut track = self.open_track(&path)?;
            self.fir_history.reset();

            let mut raw_buf = vec![0u8; CHUNK_SAMPLES * track.bytes_per_frame.max(1)];
            let mut eq_buf = vec![0i16; CHUNK_SAMPLES];
            let mut out_buf = vec![0i16; CHUNK_SAMPLES * 2 + 4096];

            loop {
                if let Some(cmd) = self.poll_control_key()? {
                    match cmd {
                        TransportCommand::Quit => break 'playlist,
                        TransportCommand::NextTrack => {
                            self.track_idx = (self.track_idx + 1) % self.playlist.len();
                            continue 'playlist;
                        }
                        TransportCommand::PrevTrack => {
                            self.track_idx = (self.track_idx + self.playlist.len() - 1)
                                % self.playlist.len();
                            continue 'playlist;
                        }
                        TransportCommand::TogglePause => {
                            self.paused = !self.paused;
                            self.is_playing.store(!self.paused, Ordering::Relaxed);
                        }
                        TransportCommand::VolumeUp => {
                            self.mixer.volume_up();
                            self.apply_volume();
                        }
                        TransportCommand::VolumeDown => {
                            self.mixer.volume_down();
                            self.apply_volume();
                        }
                        TransportCommand::SpeedUp => {
                            self.speed = transport::speed_up(self.speed);
                            track.engine.set_speed(self.speed);
                        }
                        TransportCommand::SpeedDown => {
                            self.speed = transport::speed_down(self.speed);
                            track.engine.set_speed(self.speed);
                        }
                        TransportCommand::SelectPreset(idx) => {
                            if idx < self.presets.len() {
                                self.preset_idx = idx;
                                self.fir_history = FirHistory::new(self.presets[idx].taps.len());
                            }
                        }
                        TransportCommand::SeekForward => self.seek(&mut track, SEEK_SECONDS)?,
                        TransportCommand::SeekBackward => self.seek(&mut track, -SEEK_SECONDS)?,
                    }
                }

                if self.paused {
                    std::thread::sleep(Duration::from_millis(100));
                    continue;
                }

                let pos = track.file.stream_position()?;
                if pos >= track.data_end {
                    break;
                }
                let remaining = (track.data_end - pos) as usize;
                let want = raw_buf.len().min(remaining);
                let read = track.file.read(&mut raw_buf[..want])?;
                if read == 0 {
                    break;
                }

                let mono = wav::decode_to_mono_i16(&raw_buf[..read], track.format, track.header.channels);
                if eq_buf.len() < mono.len() {
                    eq_buf.resize(mono.len(), 0);
                }
                let preset = &self.presets[self.preset_idx];
                apply_fir(&mono, &mut eq_buf[..mono.len()], preset, &mut self.fir_history);

                let needed_out = mono.len() * 2 + 4096;
                if out_buf.len() < needed_out {
                    out_buf.resize(needed_out, 0);
                }
                let produced = track.engine.process(&eq_buf[..mono.len()], &mut out_buf);
                self.write_host(&out_buf[..produced]);
            }

            self.track_idx += 1;
        }
        Ok(())
    }

    fn seek(&self, track: &mut OpenTrack, delta_seconds: f64) -> Result<()> {
        let bytes_per_second =
            track.header.sample_rate as i64 * track.bytes_per_frame as i64;
        let delta_bytes = (delta_seconds * bytes_per_second as f64) as i64;
        let pos = track.file.stream_position()? as i64;
        let target = (pos + delta_bytes).clamp(track.data_start as i64, track.data_end as i64);
        track.file.seek(SeekFrom::Start(target as u64))?;
        Ok(())
    }

    fn apply_volume(&self) {
        let level = self.mixer.raw_level();
        let gain = if self.mixer.raw_max() == 0 { 0.0 } else { level as f32 / self.mixer.raw_max() as f32 };
        self.volume_bits.store(gain.to_bits(), Ordering::Relaxed);
    }

    fn write_host(&mut self, samples: &[i16]) {
        for &s in samples {
            let mut sample = s as f32 / i16::MAX as f32;
            while let Err(rejected) = self.producer.try_push(sample) {
                sample = rejected;
                std::thread::sleep(Duration::from_micros(200));
            }
        }
    }

    fn poll_control_key(&self) -> Result<Option<TransportCommand>> {
        if event::poll(Duration::from_millis(0))? {
            if let Event::Key(ev) = event::read()? {
                if ev.kind == KeyEventKind::Press {
                    return Ok(transport::parse_key(ev.code, self.presets.len()));
                }
            }
        }
        Ok(None)
    }
}
