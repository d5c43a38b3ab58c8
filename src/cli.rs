// src/cli.rs

use std::path::PathBuf;

use clap::Parser;

use crate::mixer;
use crate::wav::{rate_from_code, SampleFormat};

/// Command-line surface: `prog [-f <code>] [-r <code>] [-d <code>] file1.wav [file2.wav ...]`.
#[derive(Parser, Debug)]
#[command(name = "player", about = "Pitch-preserving WSOLA playback engine")]
pub struct Args {
    /// Sample format code (1=S16LE .. 8=S32BE); inferred from the WAV header when omitted.
    #[arg(short = 'f', long = "format")]
    pub format_code: Option<u32>,

    /// Sample rate code (8=8000, 44=44100, 48=48000, 88=88200); taken from the WAV header when omitted.
    #[arg(short = 'r', long = "rate")]
    pub rate_code: Option<u32>,

    /// Device code: nonzero selects external device mode, zero selects on-board mode.
    #[arg(short = 'd', long = "device", default_value_t = 0)]
    pub device_code: u32,

    /// Playlist of WAV files to play in order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl Args {
    /// Resolves `-f` against a header's bits-per-sample when the code is
    /// absent or unrecognised.
    pub fn resolve_format(&self, header_bits: u16) -> SampleFormat {
        self.format_code
            .and_then(SampleFormat::from_code)
            .unwrap_or_else(|| SampleFormat::from_bits_per_sample(header_bits))
    }

    /// Resolves `-r` against a header's own rate when the code is absent or
    /// unrecognised.
    pub fn resolve_rate(&self, header_rate: u32) -> u32 {
        self.rate_code.and_then(rate_from_code).unwrap_or(header_rate)
    }

    pub fn mixer_device_code(&self) -> u32 {
        self.device_code
    }
}

/// Raw hardware volume range used to build the [`mixer::Mixer`] once CLI
/// args are parsed. Kept separate from `Args` since it isn't user-facing.
pub const DEFAULT_RAW_MIN: u32 = 0;
pub const DEFAULT_RAW_MAX: u32 = 1024;

pub fn build_mixer(args: &Args) -> mixer::Mixer {
    mixer::Mixer::new(DEFAULT_RAW_MIN, DEFAULT_RAW_MAX, args.mixer_device_code())
}
