// src/lib.rs

pub mod audio;
pub mod cli;
pub mod effects;
pub mod error;
pub mod logging;
pub mod mixer;
pub mod playback;
pub mod wav;
pub mod wsola;

pub use error::EngineError;
pub use playback::PlaybackDriver;
pub use wsola::{Engine, EngineConfig};
