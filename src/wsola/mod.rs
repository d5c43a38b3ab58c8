// src/wsola/mod.rs

pub mod correlation;
pub mod engine;
pub mod ring;
pub mod synthesis;
pub mod window;

pub use engine::{Engine, EngineConfig};
