// src/effects/mod.rs

pub mod fir;

pub use fir::{apply_fir, FirFilter, FirHistory, MAX_FIR_TAPS};
