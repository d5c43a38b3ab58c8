// src/main.rs

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use wsola_player::cli::Args;
use wsola_player::logging::FileLogger;
use wsola_player::playback::PlaybackDriver;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_path = PathBuf::from("player.log");
    FileLogger::init(&log_path, LevelFilter::Info)?;

    let mut driver = PlaybackDriver::new(args)?;
    driver.run()?;

    Ok(())
}
