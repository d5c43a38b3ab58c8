// src/logging.rs

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Appends `[YYYY-MM-DD HH:MM:SS] [LEVEL] message` lines to a file, flushing
/// after every write so a crash never loses the tail of the log.
pub struct FileLogger {
    file: Mutex<File>,
    level: Level,
}

impl FileLogger {
    fn new(file: File, level: Level) -> Self {
        Self {
            file: Mutex::new(file),
            level,
        }
    }

    /// Opens (creating/appending) `path` and installs it as the global logger.
    pub fn init(path: &Path, level: LevelFilter) -> anyhow::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let logger = Self::new(file, level.to_level().unwrap_or(Level::Trace));
        log::set_max_level(level);
        log::set_boxed_logger(Box::new(logger)).map_err(anyhow::Error::from)?;
        Ok(())
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[{}] [{}] {}\n", ts, record.level(), record.args());
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}
