//! A minimal stdout logger for running the node off-device (tests and host
//! tooling). On the ESP32, the firmware uses `EspLogger` instead.
use log::{LevelFilter, Log, Metadata, Record};
use std::{
    io::Write,
    sync::OnceLock,
    time::{Duration, Instant},
};

static LOGGER: OnceLock<Logger> = OnceLock::new();

#[derive(Debug)]
struct Logger {
    max_level: LevelFilter,
    started: Instant,
}

/// Installs the logger at `Debug` in debug builds and `Info` otherwise.
pub fn init() -> Result<(), log::SetLoggerError> {
    #[cfg(debug_assertions)]
    let max_level = LevelFilter::Debug;
    #[cfg(not(debug_assertions))]
    let max_level = LevelFilter::Info;
    init_with_level(max_level)
}

/// Installs the logger. Fails if any logger is already installed.
pub fn init_with_level(max_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let logger = LOGGER.get_or_init(|| Logger {
        max_level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(logger.max_level);
    Ok(())
}

impl Logger {
    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        static LEVEL_STRS: [&str; 5] = ["[x]", "[!]", "[i]", "[?]", "[.]"];
        let level = LEVEL_STRS[record.level() as usize - 1];
        let uptime = self.uptime();
        let mut stdout = std::io::stdout().lock();
        // nowhere to report a failed log write
        let _ = writeln!(
            stdout,
            "{:>5}.{:03} {level} {}: {}",
            uptime.as_secs(),
            uptime.subsec_millis(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}
