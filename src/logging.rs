//! A minimal `log` backend that writes every record to standard error.
//!
//! The runtime itself only talks to the `log` facade; embedders that already install a logger
//! don't need this.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

#[macro_export]
macro_rules! with_warn {
    ($expr: expr) => (with_warn!("{}", $expr));
    ($fmt: tt, $expr: expr) => (match $expr {
        Ok(v) => Some(v),
        Err(e) => {
            warn!($fmt, e);
            None
        },
    });
}

pub struct SimpleLogger {
    level: Level,
}

impl SimpleLogger {
    /// Installs the logger, printing records at `level` and above.
    pub fn init(level: Level) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(SimpleLogger { level }))?;
        log::set_max_level(level.to_level_filter());
        Ok(())
    }

    /// Like `init`, but the level is taken from the `MINI_JVM_LOG` environment variable
    /// (`error`, `warn`, `info`, `debug` or `trace`), falling back to `default`.
    pub fn init_from_env(default: Level) -> Result<(), SetLoggerError> {
        let level = std::env::var("MINI_JVM_LOG").ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(default);
        SimpleLogger::init(level)
    }

    pub fn max_level(&self) -> LevelFilter {
        self.level.to_level_filter()
    }
}

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(&mut std::io::stderr(), "[{}] [{}] {}",
                             record.target(), record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn enabled_respects_level() {
        let logger = SimpleLogger { level: Level::Info };
        assert!(logger.enabled(&Metadata::builder().level(Level::Warn).build()));
        assert!(logger.enabled(&Metadata::builder().level(Level::Info).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Debug).build()));
        assert_eq!(logger.max_level(), LevelFilter::Info);
    }

    #[test]
    fn with_warn_swallows_errors() {
        let ok: Result<u8, String> = Ok(3);
        let err: Result<u8, String> = Err(String::from("boom"));
        assert_eq!(with_warn!(ok), Some(3));
        assert_eq!(with_warn!(err), None);
    }
}
