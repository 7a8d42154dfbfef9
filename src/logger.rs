use std::io::Write;
use std::time::Instant;

use log::{Log, Metadata, Record};
use parking_lot::Mutex;

struct TermplanLogger {
    file: Option<Mutex<std::fs::File>>,
    filter: log::LevelFilter,
    start: Instant,
}

impl TermplanLogger {
    fn format(&self, record: &Record) -> String {
        let elapsed = self.start.elapsed().as_secs_f64();
        format!(
            "[{elapsed:.3}s] [{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for TermplanLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.format(record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");

        if let Some(ref file) = self.file {
            let _ = writeln!(file.lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Level from `RUST_LOG`, falling back to `info`
fn level_from_env() -> log::LevelFilter {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Info)
}

/// Initialize the global logger, writing to stderr and optionally to `log_file`.
///
/// # Errors
///
/// Returns `SetLoggerError` if a logger is already installed.
pub fn init(log_file: Option<std::fs::File>) -> Result<(), log::SetLoggerError> {
    let filter = level_from_env();
    let logger = TermplanLogger {
        file: log_file.map(Mutex::new),
        filter,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_includes_level_and_target() {
        let logger = TermplanLogger {
            file: None,
            filter: log::LevelFilter::Debug,
            start: Instant::now(),
        };
        let line = logger.format(
            &Record::builder()
                .args(format_args!("spawned"))
                .level(log::Level::Warn)
                .target("termplan::terminals")
                .build(),
        );
        assert!(line.starts_with('['));
        assert!(line.ends_with("[WARN] termplan::terminals: spawned"));
    }

    #[test]
    fn test_enabled_respects_filter() {
        let logger = TermplanLogger {
            file: None,
            filter: log::LevelFilter::Info,
            start: Instant::now(),
        };
        let debug = Metadata::builder().level(log::Level::Debug).build();
        let error = Metadata::builder().level(log::Level::Error).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&error));
    }
}
