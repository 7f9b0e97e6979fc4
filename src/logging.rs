//! Logger setup. Log lines and progress bars share stderr, so every record is
//! written with the bars hidden and redrawn afterwards.

use std::sync::OnceLock;

use indicatif::MultiProgress;
use log::{Log, Metadata, Record, SetLoggerError};

static PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

/// Bars added here are cleared while a log line is written.
pub fn progress() -> &'static MultiProgress {
    PROGRESS.get_or_init(MultiProgress::new)
}

pub fn init(verbosity: u8) -> Result<(), SetLoggerError> {
    let log_filter = match verbosity {
        0 => "info",
        1 => "info,nogifetch=debug",
        2 => "info,nogifetch=trace",
        _ => "trace",
    };

    let log_env = env_logger::Env::default().default_filter_or(log_filter);

    let logger = env_logger::Builder::from_env(log_env)
        .format_module_path(false)
        .format_timestamp(None)
        // Indent following lines equal to the log level label, like `[ERROR] `
        .format_indent(Some(8))
        .build();

    log::set_max_level(logger.filter());
    log::set_boxed_logger(Box::new(ProgressLogger::new(logger, progress().clone())))
}

struct ProgressLogger {
    inner: env_logger::Logger,
    bars: MultiProgress,
}

impl ProgressLogger {
    fn new(inner: env_logger::Logger, bars: MultiProgress) -> Self {
        Self { inner, bars }
    }
}

impl Log for ProgressLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.inner.matches(record) {
            self.bars.suspend(|| self.inner.log(record));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}
