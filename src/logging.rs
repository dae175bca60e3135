use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::sync::Arc;

/// A logging handle passed explicitly to the shutdown components.
///
/// Wraps any [`Log`] sink together with the target the records are emitted
/// under. [`Logger::global`] forwards to the backend installed through the
/// `log` facade (env_logger in the binary), tests plug in their own sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Log>,
    target: &'static str,
}

impl Logger {
    pub fn global(target: &'static str) -> Self {
        Self::with_sink(Arc::new(GlobalSink), target)
    }

    pub fn with_sink(sink: Arc<dyn Log>, target: &'static str) -> Self {
        Self { sink, target }
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder()
            .level(level)
            .target(self.target)
            .build();

        if !self.sink.enabled(&metadata) {
            return;
        }

        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .build(),
        );
    }
}

/// `info!(logger, "...")` style shorthands over [`Logger::log`].
macro_rules! logger_debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Debug, format_args!($($arg)+))
    };
}

macro_rules! logger_info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Info, format_args!($($arg)+))
    };
}

macro_rules! logger_warn {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Warn, format_args!($($arg)+))
    };
}

macro_rules! logger_error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(::log::Level::Error, format_args!($($arg)+))
    };
}

pub(crate) use {
    logger_debug as debug, logger_error as error, logger_info as info, logger_warn as warn,
};

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Forwards to the process-wide `log` backend.
struct GlobalSink;

impl Log for GlobalSink {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            log::logger().log(record);
        }
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

#[cfg(test)]
use log::LevelFilter;

#[cfg(test)]
pub fn init_logging(level: LevelFilter) {
    let _ = env_logger::builder()
        .filter_level(level)
        .is_test(true)
        .try_init();
}


#[cfg(test)]
mod tests {
    use super::testing::CapturingLogger;
    use super::*;
    use super::{debug, error, info, warn};

    #[test]
    fn test_logger_forwards_level_and_message() {
        let sink = CapturingLogger::new();
        let logger = Logger::with_sink(sink.clone(), "ruler::test");

        debug!(logger, "looking for {}", "rulers");
        warn!(logger, "deadline");
        error!(logger, "giving up after {} attempts", 3);

        assert_eq!(
            sink.records(),
            vec![
                (Level::Debug, "looking for rulers".to_string()),
                (Level::Warn, "deadline".to_string()),
                (Level::Error, "giving up after 3 attempts".to_string()),
            ]
        );
    }

    #[test]
    fn test_global_sink_respects_max_level() {
        init_logging(LevelFilter::Trace);
        log::set_max_level(LevelFilter::Info);

        let metadata = |level| {
            Metadata::builder()
                .level(level)
                .target("ruler::test")
                .build()
        };

        assert!(GlobalSink.enabled(&metadata(Level::Warn)));
        assert!(GlobalSink.enabled(&metadata(Level::Info)));
        assert!(!GlobalSink.enabled(&metadata(Level::Debug)));

        // Filtered records are dropped before reaching the backend.
        info!(Logger::global("ruler::test"), "global logger is reachable");
        debug!(Logger::global("ruler::test"), "never shown");
    }
}
