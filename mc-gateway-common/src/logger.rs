use mc_gateway_error::{MCError, MCResult};
use mc_gateway_models::constants::{LOG_DIR, LOG_FILE_NAME};
use parking_lot::Mutex;
use std::{str::FromStr, sync::Arc};
use tracing::{subscriber::set_global_default, Level};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::DynFilterFn,
    fmt::{self},
    layer::SubscriberExt,
    Layer, Registry,
};

pub struct Logger {
    level: Arc<Mutex<Level>>,
    _file_guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn new(level: Option<Level>) -> Self {
        Logger {
            level: Arc::new(Mutex::new(level.unwrap_or(Level::INFO))),
            _file_guard: None,
        }
    }

    /// Parse a configured level name (`info`, `DEBUG`, ...)
    pub fn parse_level(level: &str) -> MCResult<Level> {
        Level::from_str(level.trim())
            .map_err(|_| MCError::ConfigurationError(format!("invalid log level '{level}'")))
    }

    /// Change the level of both outputs at runtime
    #[inline]
    pub fn set_level(&self, new_level: Level) {
        *self.level.lock() = new_level;
    }

    #[inline]
    pub fn get_level(&self) -> Level {
        *self.level.lock()
    }

    /// Install console and daily rolling file output as the global subscriber.
    ///
    /// Must run after the runtime directory is applied so `./logs` lands
    /// under it.
    pub fn initialize(&mut self) -> MCResult<()> {
        let file_appender = rolling::daily(LOG_DIR, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        self._file_guard = Some(guard);

        let console_filter = {
            let level = Arc::clone(&self.level);
            DynFilterFn::new(move |metadata, _| metadata.level() <= &*level.lock())
        };

        let file_filter = {
            let level = Arc::clone(&self.level);
            DynFilterFn::new(move |metadata, _| metadata.level() <= &*level.lock())
        };

        let console_layer = {
            #[cfg(debug_assertions)]
            let layer = fmt::layer()
                .with_writer(std::io::stdout)
                .with_file(true)
                .with_line_number(true);

            #[cfg(not(debug_assertions))]
            let layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

            layer.with_filter(console_filter)
        };

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_filter(file_filter);

        let subscriber = Registry::default().with(console_layer).with(file_layer);

        set_global_default(subscriber).map_err(|_| MCError::from("Failed to set logger"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(Logger::parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(Logger::parse_level(" WARN ").unwrap(), Level::WARN);
        assert!(Logger::parse_level("loud").is_err());
    }

    #[test]
    fn test_set_level() {
        let logger = Logger::new(None);
        assert_eq!(logger.get_level(), Level::INFO);
        logger.set_level(Level::TRACE);
        assert_eq!(logger.get_level(), Level::TRACE);
    }
}
