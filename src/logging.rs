use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Sink for transport diagnostics, swappable for tests or embedding.
pub trait WirelessLogger: Send + Sync {
    fn log(&self, level: LogLevel, component: &str, msg: &str);
}

/// Forwards to the `log` facade, using the component as the target.
pub struct LogFacade;

impl LogFacade {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl WirelessLogger for LogFacade {
    fn log(&self, level: LogLevel, component: &str, msg: &str) {
        let level: log::Level = level.into();
        log::log!(target: component, level, "{}", msg);
    }
}

/// Install `env_logger` honouring `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CaptureLogger {
        lines: Mutex<Vec<(LogLevel, String, String)>>,
    }

    impl WirelessLogger for CaptureLogger {
        fn log(&self, level: LogLevel, component: &str, msg: &str) {
            self.lines
                .lock()
                .unwrap()
                .push((level, component.to_string(), msg.to_string()));
        }
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(log::Level::from(LogLevel::Trace), log::Level::Trace);
        assert_eq!(log::Level::from(LogLevel::Warn), log::Level::Warn);
        assert_eq!(log::Level::from(LogLevel::Error), log::Level::Error);
    }

    #[test]
    fn test_logger_is_object_safe() {
        let capture = Arc::new(CaptureLogger { lines: Mutex::new(Vec::new()) });
        let logger: Arc<dyn WirelessLogger> = capture.clone();
        logger.log(LogLevel::Info, "Wireless", "rx attached");

        let lines = capture.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, LogLevel::Info);
        assert_eq!(lines[0].1, "Wireless");
    }

    #[test]
    fn test_facade_and_init_do_not_panic() {
        init_logging();
        init_logging();
        LogFacade::new().log(LogLevel::Debug, "Test", "hello");
    }
}
