use crate::log::log_level::LogLevel;

/// Destination for log lines. Relay and client components hold an
/// `Arc<dyn LogSink>` and write through the `sink_*!` macros.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}
