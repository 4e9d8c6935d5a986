use std::sync::mpsc;

use crate::log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink, now_millis};

/// Lightweight, cloneable handle to the process logger.
///
/// `LoggerHandle` is a thin, lock-free sink that enqueues `LogMsg` into a
/// bounded `SyncSender`. Calls to [`try_log`](Self::try_log) are non-blocking:
/// if the queue is full, the message is dropped and an error is returned.
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Attempts to enqueue a log message without blocking.
    ///
    /// # Errors
    /// - `TrySendError::Full(_)` when the bounded queue is at capacity.
    /// - `TrySendError::Disconnected(_)` when the logger worker has been dropped.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        self.tx
            .try_send(LogMsg::new(level, text, target, now_millis()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc::{TrySendError, sync_channel};

    const TARGET: &str = "meshrtc::peer::orchestrator";

    #[test]
    fn queued_message_keeps_level_target_and_text() {
        let (tx, rx) = sync_channel::<LogMsg>(2);
        let h = LoggerHandle { tx };

        h.log(LogLevel::Warn, "[peer] ignoring answer from bob while stable", TARGET);

        let msg = rx.recv().unwrap();
        assert_eq!(msg.level, LogLevel::Warn);
        assert_eq!(msg.target, TARGET);
        assert!(msg.text.contains("ignoring answer"));
        assert!(msg.ts_ms > 0);
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (tx, rx) = sync_channel::<LogMsg>(1);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Info, "[voice] joining lobby", TARGET).unwrap();
        assert!(matches!(
            h.try_log(LogLevel::Info, "[voice] left lobby", TARGET),
            Err(TrySendError::Full(_))
        ));
        // the sink variant swallows the error
        h.log(LogLevel::Info, "dropped", TARGET);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn stopped_worker_reports_disconnected() {
        let (tx, rx) = sync_channel::<LogMsg>(1);
        drop(rx);
        let h = LoggerHandle { tx };

        assert!(matches!(
            h.try_log(LogLevel::Error, "relay loop ended", TARGET),
            Err(TrySendError::Disconnected(_))
        ));
    }
}
