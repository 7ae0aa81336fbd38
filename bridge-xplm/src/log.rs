//! [`LoggerSink`] writing to X-Plane's `Log.txt`.

use bridge_traits::error::Result;
use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};

use crate::ffi;
use crate::strings::log_line;

/// Mirrors bridge logs into `Log.txt` through `XPLMDebugString`, which is
/// callable from any thread.
#[derive(Debug, Clone)]
pub struct XplmLogSink {
    min_level: LogLevel,
}

impl XplmLogSink {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for XplmLogSink {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl LoggerSink for XplmLogSink {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            let line = log_line(&entry.render_line());
            unsafe { ffi::XPLMDebugString(line.as_ptr()) };
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
