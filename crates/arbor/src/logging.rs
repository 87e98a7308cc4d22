//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events. Hosts install a subscriber with
//! [`init`], or with [`init_buffered`] to collect formatted lines in memory.

use std::{
    io::{self, Result as IoResult, Write},
    sync::{Arc, Mutex, PoisonError},
};

use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{Error, Result};

/// Parse a filter directive such as `"arbor=debug"`.
fn env_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| Error::Logging(e.to_string()))
}

/// Install a global compact stderr subscriber filtered by `filter`. Fails if a
/// global subscriber is already set.
pub fn init(filter: &str) -> Result<()> {
    let format = fmt::format()
        .with_level(true)
        .with_target(true)
        .without_time()
        .compact();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter)?)
        .event_format(format)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

/// Install a global subscriber that appends each formatted event to a
/// [`LogBuffer`].
pub fn init_buffered(filter: &str) -> Result<LogBuffer> {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let format = fmt::format()
        .with_level(true)
        .with_line_number(true)
        .with_ansi(false)
        .without_time()
        .compact();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter)?)
        .event_format(format)
        .with_writer(move || -> LogWriter {
            LogWriter {
                buf: writer.lines.clone(),
            }
        })
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;
    Ok(buffer)
}

/// Shared in-memory log sink.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    /// Formatted lines, oldest first.
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogBuffer {
    /// Take all buffered lines.
    pub fn drain(&self) -> Vec<String> {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.drain(..).collect()
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Log writer that appends to a shared buffer.
struct LogWriter {
    /// Shared log buffer.
    buf: Arc<Mutex<Vec<String>>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(String::from_utf8_lossy(buf).trim().to_string());
        Ok(buf.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_filter() {
        assert!(matches!(init("arbor=notalevel"), Err(Error::Logging(_))));
    }

    #[test]
    fn writer_trims_lines() -> IoResult<()> {
        let buffer = LogBuffer::default();
        let mut writer = LogWriter {
            buf: buffer.lines.clone(),
        };
        writer.write_all(b"  INFO hello\n")?;
        writer.flush()?;
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.drain(), vec!["INFO hello".to_string()]);
        assert!(buffer.is_empty());
        Ok(())
    }
}
