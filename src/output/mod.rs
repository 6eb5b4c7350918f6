// src/output/mod.rs
//! Output handling for reported entries
//!
//! Handlers are called from classify worker threads, so they are synchronous
//! and must be safe to share.

use crate::types::MatchResult;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

pub mod human;
pub mod json;

/// Trait for output handlers that process reported entries
pub trait OutputHandler: Send + Sync {
    /// Emit one reported entry
    fn emit_match(&self, result: &MatchResult) -> anyhow::Result<()>;

    /// Flush any buffered output
    fn flush(&self) -> anyhow::Result<()>;
}

/// Manager that dispatches output to multiple handlers
pub struct OutputManager {
    handlers: Vec<Arc<dyn OutputHandler>>,
}

impl OutputManager {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn OutputHandler>) {
        self.handlers.push(handler);
    }

    /// Emit a result to all handlers
    ///
    /// Errors from individual handlers are logged; an error is returned only
    /// when the sole handler failed.
    pub fn emit(&self, result: &MatchResult) -> anyhow::Result<()> {
        let mut last_error = None;

        for handler in &self.handlers {
            if let Err(e) = handler.emit_match(result) {
                tracing::warn!("Output handler error: {}", e);
                last_error = Some(e);
            }
        }

        if let Some(err) = last_error {
            if self.handlers.len() == 1 {
                return Err(err);
            }
        }

        Ok(())
    }

    /// Flush all handlers
    pub fn flush(&self) -> anyhow::Result<()> {
        for handler in &self.handlers {
            handler.flush()?;
        }
        Ok(())
    }
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer shared behind a mutex by the concrete handlers
pub(crate) struct SharedWriter(Mutex<Box<dyn Write + Send>>);

impl SharedWriter {
    pub(crate) fn new(writer: Box<dyn Write + Send>) -> Self {
        Self(Mutex::new(writer))
    }

    pub(crate) fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Run `f` with exclusive access to the writer, then flush
    pub(crate) fn with<F>(&self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let mut writer = self
            .0
            .lock()
            .map_err(|_| anyhow::anyhow!("output writer poisoned"))?;
        f(&mut **writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_buffer {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// In-memory writer whose contents stay readable after being boxed
    #[derive(Clone, Default)]
    pub(crate) struct TestBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl TestBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for TestBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingOutput;

    impl OutputHandler for FailingOutput {
        fn emit_match(&self, _result: &MatchResult) -> anyhow::Result<()> {
            anyhow::bail!("sink down")
        }

        fn flush(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_manager_no_handlers() {
        let manager = OutputManager::new();
        assert!(manager.emit(&MatchResult::precert(1)).is_ok());
        assert!(manager.flush().is_ok());
    }

    #[test]
    fn test_single_failing_handler_reports_error() {
        let mut manager = OutputManager::new();
        manager.add_handler(Arc::new(FailingOutput));
        assert!(manager.emit(&MatchResult::precert(1)).is_err());
    }

    #[test]
    fn test_failure_tolerated_with_other_handlers() {
        let buffer = test_buffer::TestBuffer::default();
        let mut manager = OutputManager::new();
        manager.add_handler(Arc::new(FailingOutput));
        manager.add_handler(Arc::new(json::JsonOutput::to_writer(Box::new(buffer.clone()))));

        assert!(manager.emit(&MatchResult::precert(3)).is_ok());
        assert!(buffer.contents().contains("\"index\":3"));
    }
}
