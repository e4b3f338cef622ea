/// Lightweight diagnostic sink shared by every component.
///
/// Components never call `tracing` macros with raw values that could carry
/// secrets; they write through a `TraceWriter`, and the production writer
/// (`runner_common::Tracing`) masks before forwarding.
pub trait TraceWriter: Send + Sync {
    /// Log an informational message.
    fn info(&self, message: &str);

    /// Log a verbose / debug message.
    fn verbose(&self, message: &str);

    /// Log a warning message.
    fn warning(&self, message: &str) {
        self.info(&format!("WARNING: {message}"));
    }

    /// Log an error message.
    fn error(&self, message: &str) {
        self.info(&format!("ERROR: {message}"));
    }
}

/// A no-op trace writer that discards all messages. Useful for tests.
#[derive(Debug, Clone)]
pub struct NullTraceWriter;

impl TraceWriter for NullTraceWriter {
    fn info(&self, _message: &str) {}
    fn verbose(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// A trace writer that collects all messages into a `Vec`.
#[derive(Debug)]
pub struct CollectingTraceWriter {
    messages: parking_lot::Mutex<Vec<(TraceLevel, String)>>,
}

/// The level of a collected trace message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceLevel {
    Info,
    Verbose,
    Warning,
    Error,
}

impl CollectingTraceWriter {
    pub fn new() -> Self {
        Self {
            messages: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Return all collected messages.
    pub fn messages(&self) -> Vec<(TraceLevel, String)> {
        self.messages.lock().clone()
    }

    /// Whether any collected message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|(_, m)| m.contains(needle))
    }

    fn push(&self, level: TraceLevel, message: &str) {
        self.messages.lock().push((level, message.to_string()));
    }
}

impl Default for CollectingTraceWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceWriter for CollectingTraceWriter {
    fn info(&self, message: &str) {
        self.push(TraceLevel::Info, message);
    }

    fn verbose(&self, message: &str) {
        self.push(TraceLevel::Verbose, message);
    }

    fn warning(&self, message: &str) {
        self.push(TraceLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(TraceLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_writer_keeps_order_and_levels() {
        let writer = CollectingTraceWriter::new();
        writer.info("hello");
        writer.warning("warn");
        writer.error("err");
        writer.verbose("verb");
        let msgs = writer.messages();
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0], (TraceLevel::Info, "hello".into()));
        assert_eq!(msgs[1], (TraceLevel::Warning, "warn".into()));
        assert_eq!(msgs[2], (TraceLevel::Error, "err".into()));
        assert_eq!(msgs[3], (TraceLevel::Verbose, "verb".into()));
        assert!(writer.contains("war"));
        assert!(!writer.contains("missing"));
    }

    #[test]
    fn default_warning_is_prefixed_info() {
        struct InfoOnly(parking_lot::Mutex<Vec<String>>);
        impl TraceWriter for InfoOnly {
            fn info(&self, message: &str) {
                self.0.lock().push(message.to_string());
            }
            fn verbose(&self, _message: &str) {}
        }

        let writer = InfoOnly(parking_lot::Mutex::new(Vec::new()));
        writer.warning("disk");
        writer.error("boom");
        assert_eq!(*writer.0.lock(), vec!["WARNING: disk", "ERROR: boom"]);
    }
}
