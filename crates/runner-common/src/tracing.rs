// Named trace sources that mask secrets before handing lines to `tracing`.

use crate::secret_masker::SecretMasker;
use chrono::Utc;
use runner_sdk::TraceWriter;
use std::sync::Arc;

/// Trace event severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceEventType {
    Verbose,
    Information,
    Warning,
    Error,
}

impl std::fmt::Display for TraceEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEventType::Verbose => write!(f, "VERB"),
            TraceEventType::Information => write!(f, "INFO"),
            TraceEventType::Warning => write!(f, "WARN"),
            TraceEventType::Error => write!(f, "ERR "),
        }
    }
}

/// A trace source for one component.
///
/// Every source created by the same `TraceManager` shares one `SecretMasker`,
/// so a value registered anywhere is masked everywhere.
#[derive(Clone)]
pub struct Tracing {
    name: String,
    secret_masker: Arc<SecretMasker>,
    level: TraceEventType,
}

impl Tracing {
    pub fn new(name: impl Into<String>, secret_masker: Arc<SecretMasker>, level: TraceEventType) -> Self {
        Self {
            name: name.into(),
            secret_masker,
            level,
        }
    }

    /// Render the line that would be emitted, or `None` if below the level.
    fn format(&self, event_type: TraceEventType, message: &str) -> Option<String> {
        if event_type < self.level {
            return None;
        }
        let masked = self.secret_masker.mask_secrets(message);
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        Some(format!("[{}][{}] {}: {}", timestamp, self.name, event_type, masked))
    }

    fn trace(&self, event_type: TraceEventType, message: &str) {
        let Some(formatted) = self.format(event_type, message) else {
            return;
        };

        match event_type {
            TraceEventType::Error => tracing::error!("{}", formatted),
            TraceEventType::Warning => tracing::warn!("{}", formatted),
            TraceEventType::Information => tracing::info!("{}", formatted),
            TraceEventType::Verbose => tracing::debug!("{}", formatted),
        }
    }

    /// Get the name of this trace source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log an error and its `source()` chain.
    pub fn error_err(&self, err: &dyn std::error::Error) {
        self.error(&err.to_string());
        let mut source = err.source();
        while let Some(cause) = source {
            self.error(&format!("  caused by: {}", cause));
            source = cause.source();
        }
    }
}

impl TraceWriter for Tracing {
    fn info(&self, message: &str) {
        self.trace(TraceEventType::Information, message);
    }

    fn verbose(&self, message: &str) {
        self.trace(TraceEventType::Verbose, message);
    }

    fn warning(&self, message: &str) {
        self.trace(TraceEventType::Warning, message);
    }

    fn error(&self, message: &str) {
        self.trace(TraceEventType::Error, message);
    }
}

/// Hands out named trace sources sharing one `SecretMasker`.
pub struct TraceManager {
    secret_masker: Arc<SecretMasker>,
    level: TraceEventType,
}

impl TraceManager {
    pub fn new(secret_masker: Arc<SecretMasker>) -> Self {
        Self {
            secret_masker,
            level: TraceEventType::Verbose,
        }
    }

    /// Get (create) a named trace source.
    pub fn get(&self, name: &str) -> Tracing {
        Tracing::new(name, self.secret_masker.clone(), self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_masks_registered_secret() {
        let masker = Arc::new(SecretMasker::new());
        let manager = TraceManager::new(masker.clone());
        let trace = manager.get("RegistrationClient");

        masker.add_value("ghp_supersecret");
        let line = trace
            .format(TraceEventType::Information, "sending ghp_supersecret")
            .unwrap();

        assert!(line.contains("[RegistrationClient] INFO: sending ***"));
        assert!(!line.contains("ghp_supersecret"));
    }

    #[test]
    fn format_respects_level() {
        let trace = Tracing::new("X", Arc::new(SecretMasker::new()), TraceEventType::Warning);
        assert!(trace.format(TraceEventType::Information, "quiet").is_none());
        assert!(trace.format(TraceEventType::Error, "loud").is_some());
    }
}
