// HostContext: the application context shared by every setup component.

use crate::constants::{path, WellKnownConfigFile};
use crate::secret_masker::SecretMasker;
use crate::tracing::{TraceManager, Tracing};

use runner_sdk::{build_constants, TraceWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The central application context.
///
/// Owns the process-wide `SecretMasker`, hands out named trace sources that
/// share it, and resolves paths inside the runner home.
pub struct HostContext {
    /// Runner home: holds the cached archive and its extracted contents.
    root: PathBuf,

    /// Secret masker shared across the entire process.
    pub secret_masker: Arc<SecretMasker>,

    /// Trace manager for creating per-component trace sources.
    trace_manager: TraceManager,
}

impl HostContext {
    /// Create a new `HostContext` rooted at the runner home directory.
    pub fn new(root: impl Into<PathBuf>) -> Arc<Self> {
        let secret_masker = Arc::new(SecretMasker::new());
        let trace_manager = TraceManager::new(secret_masker.clone());

        let context = Arc::new(Self {
            root: root.into(),
            secret_masker,
            trace_manager,
        });

        let trace = context.get_trace("HostContext");
        trace.verbose(&format!(
            "{} (commit {}) runner home: {}",
            build_constants::SetupPackage::user_agent(),
            build_constants::Source::COMMIT_HASH,
            context.root.display()
        ));

        context
    }

    /// The runner home directory.
    pub fn root_directory(&self) -> &Path {
        &self.root
    }

    /// Resolve the path for a well-known configuration file.
    pub fn get_config_file(&self, config_file: WellKnownConfigFile) -> PathBuf {
        match config_file {
            WellKnownConfigFile::Runner => self.root.join(path::RUNNER_FILE),
            WellKnownConfigFile::Service => self.root.join(path::SERVICE_FILE),
        }
    }

    /// Whether the given well-known file is present in the runner home.
    pub fn has_config_file(&self, config_file: WellKnownConfigFile) -> bool {
        self.get_config_file(config_file).is_file()
    }

    /// Get a trace source for the given component name.
    pub fn get_trace(&self, name: &str) -> Tracing {
        self.trace_manager.get(name)
    }
}
