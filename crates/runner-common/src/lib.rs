// runner-common: shared services for runner-setup.
// Builds on `runner-sdk`; provides the host context, tracing, secret masking,
// terminal handling and HTTP client construction.

pub mod constants;
pub mod host_context;
pub mod http_client_factory;
pub mod secret_masker;
pub mod terminal;
pub mod tracing;

// ---------------------------------------------------------------------------
// Re-exports for convenient access
// ---------------------------------------------------------------------------

pub use constants::{
    Architecture, OsPlatform, WellKnownConfigFile, CURRENT_ARCHITECTURE, CURRENT_PLATFORM,
};
pub use host_context::HostContext;
pub use http_client_factory::HttpClientFactory;
pub use secret_masker::SecretMasker;
pub use terminal::{ConsoleColor, Terminal};
pub use tracing::{TraceEventType, TraceManager, Tracing};
