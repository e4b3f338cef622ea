/// Build constants for the setup tool.
/// Values come from compile-time environment variables with defaults.

/// Source control information.
pub struct Source;

impl Source {
    /// The commit hash from which this binary was built.
    /// Set via the `RUNNER_SETUP_COMMIT_HASH` env var at compile time, or "N/A".
    pub const COMMIT_HASH: &'static str = match option_env!("RUNNER_SETUP_COMMIT_HASH") {
        Some(h) => h,
        None => "N/A",
    };
}

/// Package metadata for the setup tool itself (not the runner it installs).
#[derive(Debug, Clone)]
pub struct SetupPackage;

impl SetupPackage {
    /// The semantic version of the setup tool.
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    /// Product token used in the HTTP user agent.
    pub const PRODUCT: &'static str = "runner-setup";

    /// `runner-setup/<version>`.
    pub fn user_agent() -> String {
        format!("{}/{}", Self::PRODUCT, Self::VERSION)
    }
}
