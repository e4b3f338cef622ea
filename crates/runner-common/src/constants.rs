// Constants shared across the setup tool: platform detection, well-known
// files in the runner home, defaults, command-line names and exit codes.

use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Files the runner's own tooling writes into the runner home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownConfigFile {
    /// Registration settings written by `config.sh`.
    Runner,
    /// Service marker written by `svc.sh install`.
    Service,
}

impl fmt::Display for WellKnownConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsPlatform {
    Linux,
    MacOS,
    Windows,
}

impl fmt::Display for OsPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsPlatform::Linux => write!(f, "Linux"),
            OsPlatform::MacOS => write!(f, "OSX"),
            OsPlatform::Windows => write!(f, "Windows"),
        }
    }
}

impl OsPlatform {
    /// Platform segment used in runner archive names.
    pub fn package_name(&self) -> &'static str {
        match self {
            OsPlatform::Linux => "linux",
            OsPlatform::MacOS => "osx",
            OsPlatform::Windows => "win",
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    X86,
    X64,
    Arm,
    Arm64,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86 => write!(f, "X86"),
            Architecture::X64 => write!(f, "X64"),
            Architecture::Arm => write!(f, "ARM"),
            Architecture::Arm64 => write!(f, "ARM64"),
        }
    }
}

impl Architecture {
    /// Architecture segment used in runner archive names.
    pub fn package_name(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Arm => "arm",
            Architecture::Arm64 => "arm64",
        }
    }
}

// ---------------------------------------------------------------------------
// Platform detection (compile-time)
// ---------------------------------------------------------------------------

/// The current OS platform, detected at compile time.
#[cfg(target_os = "linux")]
pub const CURRENT_PLATFORM: OsPlatform = OsPlatform::Linux;
#[cfg(target_os = "macos")]
pub const CURRENT_PLATFORM: OsPlatform = OsPlatform::MacOS;
#[cfg(target_os = "windows")]
pub const CURRENT_PLATFORM: OsPlatform = OsPlatform::Windows;
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const CURRENT_PLATFORM: OsPlatform = OsPlatform::Linux;

/// The current CPU architecture, detected at compile time.
#[cfg(target_arch = "x86")]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::X86;
#[cfg(target_arch = "x86_64")]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::X64;
#[cfg(target_arch = "arm")]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::Arm;
#[cfg(target_arch = "aarch64")]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::Arm64;
#[cfg(not(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "arm",
    target_arch = "aarch64"
)))]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::X64;

/// Archive platform string for the build target, e.g. `linux-x64`.
pub fn current_package_platform() -> String {
    format!(
        "{}-{}",
        CURRENT_PLATFORM.package_name(),
        CURRENT_ARCHITECTURE.package_name()
    )
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub mod defaults {
    /// Pinned runner release installed when no version is given.
    pub const RUNNER_VERSION: &str = "2.321.0";
    /// Web URL of the hosted forge.
    pub const GITHUB_URL: &str = "https://github.com";
    /// REST API base of the hosted forge.
    pub const HOSTED_API_URL: &str = "https://api.github.com";
    /// Release download base; `/v{version}/{file}` is appended.
    pub const DOWNLOAD_BASE_URL: &str = "https://github.com/actions/runner/releases/download";
    /// Runner home directory name under `$HOME`.
    pub const RUNNER_HOME_DIRECTORY: &str = "actions-runner";
    /// Display name used when the host name cannot be read.
    pub const RUNNER_NAME: &str = "runner";
}

// ---------------------------------------------------------------------------
// Runner layout
// ---------------------------------------------------------------------------

pub mod path {
    pub const CONFIG_SCRIPT: &str = "config.sh";
    pub const SERVICE_SCRIPT: &str = "svc.sh";
    pub const RUNNER_FILE: &str = ".runner";
    pub const SERVICE_FILE: &str = ".service";
    pub const ARCHIVE_PREFIX: &str = "actions-runner";
    pub const ARCHIVE_EXTENSION: &str = "tar.gz";
    pub const PARTIAL_SUFFIX: &str = ".part";
}

// ---------------------------------------------------------------------------
// CommandLine
// ---------------------------------------------------------------------------

/// Command-line option names.
pub mod command_line {
    /// Prefix for the environment variables that back each option.
    pub const ENV_PREFIX: &str = "RUNNER_SETUP_INPUT_";

    /// Options that take a value.
    pub mod args {
        pub const REPOSITORY: &str = "repository";
        pub const PAT: &str = "pat";
        pub const NAME: &str = "name";
        pub const ROOT: &str = "root";
        pub const RUNNER_VERSION: &str = "runner-version";
        pub const PLATFORM: &str = "platform";
        pub const URL: &str = "url";
        pub const API_URL: &str = "api-url";
        pub const DOWNLOAD_URL: &str = "download-url";
        pub const SHA256: &str = "sha256";
        pub const TIMEOUT: &str = "timeout";

        /// Options whose values are secrets and must be masked.
        pub fn secrets() -> &'static [&'static str] {
            &[PAT]
        }
    }

    /// Boolean flags.
    pub mod flags {
        pub const NO_SUDO: &str = "no-sudo";
        pub const UNATTENDED: &str = "unattended";
    }

    /// Flags passed to the runner's `config.sh`.
    pub mod runner {
        pub const URL: &str = "--url";
        pub const TOKEN: &str = "--token";
        pub const NAME: &str = "--name";
        pub const UNATTENDED: &str = "--unattended";
        pub const REPLACE: &str = "--replace";
        pub const INSTALL: &str = "install";
        pub const START: &str = "start";
    }
}

// ---------------------------------------------------------------------------
// ReturnCode
// ---------------------------------------------------------------------------

/// Process exit codes.
pub mod return_code {
    pub const SUCCESS: i32 = 0;
    pub const TERMINATED_ERROR: i32 = 1;
    /// Shell convention for SIGINT (128 + 2).
    pub const INTERRUPTED: i32 = 130;
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

pub mod variables {
    /// Disable TLS certificate verification (lab setups with private CAs).
    pub const TLS_NO_VERIFY: &str = "RUNNER_SETUP_TLS_NO_VERIFY";
}
