// Error taxonomy: one enum per setup stage, aggregated by `SetupError`.

use runner_sdk::ProcessExitCodeError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Reading operator input failed.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read operator input: {0}")]
    Io(#[from] io::Error),
}

/// Operator input or a configuration value was rejected before any network I/O.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a repository is required (format: owner/repo)")]
    MissingRepository,

    #[error("a personal access token is required")]
    MissingCredential,

    #[error("malformed repository '{0}': expected owner/repo")]
    MalformedRepository(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid runner name '{name}': {reason}")]
    InvalidRunnerName { name: String, reason: String },

    #[error("invalid SHA-256 digest '{0}': expected 64 hexadecimal digits")]
    InvalidChecksum(String),

    #[error("invalid timeout '{0}': expected a positive number of seconds")]
    InvalidTimeout(String),

    #[error("no tar.gz runner package is published for platform '{0}'")]
    UnsupportedPlatform(String),
}

/// Fetching the runner archive failed.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download of {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("download of {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// Provisioning the runner package failed.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to extract {}: {reason}", .path.display())]
    ExtractError { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ProvisionError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        ProvisionError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Exchanging the credential for a registration token failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("registration was refused with HTTP status {status}: check token scopes and repository name")]
    AuthError { status: u16 },

    #[error("registration request failed with HTTP status {0}")]
    Status(u16),

    #[error("registration request failed: {0}")]
    Transport(String),

    #[error("malformed registration response: {0}")]
    ParseError(String),

    #[error("registration response contained an empty token")]
    EmptyTokenError,
}

/// The runner's own configuration step failed.
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error("runner configuration failed: {0}")]
    Failed(ProcessExitCodeError),

    #[error("failed to launch {script}: {error}")]
    Spawn { script: String, error: io::Error },
}

/// Installing or starting the background service failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("insufficient privileges to {action} the runner service: {reason}")]
    Permission {
        action: &'static str,
        reason: String,
    },

    #[error("service {action} failed: {error}")]
    Failed {
        action: &'static str,
        error: ProcessExitCodeError,
    },

    #[error("failed to launch {script}: {error}")]
    Spawn { script: String, error: io::Error },
}

/// The step of the workflow that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Validation,
    Provisioning,
    Registration,
    Configuration,
    Service,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Input => "input",
            Stage::Validation => "validation",
            Stage::Provisioning => "provisioning",
            Stage::Registration => "registration",
            Stage::Configuration => "configuration",
            Stage::Service => "service",
        };
        f.write_str(label)
    }
}

/// Any failure of the setup workflow.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Configure(#[from] ConfigureError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl SetupError {
    pub fn stage(&self) -> Stage {
        match self {
            SetupError::Input(_) => Stage::Input,
            SetupError::Validation(_) => Stage::Validation,
            SetupError::Provision(_) => Stage::Provisioning,
            SetupError::Registration(_) => Stage::Registration,
            SetupError::Configure(_) => Stage::Configuration,
            SetupError::Service(_) => Stage::Service,
        }
    }

    /// An actionable next step for the operator, if one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SetupError::Registration(RegistrationError::AuthError { .. }) => Some(
                "Hint: check that the token has the 'repo' scope (or admin access to the \
                 repository) and that the repository name is spelled owner/repo.",
            ),
            SetupError::Service(ServiceError::Permission { .. }) => {
                Some("Hint: re-run as root, or allow this user to run sudo.")
            }
            _ => None,
        }
    }
}
