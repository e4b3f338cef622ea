// Command-line options, with RUNNER_SETUP_INPUT_* environment fallback.

use clap::Parser;
use runner_common::constants::command_line::{self, args, flags};
use runner_common::secret_masker::MASK;
use runner_sdk::StringUtil;
use std::collections::BTreeMap;
use std::fmt;

use crate::secret::Credential;

/// Options that take a value, in help order.
const VALUE_ARGS: &[&str] = &[
    args::REPOSITORY,
    args::PAT,
    args::NAME,
    args::ROOT,
    args::RUNNER_VERSION,
    args::PLATFORM,
    args::URL,
    args::API_URL,
    args::DOWNLOAD_URL,
    args::SHA256,
    args::TIMEOUT,
];

/// Parsed command settings.
///
/// Every option left off the command line can be supplied through
/// `RUNNER_SETUP_INPUT_<NAME>` (upper-case, `-` replaced by `_`), applied by
/// `with_env_fallback`.
#[derive(Parser, Clone, Default)]
#[command(
    name = "runner-setup",
    version,
    about = "Register a self-hosted runner with a repository and install it as a service"
)]
pub struct CommandSettings {
    /// Repository to register the runner with (owner/repo).
    #[arg(long, value_name = "OWNER/REPO")]
    repository: Option<String>,

    /// Personal access token. Prefer the prompt or the environment variable.
    #[arg(long, value_name = "TOKEN")]
    pat: Option<String>,

    /// Runner display name. Defaults to the host name.
    #[arg(long)]
    name: Option<String>,

    /// Runner home directory holding the archive and its contents.
    #[arg(long, value_name = "DIR")]
    root: Option<String>,

    /// Runner release to install.
    #[arg(long = "runner-version", value_name = "VERSION")]
    runner_version: Option<String>,

    /// Archive platform, e.g. linux-x64.
    #[arg(long)]
    platform: Option<String>,

    /// Web URL of the forge.
    #[arg(long)]
    url: Option<String>,

    /// REST API base. Derived from --url when omitted.
    #[arg(long = "api-url", value_name = "URL")]
    api_url: Option<String>,

    /// Base URL the runner archive is downloaded from.
    #[arg(long = "download-url", value_name = "URL")]
    download_url: Option<String>,

    /// Expected SHA-256 of the runner archive.
    #[arg(long, value_name = "HEX")]
    sha256: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<String>,

    /// Run the service scripts without sudo.
    #[arg(long = "no-sudo")]
    no_sudo: bool,

    /// Never prompt; missing values fail validation.
    #[arg(long)]
    unattended: bool,
}

impl CommandSettings {
    /// Fill options absent from the command line from `lookup(env_key)`.
    ///
    /// Empty values are treated as absent. Flags accept the usual boolean
    /// spellings (`1`, `true`, `yes`).
    pub fn with_env_fallback(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for name in VALUE_ARGS {
            let key = StringUtil::env_key(command_line::ENV_PREFIX, name);
            if let Some(slot) = self.value_slot(name) {
                if slot.is_none() {
                    *slot = lookup(&key).filter(|v| !v.is_empty());
                }
            }
        }

        for name in [flags::NO_SUDO, flags::UNATTENDED] {
            let key = StringUtil::env_key(command_line::ENV_PREFIX, name);
            let from_env = lookup(&key)
                .and_then(|v| StringUtil::convert_to_bool(&v))
                .unwrap_or(false);
            match name {
                flags::NO_SUDO => self.no_sudo |= from_env,
                _ => self.unattended |= from_env,
            }
        }

        self
    }

    fn value_slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        let slot = match name {
            args::REPOSITORY => &mut self.repository,
            args::PAT => &mut self.pat,
            args::NAME => &mut self.name,
            args::ROOT => &mut self.root,
            args::RUNNER_VERSION => &mut self.runner_version,
            args::PLATFORM => &mut self.platform,
            args::URL => &mut self.url,
            args::API_URL => &mut self.api_url,
            args::DOWNLOAD_URL => &mut self.download_url,
            args::SHA256 => &mut self.sha256,
            args::TIMEOUT => &mut self.timeout,
            _ => return None,
        };
        Some(slot)
    }

    /// Get a named option value.
    pub fn get_arg(&self, name: &str) -> Option<&str> {
        let value = match name {
            args::REPOSITORY => &self.repository,
            args::PAT => &self.pat,
            args::NAME => &self.name,
            args::ROOT => &self.root,
            args::RUNNER_VERSION => &self.runner_version,
            args::PLATFORM => &self.platform,
            args::URL => &self.url,
            args::API_URL => &self.api_url,
            args::DOWNLOAD_URL => &self.download_url,
            args::SHA256 => &self.sha256,
            args::TIMEOUT => &self.timeout,
            _ => return None,
        };
        value.as_deref()
    }

    pub fn get_repository(&self) -> Option<&str> {
        self.get_arg(args::REPOSITORY)
    }

    pub fn get_name(&self) -> Option<&str> {
        self.get_arg(args::NAME)
    }

    pub fn get_root(&self) -> Option<&str> {
        self.get_arg(args::ROOT)
    }

    pub fn get_runner_version(&self) -> Option<&str> {
        self.get_arg(args::RUNNER_VERSION)
    }

    pub fn get_platform(&self) -> Option<&str> {
        self.get_arg(args::PLATFORM)
    }

    pub fn get_url(&self) -> Option<&str> {
        self.get_arg(args::URL)
    }

    pub fn get_api_url(&self) -> Option<&str> {
        self.get_arg(args::API_URL)
    }

    pub fn get_download_url(&self) -> Option<&str> {
        self.get_arg(args::DOWNLOAD_URL)
    }

    pub fn get_sha256(&self) -> Option<&str> {
        self.get_arg(args::SHA256)
    }

    pub fn get_timeout(&self) -> Option<&str> {
        self.get_arg(args::TIMEOUT)
    }

    /// Move the personal access token out of the settings, if one was given.
    pub fn take_credential(&mut self) -> Option<Credential> {
        self.pat.take().map(Credential::from_raw)
    }

    pub fn is_no_sudo(&self) -> bool {
        self.no_sudo
    }

    pub fn is_unattended(&self) -> bool {
        self.unattended
    }

    /// All supplied options, with secret values replaced by `***`.
    pub fn sanitized_args(&self) -> BTreeMap<String, String> {
        let secrets = args::secrets();
        let mut sanitized = BTreeMap::new();

        for name in VALUE_ARGS {
            if let Some(value) = self.get_arg(name) {
                let shown = if secrets.contains(name) { MASK } else { value };
                sanitized.insert(name.to_string(), shown.to_string());
            }
        }
        if self.no_sudo {
            sanitized.insert(flags::NO_SUDO.to_string(), "true".to_string());
        }
        if self.unattended {
            sanitized.insert(flags::UNATTENDED.to_string(), "true".to_string());
        }

        sanitized
    }
}

impl fmt::Debug for CommandSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.sanitized_args()).finish()
    }
}
