// SetupConfig: every configurable value resolved once from the command
// settings and handed to the components.

use runner_common::constants::{self, defaults};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::command_settings::CommandSettings;
use crate::configuration::package_provisioner::PackageSettings;
use crate::configuration::service_control_manager::Elevation;
use crate::configuration::validators;
use crate::errors::ValidationError;

/// Resolved configuration for one setup run.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Web URL of the forge; the runner target URL is built from it.
    pub github_url: Url,
    /// REST API base for the registration-token call.
    pub api_url: String,
    /// Base URL of the runner release downloads.
    pub download_base_url: String,
    pub runner_version: String,
    pub platform: String,
    /// Runner home: cache directory and extraction target.
    pub runner_home: PathBuf,
    pub runner_name: String,
    pub sha256: Option<String>,
    pub timeout: Option<Duration>,
    pub elevation: Elevation,
    pub unattended: bool,
}

impl SetupConfig {
    /// Resolve and validate every value, applying defaults.
    pub fn from_settings(settings: &CommandSettings) -> Result<Self, ValidationError> {
        let github_url = validators::validate_url(settings.get_url().unwrap_or(defaults::GITHUB_URL))?;

        let api_url = match settings.get_api_url() {
            Some(api) => validators::validate_url(api)?.as_str().trim_end_matches('/').to_string(),
            None => api_base_url(&github_url),
        };

        let download_base_url = match settings.get_download_url() {
            Some(base) => validators::validate_url(base)?.as_str().trim_end_matches('/').to_string(),
            None => defaults::DOWNLOAD_BASE_URL.to_string(),
        };

        let runner_name = match settings.get_name() {
            Some(name) => {
                validators::validate_runner_name(name)?;
                name.to_string()
            }
            None => default_runner_name(),
        };

        let sha256 = settings
            .get_sha256()
            .map(validators::validate_sha256)
            .transpose()?;

        let timeout = settings
            .get_timeout()
            .map(validators::validate_timeout)
            .transpose()?;

        let runner_version = settings
            .get_runner_version()
            .unwrap_or(defaults::RUNNER_VERSION)
            .trim()
            .trim_start_matches('v')
            .to_string();

        let platform = settings
            .get_platform()
            .map(str::to_string)
            .unwrap_or_else(constants::current_package_platform);
        validators::validate_platform(&platform)?;

        let runner_home = match settings.get_root() {
            Some(root) => PathBuf::from(root),
            None => default_runner_home(),
        };

        let elevation = if settings.is_no_sudo() {
            Elevation::Direct
        } else {
            Elevation::Sudo
        };

        Ok(Self {
            github_url,
            api_url,
            download_base_url,
            runner_version,
            platform,
            runner_home,
            runner_name,
            sha256,
            timeout,
            elevation,
            unattended: settings.is_unattended(),
        })
    }

    /// Settings for the package provisioner.
    pub fn package_settings(&self) -> PackageSettings {
        PackageSettings {
            version: self.runner_version.clone(),
            platform: self.platform.clone(),
            download_base_url: self.download_base_url.clone(),
            cache_dir: self.runner_home.clone(),
            sha256: self.sha256.clone(),
        }
    }
}

/// REST API base for a forge web URL.
///
/// github.com and `*.ghe.com` use the `api.` host; anything else is treated
/// as GitHub Enterprise Server and uses `/api/v3` on the same host.
pub fn api_base_url(github_url: &Url) -> String {
    let host = github_url.host_str().unwrap_or_default().to_lowercase();

    if host == "github.com" || host == "www.github.com" {
        return defaults::HOSTED_API_URL.to_string();
    }
    if host.ends_with(".ghe.com") {
        return format!("{}://api.{}", github_url.scheme(), host);
    }

    match github_url.port() {
        Some(port) => format!("{}://{}:{}/api/v3", github_url.scheme(), host, port),
        None => format!("{}://{}/api/v3", github_url.scheme(), host),
    }
}

/// The host name when it is a valid runner name, else `runner`.
fn default_runner_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| validators::validate_runner_name(h).is_ok())
        .unwrap_or_else(|| defaults::RUNNER_NAME.to_string())
}

fn default_runner_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(defaults::RUNNER_HOME_DIRECTORY)
}
