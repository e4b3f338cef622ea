// RunnerSetup: runs the setup stages in order and stops at the first failure.

use anyhow::{Context, Result};
use runner_common::constants::return_code;
use runner_common::host_context::HostContext;
use runner_common::terminal::Terminal;
use runner_common::tracing::Tracing;
use runner_common::HttpClientFactory;
use runner_sdk::TraceWriter;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use crate::command_settings::CommandSettings;
use crate::config::SetupConfig;
use crate::configuration::package_provisioner::{PackageProvisioner, PackageSource};
use crate::configuration::prompt_manager::{InputCollector, OperatorInput, PromptManager};
use crate::configuration::registration_client::{RegistrationApi, RegistrationClient};
use crate::configuration::service_control_manager::{RunnerInstaller, ServiceControlManager};
use crate::configuration::validators::{self, RepositoryRef};
use crate::errors::SetupError;

/// What a successful run set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSummary {
    pub repository: String,
    pub runner_name: String,
    pub repository_url: String,
    pub runner_home: PathBuf,
}

impl fmt::Display for SetupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Runner '{}' is registered with {} and running as a service (home: {}).",
            self.runner_name,
            self.repository,
            self.runner_home.display()
        )
    }
}

/// The setup workflow.
///
/// Order: collect input, validate, provision the package, request a
/// registration token, configure, install and start the service. Nothing is
/// retried or rolled back; a downloaded package stays cached.
pub struct RunnerSetup {
    trace: Tracing,
    input: Box<dyn InputCollector>,
    packages: Box<dyn PackageSource>,
    registration: Box<dyn RegistrationApi>,
    installer: Box<dyn RunnerInstaller>,
    github_url: Url,
    runner_name: String,
}

impl RunnerSetup {
    pub fn new(
        context: Arc<HostContext>,
        config: &SetupConfig,
        input: Box<dyn InputCollector>,
        packages: Box<dyn PackageSource>,
        registration: Box<dyn RegistrationApi>,
        installer: Box<dyn RunnerInstaller>,
    ) -> Self {
        Self {
            trace: context.get_trace("RunnerSetup"),
            input,
            packages,
            registration,
            installer,
            github_url: config.github_url.clone(),
            runner_name: config.runner_name.clone(),
        }
    }

    /// Wire the production components from the resolved configuration.
    pub fn from_config(
        context: Arc<HostContext>,
        config: &SetupConfig,
        settings: &mut CommandSettings,
        terminal: Arc<Terminal>,
    ) -> Result<Self> {
        let client = HttpClientFactory::create_client(config.timeout)
            .context("failed to create the HTTP client")?;

        let input = PromptManager::new(context.clone(), terminal.clone(), config.unattended)
            .with_repository(settings.get_repository().map(str::to_string))
            .with_credential(settings.take_credential());
        let packages = PackageProvisioner::new(context.clone(), config.package_settings(), client.clone());
        let registration = RegistrationClient::new(context.clone(), client, config.api_url.clone());
        let installer = ServiceControlManager::new(context.clone(), terminal, config.elevation);

        Ok(Self::new(
            context,
            config,
            Box::new(input),
            Box::new(packages),
            Box::new(registration),
            Box::new(installer),
        ))
    }

    pub async fn run(&self) -> Result<SetupSummary, SetupError> {
        let OperatorInput {
            repository,
            credential,
        } = self.input.collect()?;

        validators::validate(&repository, &credential)?;
        let repo = RepositoryRef::parse(&repository)?;
        self.trace.info(&format!("Setting up a runner for {}", repo));

        let package = self.packages.ensure_package().await?;

        let token = self
            .registration
            .request_registration_token(&repo, credential)
            .await?;

        let repository_url = repo.web_url(&self.github_url);
        self.installer
            .configure(&package, &repository_url, token, &self.runner_name)
            .await?;
        self.installer.install_service(&package).await?;
        self.installer.start_service(&package).await?;

        self.trace.info("Runner setup completed");
        Ok(SetupSummary {
            repository: repo.to_string(),
            runner_name: self.runner_name.clone(),
            repository_url,
            runner_home: package.home_dir,
        })
    }
}

/// Print the outcome and return the process exit code.
pub fn report(outcome: &Result<SetupSummary, SetupError>, terminal: &Terminal) -> i32 {
    match outcome {
        Ok(summary) => {
            terminal.write_success_message(&summary.to_string());
            return_code::SUCCESS
        }
        Err(e) => {
            terminal.write_error(&format!("Error [{}]: {}", e.stage(), e));
            if let Some(hint) = e.hint() {
                terminal.write_warning(hint);
            }
            return_code::TERMINATED_ERROR
        }
    }
}

/// Print a failure to wire up the workflow and return the process exit code.
pub fn report_startup_failure(error: &anyhow::Error, terminal: &Terminal) -> i32 {
    terminal.write_error(&format!("Error [setup]: {:#}", error));
    return_code::TERMINATED_ERROR
}
