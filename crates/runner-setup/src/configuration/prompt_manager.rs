// PromptManager: collects the repository reference and the personal access
// token from the operator.

use parking_lot::Mutex;
use runner_common::host_context::HostContext;
use runner_common::terminal::Terminal;
use runner_common::tracing::Tracing;
use runner_sdk::TraceWriter;
use std::sync::Arc;

use crate::errors::InputError;
use crate::secret::Credential;

pub const REPOSITORY_PROMPT: &str = "Enter your GitHub repository (format: owner/repo): ";
pub const CREDENTIAL_PROMPT: &str = "Enter your GitHub Personal Access Token (PAT): ";

/// What the operator supplied. Either value may be empty; the validator
/// decides what to do about that.
#[derive(Debug)]
pub struct OperatorInput {
    pub repository: String,
    pub credential: Credential,
}

/// Source of the operator's input.
pub trait InputCollector: Send + Sync {
    fn collect(&self) -> Result<OperatorInput, InputError>;
}

/// Prompts on the terminal for anything not already supplied.
///
/// The repository is read visibly; the token is read with echo disabled.
/// Each value is read once. In unattended mode nothing is prompted for and
/// missing values come back empty.
pub struct PromptManager {
    context: Arc<HostContext>,
    terminal: Arc<Terminal>,
    trace: Tracing,
    unattended: bool,
    repository: Option<String>,
    credential: Mutex<Option<Credential>>,
}

impl PromptManager {
    pub fn new(context: Arc<HostContext>, terminal: Arc<Terminal>, unattended: bool) -> Self {
        let trace = context.get_trace("PromptManager");
        Self {
            context,
            terminal,
            trace,
            unattended,
            repository: None,
            credential: Mutex::new(None),
        }
    }

    /// Use this repository instead of prompting for it.
    pub fn with_repository(mut self, repository: Option<String>) -> Self {
        self.repository = repository;
        self
    }

    /// Use this credential instead of prompting for it.
    pub fn with_credential(self, credential: Option<Credential>) -> Self {
        *self.credential.lock() = credential;
        self
    }

    fn read_repository(&self) -> Result<String, InputError> {
        if let Some(ref repository) = self.repository {
            return Ok(repository.trim().to_string());
        }
        if self.unattended {
            self.trace.info("No repository supplied in unattended mode");
            return Ok(String::new());
        }

        self.terminal.write(REPOSITORY_PROMPT, None);
        Ok(self.terminal.read_line()?.trim().to_string())
    }

    fn read_credential(&self) -> Result<Credential, InputError> {
        if let Some(credential) = self.credential.lock().take() {
            return Ok(credential);
        }
        if self.unattended {
            self.trace.info("No access token supplied in unattended mode");
            return Ok(Credential::new(String::new()));
        }

        self.terminal.write(CREDENTIAL_PROMPT, None);
        Ok(Credential::from_raw(self.terminal.read_secret()?))
    }
}

impl InputCollector for PromptManager {
    fn collect(&self) -> Result<OperatorInput, InputError> {
        let repository = self.read_repository()?;
        let credential = self.read_credential()?;
        credential.register(&self.context.secret_masker);

        self.trace.info(&format!(
            "Collected repository '{}' and a token of {} characters",
            repository,
            credential.expose_secret().chars().count()
        ));

        Ok(OperatorInput {
            repository,
            credential,
        })
    }
}
