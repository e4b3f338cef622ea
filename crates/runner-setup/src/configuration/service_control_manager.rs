// ServiceControlManager: drives the runner's own `config.sh` and `svc.sh`
// to register the runner and run it as a background service.

use async_trait::async_trait;
use runner_common::constants::{command_line::runner, path, WellKnownConfigFile};
use runner_common::host_context::HostContext;
use runner_common::terminal::Terminal;
use runner_common::tracing::Tracing;
use runner_sdk::{ProcessDataReceivedEventArgs, ProcessInvoker, ProcessOutput, TraceWriter};
use std::io;
use std::sync::Arc;

use crate::configuration::package_provisioner::RunnerPackage;
use crate::errors::{ConfigureError, ServiceError};
use crate::secret::{self, RegistrationToken};

/// Exit status a shell uses when a command exists but cannot be executed.
const EXIT_CANNOT_EXECUTE: i32 = 126;

/// Output fragments that indicate missing privileges.
const PRIVILEGE_MARKERS: &[&str] = &[
    "must run as",
    "permission denied",
    "not in the sudoers",
    "a password is required",
];

/// How the service scripts obtain the privileges they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Prefix with `sudo` unless already running as root.
    Sudo,
    /// Run the scripts as the current user.
    Direct,
}

/// Configures the runner and manages its service.
#[async_trait]
pub trait RunnerInstaller: Send + Sync {
    /// Register the runner. `token` is consumed whatever the outcome.
    async fn configure(
        &self,
        package: &RunnerPackage,
        repo_url: &str,
        token: RegistrationToken,
        runner_name: &str,
    ) -> Result<(), ConfigureError>;

    async fn install_service(&self, package: &RunnerPackage) -> Result<(), ServiceError>;

    async fn start_service(&self, package: &RunnerPackage) -> Result<(), ServiceError>;
}

pub struct ServiceControlManager {
    context: Arc<HostContext>,
    terminal: Arc<Terminal>,
    trace: Tracing,
    invoker: ProcessInvoker,
    elevation: Elevation,
}

impl ServiceControlManager {
    pub fn new(context: Arc<HostContext>, terminal: Arc<Terminal>, elevation: Elevation) -> Self {
        let trace = context.get_trace("ServiceControlManager");
        let invoker = ProcessInvoker::new(Arc::new(context.get_trace("ProcessInvoker")));
        Self {
            context,
            terminal,
            trace,
            invoker,
            elevation,
        }
    }

    /// Run a child, echoing its output through the masker.
    async fn run(
        &self,
        package: &RunnerPackage,
        file_name: &str,
        arguments: &[String],
    ) -> io::Result<ProcessOutput> {
        let masker = self.context.secret_masker.clone();
        let terminal = self.terminal.clone();
        let mut echo = move |line: &ProcessDataReceivedEventArgs| {
            terminal.write_line(&masker.mask_secrets(&line.data), None);
        };

        self.invoker
            .execute(&package.home_dir, file_name, arguments, &mut echo)
            .await
    }

    /// The program and arguments used to run `svc.sh <action>`.
    fn service_command(
        &self,
        package: &RunnerPackage,
        action: &'static str,
    ) -> Result<(String, Vec<String>), ServiceError> {
        let script = package.service_script().display().to_string();

        if self.elevation == Elevation::Direct || is_root() {
            return Ok((script, vec![action.to_string()]));
        }

        let sudo = which::which("sudo").map_err(|_| ServiceError::Permission {
            action,
            reason: "sudo was not found; run as root or pass --no-sudo".to_string(),
        })?;
        Ok((sudo.display().to_string(), vec![script, action.to_string()]))
    }

    async fn run_service_script(
        &self,
        package: &RunnerPackage,
        action: &'static str,
    ) -> Result<(), ServiceError> {
        let (file_name, arguments) = self.service_command(package, action)?;
        self.trace
            .info(&format!("Running {} {}", file_name, arguments.join(" ")));

        let output = match self.run(package, &file_name, &arguments).await {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(ServiceError::Permission {
                    action,
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                return Err(ServiceError::Spawn {
                    script: file_name,
                    error: e,
                })
            }
        };

        if output.success() {
            return Ok(());
        }

        if output.exit_code == EXIT_CANNOT_EXECUTE
            || PRIVILEGE_MARKERS.iter().any(|m| output.any_line_contains(m))
        {
            return Err(ServiceError::Permission {
                action,
                reason: format!("{} exited with code {}", path::SERVICE_SCRIPT, output.exit_code),
            });
        }

        match output.ensure_success(path::SERVICE_SCRIPT) {
            Ok(()) => Ok(()),
            Err(error) => Err(ServiceError::Failed { action, error }),
        }
    }
}

#[async_trait]
impl RunnerInstaller for ServiceControlManager {
    async fn configure(
        &self,
        package: &RunnerPackage,
        repo_url: &str,
        token: RegistrationToken,
        runner_name: &str,
    ) -> Result<(), ConfigureError> {
        if self.context.has_config_file(WellKnownConfigFile::Runner) {
            self.trace.warning(&format!(
                "{} already holds a runner registration; it will be replaced",
                self.context.root_directory().display()
            ));
        }

        let script = package.config_script().display().to_string();
        let mut arguments = vec![
            runner::URL.to_string(),
            repo_url.to_string(),
            runner::TOKEN.to_string(),
            token.expose_secret().to_string(),
            runner::NAME.to_string(),
            runner_name.to_string(),
            runner::UNATTENDED.to_string(),
            runner::REPLACE.to_string(),
        ];
        drop(token);

        self.trace
            .info(&format!("Configuring runner '{}' for {}", runner_name, repo_url));
        let result = self.run(package, &script, &arguments).await;
        arguments.iter_mut().for_each(secret::wipe);

        let output = result.map_err(|error| ConfigureError::Spawn {
            script: path::CONFIG_SCRIPT.to_string(),
            error,
        })?;

        output
            .ensure_success(path::CONFIG_SCRIPT)
            .map_err(ConfigureError::Failed)
    }

    async fn install_service(&self, package: &RunnerPackage) -> Result<(), ServiceError> {
        if self.context.has_config_file(WellKnownConfigFile::Service) {
            self.trace
                .info("A service is already installed for this runner home; reinstalling");
        }
        self.run_service_script(package, runner::INSTALL).await
    }

    async fn start_service(&self, package: &RunnerPackage) -> Result<(), ServiceError> {
        self.run_service_script(package, runner::START).await
    }
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::fs;
    use std::io::Cursor;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_script(dir: &Path, name: &str, body: &str) {
        let script = dir.join(name);
        fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn package(dir: &Path) -> RunnerPackage {
        RunnerPackage {
            version: "2.321.0".to_string(),
            platform: "linux-x64".to_string(),
            file_name: "actions-runner-linux-x64-2.321.0.tar.gz".to_string(),
            archive_path: dir.join("actions-runner-linux-x64-2.321.0.tar.gz"),
            home_dir: dir.to_path_buf(),
        }
    }

    fn manager(dir: &Path) -> (ServiceControlManager, Arc<HostContext>, Arc<Mutex<Vec<u8>>>) {
        let context = HostContext::new(dir);
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let terminal = Arc::new(Terminal::with_io(Cursor::new(String::new()), buffer.clone()));
        (
            ServiceControlManager::new(context.clone(), terminal, Elevation::Direct),
            context,
            buffer,
        )
    }

    fn shown(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(buffer.lock().clone()).unwrap()
    }

    #[tokio::test]
    async fn test_configure_passes_runner_arguments() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "config.sh", "echo \"$@\" > args.txt\necho \"configured with $4\"");
        let (manager, context, buffer) = manager(dir.path());
        context.secret_masker.add_value("REGTOKEN");

        manager
            .configure(
                &package(dir.path()),
                "https://github.com/acme/widgets",
                RegistrationToken::new("REGTOKEN"),
                "build-01",
            )
            .await
            .unwrap();

        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(
            args.trim(),
            "--url https://github.com/acme/widgets --token REGTOKEN --name build-01 --unattended --replace"
        );
        assert_eq!(shown(&buffer), "configured with ***\n");
    }

    #[tokio::test]
    async fn test_configure_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "config.sh", "echo 'Http response code: Unauthorized' >&2\nexit 2");
        let (manager, _, _) = manager(dir.path());

        let err = manager
            .configure(&package(dir.path()), "https://github.com/a/b", RegistrationToken::new("t"), "r")
            .await
            .unwrap_err();

        match err {
            ConfigureError::Failed(e) => assert_eq!(e.exit_code, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_configure_missing_script_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _, _) = manager(dir.path());

        let err = manager
            .configure(&package(dir.path()), "https://github.com/a/b", RegistrationToken::new("t"), "r")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigureError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_install_and_start_succeed() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "svc.sh", "echo \"$1\" >> calls.txt");
        let (manager, _, _) = manager(dir.path());
        let package = package(dir.path());

        manager.install_service(&package).await.unwrap();
        manager.start_service(&package).await.unwrap();

        let calls = fs::read_to_string(dir.path().join("calls.txt")).unwrap();
        assert_eq!(calls, "install\nstart\n");
    }

    #[tokio::test]
    async fn test_privilege_failures_are_permission_errors() {
        for body in [
            "echo 'Must run as sudo'\nexit 1",
            "echo 'a password is required' >&2\nexit 1",
            "exit 126",
        ] {
            let dir = tempfile::tempdir().unwrap();
            write_script(dir.path(), "svc.sh", body);
            let (manager, _, _) = manager(dir.path());

            let err = manager.install_service(&package(dir.path())).await.unwrap_err();
            assert!(matches!(err, ServiceError::Permission { action: "install", .. }), "{body}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_other_failures_are_service_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "svc.sh", "echo 'Failed to start unit'\nexit 3");
        let (manager, _, _) = manager(dir.path());

        let err = manager.start_service(&package(dir.path())).await.unwrap_err();
        match err {
            ServiceError::Failed { action, error } => {
                assert_eq!(action, "start");
                assert_eq!(error.exit_code, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unexecutable_script_is_permission_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("svc.sh");
        fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();
        let (manager, _, _) = manager(dir.path());

        let err = manager.install_service(&package(dir.path())).await.unwrap_err();
        assert!(matches!(err, ServiceError::Permission { .. }), "{err:?}");
    }
}
