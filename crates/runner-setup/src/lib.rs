// runner-setup: registers a self-hosted runner with a repository and installs
// it as a background service. Depends on `runner-sdk` and `runner-common`.
//
// Flow:
//   main → RunnerSetup::run → PromptManager → validators → PackageProvisioner
//        → RegistrationClient → ServiceControlManager (configure, install, start)

pub mod command_settings;
pub mod config;
pub mod configuration;
pub mod errors;
pub mod secret;
pub mod setup;
