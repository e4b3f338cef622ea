// The setup components: input collection, validation, package provisioning,
// token registration, and runner/service installation.

pub mod package_provisioner;
pub mod prompt_manager;
pub mod registration_client;
pub mod service_control_manager;
pub mod validators;
