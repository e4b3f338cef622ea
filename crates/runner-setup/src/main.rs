// Entry point for runner-setup.
//
// Parses the command line, resolves the configuration, creates a HostContext
// rooted at the runner home, and delegates to the RunnerSetup workflow.

use clap::Parser;
use runner_common::constants::{self, return_code};
use runner_common::host_context::HostContext;
use runner_common::terminal::{self, Terminal};
use runner_sdk::TraceWriter;
use std::sync::Arc;

use runner_setup::command_settings::CommandSettings;
use runner_setup::config::SetupConfig;
use runner_setup::errors::SetupError;
use runner_setup::setup::{self, RunnerSetup};

fn main() {
    let settings = CommandSettings::parse().with_env_fallback(|key| std::env::var(key).ok());

    // Diagnostics go to stderr so the prompts on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Every step runs to completion before the next starts.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error [setup]: failed to build Tokio runtime: {}", e);
            std::process::exit(return_code::TERMINATED_ERROR);
        }
    };

    let exit_code = runtime.block_on(run(settings));

    std::process::exit(exit_code);
}

async fn run(mut settings: CommandSettings) -> i32 {
    let config = match SetupConfig::from_settings(&settings) {
        Ok(config) => config,
        Err(e) => return setup::report(&Err(SetupError::from(e)), &Terminal::new()),
    };

    let context = HostContext::new(&config.runner_home);
    let trace = context.get_trace("RunnerSetup");
    terminal::install_interrupt_handler(&trace);

    trace.info(&format!(
        "{} starting on {} / {}",
        runner_sdk::SetupPackage::user_agent(),
        constants::CURRENT_PLATFORM,
        constants::CURRENT_ARCHITECTURE
    ));
    trace.info(&format!("Arguments: {:?}", settings.sanitized_args()));

    let terminal = Arc::new(Terminal::new().with_trace(context.get_trace("Terminal")));

    let runner_setup = match RunnerSetup::from_config(context, &config, &mut settings, terminal.clone()) {
        Ok(runner_setup) => runner_setup,
        Err(e) => return setup::report_startup_failure(&e, &terminal),
    };

    let outcome = runner_setup.run().await;
    if let Err(ref e) = outcome {
        trace.error_err(e);
    }
    setup::report(&outcome, &terminal)
}
