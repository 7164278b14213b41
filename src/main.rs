//! session-registry binary entry point.

use std::process::ExitCode;

use session_registry::api::{self, AppState};
use session_registry::cli::{self, Args};
use session_registry::config::Config;
use session_registry::{logging, SessionRegistry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(args)?;
    logging::init(Some(config.log_filter()));

    let node_id = config.node_id()?;
    info!(node = %node_id, "session-registry v{}", env!("CARGO_PKG_VERSION"));

    let registry = SessionRegistry::with_config(config.registry_config());
    let state = AppState::new(registry.clone(), node_id);

    api::serve(config.to_server_config()?, state).await?;

    let closed = registry.close_all(Some("server shutdown"))?;
    info!(sessions = closed, "registry shut down");
    Ok(())
}
