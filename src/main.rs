//! NX Tools CLI application
//!
//! Fetches new NX builds and TMG patches, lists local ones and launches NX.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use nx_tools::cli::{
    handle_check, handle_config, handle_find_entry, handle_history, handle_launch, handle_list,
    handle_update, AppContext, Cli, Commands,
};
use nx_tools::config::AppPaths;
use nx_tools::errors::Result;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{} error: {}", e.category(), e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Main application logic, returning the process exit code
async fn run() -> Result<i32> {
    let cli = Cli::parse_args();
    init_logging(&cli);

    info!("NX Tools v{} starting", env!("CARGO_PKG_VERSION"));

    let paths = AppPaths::discover()?;
    let explicit = cli.global.config.as_deref();
    let quiet = cli.global.quiet;

    match cli.command {
        Commands::Update(args) => {
            info!("Executing update command");
            let ctx = AppContext::load(paths, explicit, quiet).await?;
            handle_update(&ctx, args).await?;
        }
        Commands::Check(args) => {
            info!("Executing check command");
            let ctx = AppContext::load(paths, explicit, quiet).await?;
            return Ok(handle_check(&ctx, &args.version).await);
        }
        Commands::List(args) => {
            info!("Executing list command");
            let ctx = AppContext::load(paths, explicit, quiet).await?;
            handle_list(&ctx, args).await?;
        }
        Commands::Launch(args) => {
            info!("Executing launch command");
            let ctx = AppContext::load(paths, explicit, quiet).await?;
            handle_launch(&ctx, args).await?;
        }
        Commands::History => {
            info!("Executing history command");
            handle_history(&paths).await?;
        }
        Commands::FindEntry(args) => {
            info!("Executing find-entry command");
            handle_find_entry(&paths, args.pid).await?;
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(paths, explicit, quiet, args.action).await?;
        }
    }
    Ok(0)
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("nx_tools={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
