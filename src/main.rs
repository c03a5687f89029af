use clap::Parser;
use mediascoop::cli::{self, Cli};
use mediascoop::error::AppError;
use mediascoop::logging::Logging;
use tracing::{error, info};

/// Main entry point for the application.
///
/// # Steps
/// 1. Parses the command line
/// 2. Initializes logging, verbose when `-v` is given
/// 3. Runs the command or the interactive session
///
/// Exits with status 1 when an item failed, the batch file was unusable
/// or the session was interrupted.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let logging = match Logging::init(cli.verbose) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let code = match cli::run(cli, &logging).await {
        Ok(true) => {
            info!("finished");
            0
        }
        Ok(false) => 1,
        Err(AppError::Interrupted) => {
            println!("\nInterrupted by user.");
            1
        }
        Err(e) => {
            error!("Application error: {}", e);
            1
        }
    };

    // flush the non-blocking log writer before exiting
    drop(logging);
    std::process::exit(code);
}
