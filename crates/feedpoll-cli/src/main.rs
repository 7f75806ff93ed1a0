use clap::Parser;
use feedpoll_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible.
    if cli.stderr || logging::init_logging(cli.verbose).is_err() {
        logging::init_logging_stderr(cli.verbose);
    }

    if let Err(err) = cli.run() {
        tracing::error!("{:#}", err);
        eprintln!("feedpoll error: {:#}", err);
        std::process::exit(1);
    }
}
