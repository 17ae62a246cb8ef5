use clap::Parser;
use std::process::ExitCode;
use tracing::error;

mod config;
mod export;
mod import;
mod inspect;

use config::Opts;

#[tokio::main]
async fn main() -> ExitCode {
    human_panic::setup_panic!();
    dotenv::dotenv().ok();

    let opt = Opts::parse();
    config::configure_logging(&opt.logging_opts);

    let result = match opt.command {
        config::SubCommands::Inspect(options) => options.run_inspect().await,
        config::SubCommands::Import(options) => options.run_import().await,
        config::SubCommands::Export(options) => options.run_export().await,
    };

    let exit_code = match result {
        Err(e) => {
            error!("Exiting because of {:#}", e);
            1
        }
        Ok(_) => 0,
    };

    ExitCode::from(exit_code)
}
