pub mod artifact;
pub mod catalog;
mod cli;
mod config;
pub mod display;
pub mod error;
pub mod generation;
pub mod geometry;
pub mod history;
pub mod logging;
pub mod session;
pub mod state;
pub mod storage;
pub use error::{AppError, AppResult};

use clap::Parser;

/// Entrypoint used by the `pixmuse` binary.
pub fn run() -> AppResult<()> {
    let cli = cli::Cli::parse();
    logging::init(cli.verbose);
    tracing::info!("starting pixmuse");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;
    runtime.block_on(cli::execute(cli))
}
