pub mod cli;
mod client;
mod config;
mod host;
mod logging;

use std::rc::Rc;

use anyhow::Context;
use composer_engine::ReqwestGenerator;
use composer_logging::composer_debug;

use cli::{Cli, Command};

pub fn run(cli: Cli) -> anyhow::Result<()> {
    logging::initialize(cli.log, cli.verbose);

    let config = config::load_page_config(cli.config.as_deref())?;
    composer_debug!("Effective configuration: {config:?}");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    match cli.command {
        Command::Generate {
            content,
            tone,
            copy,
        } => runtime.block_on(client::generate(&config, &content, tone, copy)),
        Command::Run { page, activate } => {
            let generator = Rc::new(ReqwestGenerator::new(config.generator_settings())?);
            let local = tokio::task::LocalSet::new();
            let report = local.block_on(
                &runtime,
                host::run_snapshot(&config, &page, activate, generator),
            )?;
            println!("{report}");
            Ok(())
        }
    }
}
