use std::env::var;
use std::io::stderr;
use std::process::ExitCode;

use clap::Parser;
use eyre::Result as EyreResult;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{registry, EnvFilter};

mod cli;
mod defaults;
mod output;
mod session;

use cli::{CliError, RootCommand};
use output::Output;

#[tokio::main]
async fn main() -> ExitCode {
    let command = RootCommand::parse();
    let output = Output::new(command.args.output_format);

    if let Err(err) = setup() {
        let err = CliError::Setup(err);
        output.write(&err);
        return err.into();
    }

    match command.run(&output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => err.into(),
    }
}

fn setup() -> EyreResult<()> {
    let directives = match var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => defaults::DEFAULT_LOG_DIRECTIVES.to_owned(),
    };

    registry()
        .with(EnvFilter::builder().parse(directives)?)
        .with(layer().with_writer(stderr))
        .try_init()?;

    color_eyre::install()?;

    Ok(())
}
