use crate::{commands::*, utils::*};
use anyhow::Context;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "grog", author, about, long_about = None, version)]
struct GrogCli {
    #[clap(subcommand)]
    command: GrogCliCommands,
}

#[derive(Subcommand)]
pub enum GrogCliCommands {
    Run(RunCmd),
    Info(InfoCmd),
}

fn main() {
    // Usage errors exit with the generic failure code; clap's own code 2
    // would read as an oversized image.
    let args = match GrogCli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { EXIT_FAILURE } else { EXIT_OK });
        }
    };

    let result = match args.command {
        GrogCliCommands::Run(cmd) => cmd
            .run()
            .context("could not run grog image due to previous error"),
        GrogCliCommands::Info(cmd) => cmd.run(),
    };
    if let Err(e) = result {
        let code = exit_code(&e);
        print_error(e);
        std::process::exit(code);
    }
}
