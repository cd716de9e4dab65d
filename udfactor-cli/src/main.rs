use std::io::stdout;

use anyhow::{Context, Result};
use clap::{crate_version, value_parser, Arg, Command};
use clap_complete::{generate, Shell};

pub mod io;

pub mod progress;

pub mod sent_proc;

mod subcommands;

pub mod traits;
use traits::UdFactorApp;

pub mod util;

fn main() -> Result<()> {
    // Known subapplications.
    let apps = vec![
        subcommands::AnnotateApp::app(),
        subcommands::BatchApp::app(),
        subcommands::PrepareApp::app(),
    ];

    env_logger::init();

    let cli = Command::new("udfactor")
        .about("Factored morphosyntactic annotation")
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommands(apps)
        .subcommand(
            Command::new("completions")
                .about("Generate completion scripts for your shell")
                .arg_required_else_help(true)
                .arg(Arg::new("shell").value_parser(value_parser!(Shell))),
        );
    let matches = cli.clone().get_matches();

    match matches.subcommand() {
        Some(("annotate", matches)) => subcommands::AnnotateApp::parse(matches)?.run(),
        Some(("batch", matches)) => subcommands::BatchApp::parse(matches)?.run(),
        Some(("completions", matches)) => {
            let shell = matches
                .get_one::<Shell>("shell")
                .copied()
                .context("No shell given")?;
            write_completion_script(cli, shell);
            Ok(())
        }
        Some(("prepare", matches)) => subcommands::PrepareApp::parse(matches)?.run(),
        _unknown => unreachable!(),
    }
}

fn write_completion_script(mut cli: Command, shell: Shell) {
    generate(shell, &mut cli, "udfactor", &mut stdout());
}
