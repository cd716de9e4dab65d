use anyhow::Result;
use clap::{ArgMatches, Command};

/// A `udfactor` subcommand.
pub trait UdFactorApp
where
    Self: Sized,
{
    fn app() -> Command;

    fn parse(matches: &ArgMatches) -> Result<Self>;

    fn run(&self) -> Result<()>;
}
