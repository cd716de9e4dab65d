use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use udfactor::dataset::Corpus;

use crate::io::{load_config, save_mappings};
use crate::progress::ReadProgress;
use crate::traits::UdFactorApp;

const CONFIG: &str = "CONFIG";
static TRAIN_DATA: &str = "TRAIN_DATA";

pub struct PrepareApp {
    config: String,
    train_data: String,
}

impl UdFactorApp for PrepareApp {
    fn app() -> Command {
        Command::new("prepare")
            .arg_required_else_help(true)
            .about("Construct the mappings of a training corpus")
            .arg(
                Arg::new(CONFIG)
                    .help("udfactor configuration file")
                    .index(1)
                    .required(true),
            )
            .arg(
                Arg::new(TRAIN_DATA)
                    .help("Training data")
                    .index(2)
                    .required(true),
            )
    }

    fn parse(matches: &ArgMatches) -> Result<Self> {
        let config = matches
            .get_one::<String>(CONFIG)
            .context("No configuration file given")?
            .into();
        let train_data = matches
            .get_one::<String>(TRAIN_DATA)
            .context("No training data given")?
            .into();

        Ok(PrepareApp { config, train_data })
    }

    fn run(&self) -> Result<()> {
        let config = load_config(&self.config)?;

        let train_file = File::open(&self.train_data)
            .context(format!("Cannot open train data file: {}", self.train_data))?;
        let read_progress = ReadProgress::new(train_file).context("Cannot create progress bar")?;

        let (corpus, mappings) = Corpus::read_train(
            BufReader::new(read_progress),
            &config.corpus.root_factors,
            &config.corpus.train_options(),
        )
        .context(format!("Cannot read training data: {}", self.train_data))?;

        let mappings = mappings.freeze();
        log::info!(
            "Training data: {} sentences, {} document variants",
            corpus.len(),
            mappings.n_variants()
        );
        mappings.log_sizes();

        save_mappings(&config, &mappings)
    }
}
