use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use stdinout::Output;
use udfactor::config::Config;
use udfactor::dataset::{BatchRecord, Batcher, Corpus, CorpusOptions, Embeddings};

use crate::io::{load_config, load_mappings};
use crate::progress::{ReadProgress, SentenceSpeed};
use crate::traits::UdFactorApp;

const CONFIG: &str = "CONFIG";
const EMBEDDINGS: &str = "EMBEDDINGS";
const EPOCHS: &str = "EPOCHS";
const INPUT: &str = "INPUT";
const OUTPUT: &str = "OUTPUT";
const TRAIN: &str = "TRAIN";

pub struct BatchApp {
    config: String,
    embeddings: Vec<String>,
    epochs: usize,
    input: String,
    output: Option<String>,
    train: bool,
}

impl BatchApp {
    fn read_embeddings(&self, options: &CorpusOptions) -> Result<Option<Embeddings>> {
        let mut embeddings: Option<Embeddings> = None;

        for path in &self.embeddings {
            let f = File::open(path).context(format!("Cannot open embeddings: {}", path))?;
            let read = Embeddings::read(BufReader::new(f), options.max_sentence_len)
                .context(format!("Cannot read embeddings: {}", path))?;
            embeddings = Some(match embeddings {
                Some(embeddings) => embeddings
                    .concat(read)
                    .context(format!("Cannot concatenate embeddings: {}", path))?,
                None => read,
            });
        }

        Ok(embeddings)
    }

    fn write_batches<W>(&self, config: &Config, corpus: &Corpus, mut write: W) -> Result<()>
    where
        W: Write,
    {
        let mut speed = SentenceSpeed::new("Batched");

        let mut batcher = Batcher::new(corpus, config.batch.shuffle, config.batch.seed)
            .max_form_len(config.corpus.max_form_len);

        for epoch in 0..self.epochs {
            while let Some(batch) = batcher.next_batch(config.batch.batch_size) {
                speed.count_sentences(batch.len());
                serde_json::to_writer(&mut write, &BatchRecord::from(&batch))
                    .context("Cannot serialize batch")?;
                writeln!(write).context("Cannot write batch")?;
            }

            batcher.epoch_finished();
            log::info!("Finished epoch {}", epoch);
        }

        write.flush().context("Cannot flush batches")
    }
}

impl UdFactorApp for BatchApp {
    fn app() -> Command {
        Command::new("batch")
            .arg_required_else_help(true)
            .about("Encode a corpus as batches")
            .arg(
                Arg::new(CONFIG)
                    .help("udfactor configuration file")
                    .index(1)
                    .required(true),
            )
            .arg(
                Arg::new(INPUT)
                    .help("Input corpus")
                    .index(2)
                    .required(true),
            )
            .arg(Arg::new(OUTPUT).help("Output batches").index(3).num_args(1))
            .arg(
                Arg::new(EMBEDDINGS)
                    .help("Contextualized embeddings (JSON lines), concatenated when repeated")
                    .long("embeddings")
                    .value_name("FILE")
                    .action(ArgAction::Append),
            )
            .arg(
                Arg::new(TRAIN)
                    .help("Truncate sentences to the maximum training sentence length")
                    .long("train")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(EPOCHS)
                    .help("Number of epochs")
                    .long("epochs")
                    .value_name("N")
                    .default_value("1"),
            )
    }

    fn parse(matches: &ArgMatches) -> Result<Self> {
        let config = matches
            .get_one::<String>(CONFIG)
            .context("No configuration file given")?
            .into();
        let embeddings = matches
            .get_many::<String>(EMBEDDINGS)
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default();
        let epochs = matches
            .get_one::<String>(EPOCHS)
            .context("No number of epochs given")?
            .parse()
            .context("Cannot parse number of epochs")?;
        let input = matches
            .get_one::<String>(INPUT)
            .context("No input corpus given")?
            .into();
        let output = matches.get_one::<String>(OUTPUT).map(ToOwned::to_owned);
        let train = matches.get_flag(TRAIN);

        Ok(BatchApp {
            config,
            embeddings,
            epochs,
            input,
            output,
            train,
        })
    }

    fn run(&self) -> Result<()> {
        let config = load_config(&self.config)?;
        let mappings = load_mappings(&config)?;

        let input_file =
            File::open(&self.input).context(format!("Cannot open corpus: {}", self.input))?;
        let read_progress = ReadProgress::new(input_file).context("Cannot create progress bar")?;
        let options = if self.train {
            config.corpus.train_options()
        } else {
            config.corpus.options()
        };
        let mut corpus = Corpus::read(BufReader::new(read_progress), &mappings, &options)
            .context(format!("Cannot read corpus: {}", self.input))?;
        log::info!("Read {} sentences", corpus.len());

        if let Some(embeddings) = self.read_embeddings(&options)? {
            log::info!("Embeddings of size {}", embeddings.dim());
            corpus = corpus
                .with_embeddings(embeddings)
                .context("Embeddings do not match the corpus")?;
        }

        let output = Output::from(self.output.as_ref());
        let writer = BufWriter::new(output.write().context("Cannot open output for writing")?);

        self.write_batches(&config, &corpus, writer)
    }
}
