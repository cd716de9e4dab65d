use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgMatches, Command};
use stdinout::{Input, Output};
use udfactor::annotator::Annotator;
use udfactor::dataset::{ConlluWriter, Corpus};
use udfactor::disambiguate::Disambiguator;
use udfactor::mappings::ImmutableMappings;
use udfactor::predictions::{PredictionRecord, SentencePredictions};
use udfactor_encoders::dependency::TreeDecoder;

use crate::io::{load_config, load_dictionary, load_mappings};
use crate::progress::SentenceSpeed;
use crate::sent_proc::SentProcessor;
use crate::traits::UdFactorApp;
use crate::util::count_lines;

const CONFIG: &str = "CONFIG";
const INPUT: &str = "INPUT";
const NUM_ANNOTATION_THREADS: &str = "NUM_ANNOTATION_THREADS";
const OUTPUT: &str = "OUTPUT";
const PREDICTIONS: &str = "PREDICTIONS";
const READ_AHEAD: &str = "READ_AHEAD";

pub struct AnnotateApp {
    config: String,
    input: Option<String>,
    num_annotation_threads: usize,
    output: Option<String>,
    predictions: String,
    read_ahead: usize,
}

impl AnnotateApp {
    fn process<R, W>(
        &self,
        annotator: &Annotator,
        mappings: &ImmutableMappings,
        corpus: &Corpus,
        predictions: R,
        write: W,
    ) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        let mut speed = SentenceSpeed::new("Annotated");

        let writer = ConlluWriter::new(write, mappings);
        let mut sent_proc = SentProcessor::new(annotator, writer, self.read_ahead);

        let mut sentences = corpus.sentences().iter();
        for (idx, line) in predictions.lines().enumerate() {
            let line = line.context("Cannot read predictions")?;
            let record: PredictionRecord = serde_json::from_str(&line)
                .context(format!("Cannot parse predictions on line {}", idx + 1))?;
            let sentence_predictions = SentencePredictions::try_from(record)
                .context(format!("Invalid predictions on line {}", idx + 1))?;

            let sentence = match sentences.next() {
                Some(sentence) => sentence,
                None => bail!("More predictions than sentences ({})", corpus.len()),
            };

            speed.count_sentences(1);

            sent_proc
                .process(sentence, sentence_predictions)
                .context("Error processing sentence")?;
        }

        if sentences.next().is_some() {
            bail!("Fewer predictions than sentences ({})", corpus.len());
        }

        sent_proc.finish()
    }
}

impl UdFactorApp for AnnotateApp {
    fn app() -> Command {
        Command::new("annotate")
            .arg_required_else_help(true)
            .about("Annotate a corpus using model predictions")
            .arg(
                Arg::new(CONFIG)
                    .help("udfactor configuration file")
                    .index(1)
                    .required(true),
            )
            .arg(
                Arg::new(PREDICTIONS)
                    .help("Predictions (JSON lines, one sentence per line)")
                    .index(2)
                    .required(true),
            )
            .arg(Arg::new(INPUT).help("Input data").index(3))
            .arg(Arg::new(OUTPUT).help("Output data").index(4).num_args(1))
            .arg(
                Arg::new(NUM_ANNOTATION_THREADS)
                    .help("Annotation threads")
                    .long("annotation-threads")
                    .value_name("N")
                    .default_value("4"),
            )
            .arg(
                Arg::new(READ_AHEAD)
                    .help("Readahead (number of sentences)")
                    .long("readahead")
                    .default_value("5000"),
            )
    }

    fn parse(matches: &ArgMatches) -> Result<Self> {
        let config = matches
            .get_one::<String>(CONFIG)
            .context("No configuration file given")?
            .into();
        let input = matches.get_one::<String>(INPUT).map(ToOwned::to_owned);
        let num_annotation_threads = matches
            .get_one::<String>(NUM_ANNOTATION_THREADS)
            .context("No number of annotation threads given")?
            .parse()
            .context("Cannot parse number of annotation threads")?;
        let output = matches.get_one::<String>(OUTPUT).map(ToOwned::to_owned);
        let predictions = matches
            .get_one::<String>(PREDICTIONS)
            .context("No predictions given")?
            .into();
        let read_ahead: usize = matches
            .get_one::<String>(READ_AHEAD)
            .context("No readahead given")?
            .parse()
            .context("Cannot parse number of sentences to read ahead")?;
        if read_ahead == 0 {
            bail!("Readahead should at least be 1");
        }

        Ok(AnnotateApp {
            config,
            input,
            num_annotation_threads,
            output,
            predictions,
            read_ahead,
        })
    }

    fn run(&self) -> Result<()> {
        // Rayon threads.
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_annotation_threads)
            .build_global()
            .context("Cannot set up annotation threads")?;

        let config = load_config(&self.config)?;
        let mappings = load_mappings(&config)?;
        let dictionary = load_dictionary(&config)?;

        let decoder = TreeDecoder::new(config.decoder.single_root);
        let mut annotator = Annotator::new(
            decoder,
            config.decoder.tags.clone(),
            config.decoder.parse,
        );
        if let (Some(dictionary), Some(dictionary_config)) = (&dictionary, &config.dictionary) {
            annotator = annotator.disambiguator(
                Disambiguator::new(dictionary, &mappings)
                    .unknown_lemma_margin(dictionary_config.unknown_lemma_margin),
            );
        }

        let input = Input::from(self.input.as_ref());
        let corpus = Corpus::read(
            input.buf_read().context("Cannot open input for reading")?,
            &mappings,
            &config.corpus.options(),
        )
        .context("Cannot read input corpus")?;

        let predictions_file = File::open(&self.predictions).context(format!(
            "Cannot open predictions: {}",
            self.predictions
        ))?;
        let n_predictions = count_lines(BufReader::new(predictions_file))
            .context("Cannot count predictions")?;
        if n_predictions != corpus.len() {
            bail!(
                "Number of predictions ({}) differs from number of sentences ({})",
                n_predictions,
                corpus.len()
            );
        }

        let predictions_file = File::open(&self.predictions).context(format!(
            "Cannot open predictions: {}",
            self.predictions
        ))?;

        let output = Output::from(self.output.as_ref());
        let writer = BufWriter::new(output.write().context("Cannot open output for writing")?);

        self.process(
            &annotator,
            &mappings,
            &corpus,
            BufReader::new(predictions_file),
            writer,
        )
    }
}
