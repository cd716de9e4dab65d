use std::io::Write;

use anyhow::{Context, Result};
use udfactor::annotator::Annotator;
use udfactor::dataset::{ConlluWriter, Sentence};
use udfactor::predictions::SentencePredictions;

/// Annotate and write sentences in chunks.
///
/// Sentences are buffered until `read_ahead` sentences are queued. The
/// buffered sentences are then annotated in parallel and written in
/// their original order.
pub struct SentProcessor<'a, W>
where
    W: Write,
{
    annotator: &'a Annotator<'a>,
    writer: ConlluWriter<'a, W>,
    read_ahead: usize,
    sentences: Vec<&'a Sentence>,
    predictions: Vec<SentencePredictions>,
}

impl<'a, W> SentProcessor<'a, W>
where
    W: Write,
{
    /// Construct a new sentence processor.
    ///
    /// The annotation of sentences is parallelized using Rayon. By default, the
    /// global Rayon thread pool is used.
    pub fn new(annotator: &'a Annotator<'a>, writer: ConlluWriter<'a, W>, read_ahead: usize) -> Self {
        assert!(read_ahead > 0, "Read ahead should at least be 1.");

        SentProcessor {
            annotator,
            writer,
            read_ahead,
            sentences: Vec::with_capacity(read_ahead),
            predictions: Vec::with_capacity(read_ahead),
        }
    }

    /// Queue a sentence with its predictions.
    pub fn process(
        &mut self,
        sentence: &'a Sentence,
        predictions: SentencePredictions,
    ) -> Result<()> {
        self.sentences.push(sentence);
        self.predictions.push(predictions);

        if self.sentences.len() == self.read_ahead {
            self.annotate_buffered_sentences()?;
        }

        Ok(())
    }

    fn annotate_buffered_sentences(&mut self) -> Result<()> {
        let overrides = self
            .annotator
            .annotate_batch(&self.sentences, &self.predictions)
            .context("Cannot annotate sentences")?;

        for (sentence, overrides) in self.sentences.drain(..).zip(overrides) {
            self.writer
                .write_sentence(sentence, &overrides)
                .context("Cannot write sentence")?;
        }
        self.predictions.clear();

        Ok(())
    }

    /// Annotate the remaining sentences.
    pub fn finish(mut self) -> Result<()> {
        self.annotate_buffered_sentences()
    }
}

impl<'a, W> Drop for SentProcessor<'a, W>
where
    W: Write,
{
    fn drop(&mut self) {
        if !self.sentences.is_empty() {
            if let Err(err) = self.annotate_buffered_sentences() {
                log::error!("Error annotating sentences: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use udfactor::annotator::Annotator;
    use udfactor::dataset::{ConlluWriter, Corpus, CorpusOptions};
    use udfactor::factor::Factor;
    use udfactor::predictions::SentencePredictions;
    use udfactor_encoders::dependency::TreeDecoder;

    use super::SentProcessor;

    static CORPUS: &str = "1\tZe\tze\tPRON\tVNW\t_\t2\tnsubj\t_\t_
2\tslapen\tslapen\tVERB\tWW\t_\t0\troot\t_\t_

1\tSlaap\tslapen\tVERB\tWW\t_\t0\troot\t_\t_

1\tJa\tja\tINTJ\tTSW\t_\t0\troot\t_\t_
";

    #[test]
    fn sentences_are_written_in_order() {
        let mappings = Corpus::read_train(
            Cursor::new(CORPUS),
            &[Factor::Forms, Factor::Head],
            &CorpusOptions::default(),
        )
        .unwrap()
        .1
        .freeze();
        let corpus = Corpus::read(Cursor::new(CORPUS), &mappings, &CorpusOptions::default()).unwrap();

        // Without tags and trees, sentences are written unchanged.
        let annotator = Annotator::new(TreeDecoder::new(true), vec![], false);

        let mut output = Vec::new();
        {
            let writer = ConlluWriter::new(&mut output, &mappings);
            let mut sent_proc = SentProcessor::new(&annotator, writer, 2);
            for sentence in corpus.sentences() {
                sent_proc
                    .process(sentence, SentencePredictions::new(sentence.len()))
                    .unwrap();
            }
            sent_proc.finish().unwrap();
        }

        assert_eq!(String::from_utf8(output).unwrap(), format!("{}\n", CORPUS));
    }
}
