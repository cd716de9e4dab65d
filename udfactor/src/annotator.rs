//! Annotation of sentences with network predictions.

use ndarray::ArrayView1;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use udfactor_encoders::dependency::TreeDecoder;

use crate::dataset::{Override, Overrides, Sentence};
use crate::disambiguate::{DictTag, Disambiguation, Disambiguator};
use crate::factor::Factor;
use crate::predictions::{PredictionError, SentencePredictions};

/// Get the index of the highest logit, the first one on ties.
fn argmax(logits: ArrayView1<f32>) -> usize {
    logits
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|&(_, &logit)| OrderedFloat(logit))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Annotator.
///
/// The annotator turns the network predictions of a sentence into
/// overrides for writing the sentence.
pub struct Annotator<'a> {
    decoder: TreeDecoder,
    tags: Vec<Factor>,
    parse: bool,
    disambiguator: Option<Disambiguator<'a>>,
}

impl<'a> Annotator<'a> {
    /// Construct an annotator.
    ///
    /// The annotator assigns the factors in `tags` and decodes trees
    /// when `parse` is set.
    pub fn new(decoder: TreeDecoder, tags: Vec<Factor>, parse: bool) -> Self {
        Annotator {
            decoder,
            tags,
            parse,
            disambiguator: None,
        }
    }

    /// Disambiguate tags and lemmas with a dictionary.
    ///
    /// Disambiguation is only done when both `XPOS` and `LEMMAS` are
    /// predicted.
    pub fn disambiguator(mut self, disambiguator: Disambiguator<'a>) -> Self {
        self.disambiguator = Some(disambiguator);
        self
    }

    /// Get the overrides of a sentence.
    pub fn overrides(
        &self,
        sentence: &Sentence,
        predictions: &SentencePredictions,
    ) -> Result<Overrides, PredictionError> {
        if predictions.len() != sentence.len() {
            return Err(PredictionError::TokenCount {
                predicted: predictions.len(),
                tokens: sentence.len(),
            });
        }

        let mut overrides = Overrides::new();

        for &factor in &self.tags {
            let logits = predictions
                .tag_logits(factor)
                .ok_or(PredictionError::MissingTag { factor })?;
            overrides.set(
                factor,
                logits
                    .outer_iter()
                    .map(|token_logits| Override::Id(argmax(token_logits)))
                    .collect(),
            );
        }

        if let Some(disambiguator) = &self.disambiguator {
            self.disambiguate(disambiguator, sentence, predictions, &mut overrides);
        }

        if self.parse {
            let scores = predictions
                .head_scores()
                .ok_or(PredictionError::MissingHeads)?;
            let tree = self.decoder.decode(scores);

            if let Some(deprels) = predictions.deprels() {
                overrides.set(
                    Factor::DepRel,
                    tree.heads()
                        .iter()
                        .enumerate()
                        .map(|(idx, &head)| Override::Id(deprels[[idx + 1, head]]))
                        .collect(),
                );
            }

            overrides.set(
                Factor::Head,
                tree.heads()
                    .iter()
                    .map(|&head| Override::Head(Some(head)))
                    .collect(),
            );
        }

        Ok(overrides)
    }

    fn disambiguate(
        &self,
        disambiguator: &Disambiguator,
        sentence: &Sentence,
        predictions: &SentencePredictions,
        overrides: &mut Overrides,
    ) {
        if overrides.get(Factor::XPos).is_none() || overrides.get(Factor::Lemmas).is_none() {
            return;
        }

        let (tag_logits, lemma_logits) = match (
            predictions.tag_logits(Factor::XPos),
            predictions.tag_logits(Factor::Lemmas),
        ) {
            (Some(tag_logits), Some(lemma_logits)) => (tag_logits, lemma_logits),
            _ => return,
        };

        let disambiguations = disambiguator.disambiguate_sentence(
            sentence.values(Factor::Forms),
            tag_logits,
            lemma_logits,
        );

        for (token, disambiguation) in disambiguations.into_iter().enumerate() {
            if let Disambiguation::Adopt { tag, lemma } = disambiguation {
                if let Some(tags) = overrides.get_mut(Factor::XPos) {
                    tags[token] = match tag {
                        DictTag::Id(id) => Override::Id(id),
                        DictTag::Literal(tag) => Override::Literal(tag),
                    };
                }
                if let Some(lemmas) = overrides.get_mut(Factor::Lemmas) {
                    lemmas[token] = Override::Literal(lemma);
                }
            }
        }
    }

    /// Get the overrides of a batch of sentences in parallel.
    pub fn annotate_batch(
        &self,
        sentences: &[&Sentence],
        predictions: &[SentencePredictions],
    ) -> Result<Vec<Overrides>, PredictionError> {
        if sentences.len() != predictions.len() {
            return Err(PredictionError::TokenCount {
                predicted: predictions.len(),
                tokens: sentences.len(),
            });
        }

        sentences
            .par_iter()
            .zip(predictions.par_iter())
            .map(|(sentence, predictions)| self.overrides(sentence, predictions))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use ndarray::{arr1, arr2, Array2};
    use udfactor_encoders::dependency::TreeDecoder;

    use super::{argmax, Annotator};
    use crate::dataset::{ConlluWriter, Corpus, CorpusOptions, Override};
    use crate::disambiguate::{Disambiguator, LexiconDictionary};
    use crate::factor::Factor;
    use crate::mappings::ImmutableMappings;
    use crate::predictions::{PredictionError, SentencePredictions};

    static TRAIN: &str = "1\tHonden\thond\tNOUN\tN\t_\t2\tnsubj\t_\t_
2\tblaffen\tblaffen\tVERB\tWW\t_\t0\troot\t_\t_
3\tluid\tluid\tADJ\tADJ\t_\t2\tadvmod\t_\t_
";

    static INPUT: &str = "# text = Honden blaffen luid
1\tHonden\t_\t_\t_\t_\t_\t_\t_\t_
2\tblaffen\t_\t_\t_\t_\t_\t_\t_\t_
3\tluid\t_\t_\t_\t_\t_\t_\t_\t_
";

    fn mappings() -> ImmutableMappings {
        Corpus::read_train(
            Cursor::new(TRAIN),
            &[Factor::Forms, Factor::Head],
            &CorpusOptions::default(),
        )
        .unwrap()
        .1
        .freeze()
    }

    fn one_hot(mappings: &ImmutableMappings, factor: Factor, values: &[&str]) -> Array2<f32> {
        let vocab = mappings.vocab(factor);
        let mut logits = Array2::zeros((values.len(), vocab.len()));
        for (token, value) in values.iter().enumerate() {
            logits[[token, vocab.get(value).unwrap()]] = 1.;
        }
        logits
    }

    fn predictions(mappings: &ImmutableMappings) -> SentencePredictions {
        let mut predictions = SentencePredictions::new(3);
        predictions
            .set_tag_logits(
                Factor::UPos,
                one_hot(mappings, Factor::UPos, &["NOUN", "VERB", "ADJ"]),
            )
            .unwrap();

        let encoder = mappings.lemma_encoder();
        let rules = [
            encoder.encode("Honden", "hond").to_string(),
            encoder.encode("blaffen", "blaffen").to_string(),
            encoder.encode("luid", "luid").to_string(),
        ];
        let rules = rules.iter().map(String::as_str).collect::<Vec<_>>();
        predictions
            .set_tag_logits(Factor::Lemmas, one_hot(mappings, Factor::Lemmas, &rules))
            .unwrap();

        predictions
            .set_head_scores(arr2(&[
                [0., 0., 0., 0.],
                [0., 0., 5., 0.],
                [5., 0., 0., 1.],
                [1., 1., 5., 0.],
            ]))
            .unwrap();

        let deprels = mappings.vocab(Factor::DepRel);
        let (nsubj, root, advmod) = (
            deprels.get("nsubj").unwrap(),
            deprels.get("root").unwrap(),
            deprels.get("advmod").unwrap(),
        );
        let mut relations = Array2::zeros((4, 4));
        relations[[1, 2]] = nsubj;
        relations[[2, 0]] = root;
        relations[[3, 2]] = advmod;
        predictions.set_deprels(relations).unwrap();

        predictions
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(arr1(&[0., 2., 1., 2.]).view()), 1);
        assert_eq!(argmax(arr1(&[-1.]).view()), 0);
    }

    #[test]
    fn sentences_are_annotated() {
        let mappings = mappings();
        let corpus = Corpus::read(Cursor::new(INPUT), &mappings, &CorpusOptions::default()).unwrap();
        let annotator = Annotator::new(
            TreeDecoder::new(true),
            vec![Factor::UPos, Factor::Lemmas],
            true,
        );

        let overrides = annotator
            .overrides(&corpus.sentences()[0], &predictions(&mappings))
            .unwrap();
        assert_eq!(
            overrides.get(Factor::Head).unwrap(),
            &[
                Override::Head(Some(2)),
                Override::Head(Some(0)),
                Override::Head(Some(2))
            ]
        );

        let mut writer = ConlluWriter::new(Vec::new(), &mappings);
        writer
            .write_sentence(&corpus.sentences()[0], &overrides)
            .unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "# text = Honden blaffen luid
1\tHonden\thond\tNOUN\t_\t_\t2\tnsubj\t_\t_
2\tblaffen\tblaffen\tVERB\t_\t_\t0\troot\t_\t_
3\tluid\tluid\tADJ\t_\t_\t2\tadvmod\t_\t_

"
        );
    }

    #[test]
    fn dictionary_analyses_are_adopted() {
        let mappings = mappings();
        let corpus = Corpus::read(Cursor::new(INPUT), &mappings, &CorpusOptions::default()).unwrap();
        let dictionary =
            LexiconDictionary::from_read(Cursor::new("luid\tluid-1\tADJ\n")).unwrap();

        let mut predictions = predictions(&mappings);
        predictions
            .set_tag_logits(
                Factor::XPos,
                one_hot(&mappings, Factor::XPos, &["N", "WW", "WW"]),
            )
            .unwrap();

        let annotator = Annotator::new(
            TreeDecoder::new(true),
            vec![Factor::XPos, Factor::Lemmas],
            false,
        )
        .disambiguator(Disambiguator::new(&dictionary, &mappings));

        let overrides = annotator
            .overrides(&corpus.sentences()[0], &predictions)
            .unwrap();
        let ww = mappings.vocab(Factor::XPos).get("WW").unwrap();
        assert_eq!(
            overrides.get(Factor::XPos).unwrap()[1..],
            [Override::Id(ww), Override::Literal("ADJ".to_string())]
        );
        assert_eq!(
            overrides.get(Factor::Lemmas).unwrap()[2],
            Override::Literal("luid-1".to_string())
        );
        assert!(overrides.get(Factor::Head).is_none());
    }

    #[test]
    fn batches_are_annotated_in_parallel() {
        let mappings = mappings();
        let corpus = Corpus::read(
            Cursor::new([INPUT, INPUT].join("\n")),
            &mappings,
            &CorpusOptions::default(),
        )
        .unwrap();
        let annotator = Annotator::new(TreeDecoder::new(true), vec![Factor::UPos], true);

        let sentences = corpus.sentences().iter().collect::<Vec<_>>();
        let predictions = vec![predictions(&mappings), predictions(&mappings)];
        let overrides = annotator.annotate_batch(&sentences, &predictions).unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[0], overrides[1]);

        assert!(matches!(
            annotator.annotate_batch(&sentences, &predictions[..1]),
            Err(PredictionError::TokenCount { .. })
        ));
    }

    #[test]
    fn mismatched_predictions_are_rejected() {
        let mappings = mappings();
        let corpus = Corpus::read(Cursor::new(INPUT), &mappings, &CorpusOptions::default()).unwrap();

        let annotator = Annotator::new(TreeDecoder::new(true), vec![Factor::Feats], false);
        assert!(matches!(
            annotator.overrides(&corpus.sentences()[0], &predictions(&mappings)),
            Err(PredictionError::MissingTag {
                factor: Factor::Feats
            })
        ));

        let annotator = Annotator::new(TreeDecoder::new(true), vec![], true);
        assert!(matches!(
            annotator.overrides(&corpus.sentences()[0], &SentencePredictions::new(2)),
            Err(PredictionError::TokenCount {
                predicted: 2,
                tokens: 3
            })
        ));
        assert!(matches!(
            annotator.overrides(&corpus.sentences()[0], &SentencePredictions::new(3)),
            Err(PredictionError::MissingHeads)
        ));
    }
}
