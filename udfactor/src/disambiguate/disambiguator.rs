use ndarray::{ArrayView1, ArrayView2};

use crate::disambiguate::MorphoDictionary;
use crate::factor::Factor;
use crate::mappings::ImmutableMappings;

/// Default margin for preferring analyses with unknown lemma rules.
///
/// An analysis whose lemma rule is not in the lemma vocabulary is only
/// scored by its tag. It is chosen over the best analysis with a known
/// rule when its tag logit is larger by more than this margin.
pub const UNKNOWN_LEMMA_MARGIN: f32 = 0.5;

/// A tag chosen by disambiguation.
#[derive(Clone, Debug, PartialEq)]
pub enum DictTag {
    /// Identifier in the tag vocabulary.
    Id(usize),

    /// A tag taken from the dictionary as-is.
    Literal(String),
}

/// The outcome of disambiguating a token.
#[derive(Clone, Debug, PartialEq)]
pub enum Disambiguation {
    /// Keep the network predictions.
    Keep,

    /// Use the tag and the full lemma of a dictionary analysis.
    Adopt { tag: DictTag, lemma: String },
}

/// An analysis that survived grouping by stripped lemma.
struct Candidate<'a> {
    stripped_lemma: &'a str,
    lemma: &'a str,
    tag_id: usize,
}

fn logit(logits: ArrayView1<f32>, id: usize) -> f32 {
    logits.get(id).copied().unwrap_or(f32::NEG_INFINITY)
}

/// Disambiguator of tags and lemmas.
///
/// Tags are disambiguated in the `XPOS` layer, lemmas are scored
/// through their lemma rules.
pub struct Disambiguator<'a> {
    dictionary: &'a dyn MorphoDictionary,
    mappings: &'a ImmutableMappings,
    margin: f32,
}

impl<'a> Disambiguator<'a> {
    pub fn new(dictionary: &'a dyn MorphoDictionary, mappings: &'a ImmutableMappings) -> Self {
        Disambiguator {
            dictionary,
            mappings,
            margin: UNKNOWN_LEMMA_MARGIN,
        }
    }

    /// Set the margin for analyses with unknown lemma rules.
    pub fn unknown_lemma_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Disambiguate the tokens of a sentence.
    ///
    /// `tag_logits` and `lemma_logits` have a row per token.
    pub fn disambiguate_sentence(
        &self,
        forms: &[String],
        tag_logits: ArrayView2<f32>,
        lemma_logits: ArrayView2<f32>,
    ) -> Vec<Disambiguation> {
        forms
            .iter()
            .zip(tag_logits.outer_iter().zip(lemma_logits.outer_iter()))
            .map(|(form, (tag_logits, lemma_logits))| {
                self.disambiguate(form, tag_logits, lemma_logits)
            })
            .collect()
    }

    /// Disambiguate a token.
    pub fn disambiguate(
        &self,
        form: &str,
        tag_logits: ArrayView1<f32>,
        lemma_logits: ArrayView1<f32>,
    ) -> Disambiguation {
        let analyses = match self.dictionary.analyze(form) {
            Ok(analyses) => analyses,
            Err(err) => {
                log::debug!("No dictionary analyses for '{}': {}", form, err);
                return Disambiguation::Keep;
            }
        };

        if analyses.len() == 1 {
            return Disambiguation::Adopt {
                tag: DictTag::Literal(analyses[0].tag.clone()),
                lemma: analyses[0].lemma.clone(),
            };
        }

        let tags = self.mappings.vocab(Factor::XPos);
        let mut candidates: Vec<Candidate> = Vec::new();
        for analysis in &analyses {
            let tag_id = match tags.get(&analysis.tag) {
                Some(tag_id) => tag_id,
                None => continue,
            };

            let stripped_lemma = self.dictionary.lemma_id(&analysis.lemma);
            match candidates
                .iter_mut()
                .find(|candidate| candidate.stripped_lemma == stripped_lemma)
            {
                Some(candidate) => {
                    if logit(tag_logits, tag_id) > logit(tag_logits, candidate.tag_id) {
                        candidate.tag_id = tag_id;
                    }
                }
                None => candidates.push(Candidate {
                    stripped_lemma,
                    lemma: &analysis.lemma,
                    tag_id,
                }),
            }
        }

        let best = match candidates.len() {
            0 => return Disambiguation::Keep,
            1 => &candidates[0],
            _ => self.best_candidate(form, &candidates, tag_logits, lemma_logits),
        };

        Disambiguation::Adopt {
            tag: DictTag::Id(best.tag_id),
            lemma: best.lemma.to_owned(),
        }
    }

    fn best_candidate<'c>(
        &self,
        form: &str,
        candidates: &'c [Candidate<'c>],
        tag_logits: ArrayView1<f32>,
        lemma_logits: ArrayView1<f32>,
    ) -> &'c Candidate<'c> {
        let encoder = self.mappings.lemma_encoder();
        let rules = self.mappings.vocab(Factor::Lemmas);

        let mut best_known: Option<(&Candidate, f32)> = None;
        let mut best_unknown: Option<&Candidate> = None;

        for candidate in candidates {
            let tag_logit = logit(tag_logits, candidate.tag_id);
            let rule = encoder.encode(form, candidate.stripped_lemma).to_string();

            match rules.get(&rule) {
                Some(rule_id) => {
                    let score = logit(lemma_logits, rule_id) + tag_logit;
                    if best_known.map(|(_, best)| score > best).unwrap_or(true) {
                        best_known = Some((candidate, score));
                    }
                }
                None => {
                    if best_unknown
                        .map(|best| tag_logit > logit(tag_logits, best.tag_id))
                        .unwrap_or(true)
                    {
                        best_unknown = Some(candidate);
                    }
                }
            }
        }

        match (best_known, best_unknown) {
            (Some((known, _)), Some(unknown))
                if logit(tag_logits, unknown.tag_id)
                    > logit(tag_logits, known.tag_id) + self.margin =>
            {
                unknown
            }
            (Some((known, _)), _) => known,
            (None, Some(unknown)) => unknown,
            (None, None) => &candidates[0],
        }
    }
}
