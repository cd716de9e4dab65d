//! Vocabularies of all factors.
//!
//! The mappings of a corpus are built once while reading the training
//! data, frozen, and then stored. Other corpora are read against the
//! frozen mappings.

use numberer::Numberer;
use serde::{Deserialize, Serialize};
use udfactor_encoders::lemma::LemmaRuleEncoder;
use udfactor_encoders::vocab::{
    Alphabet, ImmutableNumberer, MutableAlphabet, MutableNumberer, MutableVocabulary, Number,
    Vocabulary,
};

use crate::factor::{Factor, FactorConfig};

/// Vocabulary and alphabet of a factor.
#[derive(Debug, Deserialize, Serialize)]
pub struct FactorMappings<W, C> {
    config: FactorConfig,
    vocab: Vocabulary<W>,
    alphabet: Option<Alphabet<C>>,
}

impl<W, C> FactorMappings<W, C> {
    pub fn config(&self) -> FactorConfig {
        self.config
    }

    pub fn vocab(&self) -> &Vocabulary<W> {
        &self.vocab
    }

    /// The alphabet, only present for factors with characters.
    pub fn alphabet(&self) -> Option<&Alphabet<C>> {
        self.alphabet.as_ref()
    }
}

/// Mappings of all factors.
#[derive(Debug, Deserialize, Serialize)]
pub struct Mappings<W, C> {
    factors: Vec<FactorMappings<W, C>>,
    lemma_encoder: LemmaRuleEncoder,
    variants: W,
}

impl<W, C> Mappings<W, C>
where
    W: Number<String>,
    C: Number<char>,
{
    /// Get the mappings of a factor.
    pub fn factor(&self, factor: Factor) -> &FactorMappings<W, C> {
        &self.factors[factor.index()]
    }

    pub fn config(&self, factor: Factor) -> FactorConfig {
        self.factors[factor.index()].config
    }

    pub fn vocab(&self, factor: Factor) -> &Vocabulary<W> {
        &self.factors[factor.index()].vocab
    }

    pub fn alphabet(&self, factor: Factor) -> Option<&Alphabet<C>> {
        self.factors[factor.index()].alphabet.as_ref()
    }

    /// The lemma rule encoder of the corpus.
    pub fn lemma_encoder(&self) -> LemmaRuleEncoder {
        self.lemma_encoder
    }

    /// Get the identifier of a document variant.
    ///
    /// Unknown variants of frozen mappings get identifier 0.
    pub fn variant_id(&self, variant: &str) -> usize {
        self.variants.number(variant.to_owned()).unwrap_or(0)
    }

    /// Get the variant of an identifier.
    pub fn variant(&self, id: usize) -> Option<String> {
        self.variants.value(id)
    }

    /// The number of known document variants.
    pub fn n_variants(&self) -> usize {
        self.variants.len()
    }
}

pub type MutableMappings = Mappings<MutableNumberer<String>, MutableNumberer<char>>;

pub type ImmutableMappings = Mappings<ImmutableNumberer<String>, ImmutableNumberer<char>>;

impl MutableMappings {
    /// Construct empty mappings.
    ///
    /// The root token is prepended to the factors in `root_factors`.
    pub fn new(root_factors: &[Factor]) -> Self {
        let factors = Factor::ALL
            .iter()
            .map(|&factor| {
                let config = FactorConfig::new(factor, root_factors.contains(&factor));
                FactorMappings {
                    config,
                    vocab: MutableVocabulary::new(),
                    alphabet: if config.characters {
                        Some(MutableAlphabet::new())
                    } else {
                        None
                    },
                }
            })
            .collect();

        Mappings {
            factors,
            lemma_encoder: LemmaRuleEncoder::new(false),
            variants: MutableNumberer::new(Numberer::new(0)),
        }
    }

    pub(crate) fn set_lemma_encoder(&mut self, lemma_encoder: LemmaRuleEncoder) {
        self.lemma_encoder = lemma_encoder;
    }

    /// Freeze the mappings.
    pub fn freeze(self) -> ImmutableMappings {
        Mappings {
            factors: self
                .factors
                .into_iter()
                .map(|factor| FactorMappings {
                    config: factor.config,
                    vocab: factor.vocab.freeze(),
                    alphabet: factor.alphabet.map(MutableAlphabet::freeze),
                })
                .collect(),
            lemma_encoder: self.lemma_encoder,
            variants: self.variants.into_immutable(),
        }
    }
}

impl ImmutableMappings {
    /// Log the sizes of the vocabularies.
    pub fn log_sizes(&self) {
        for factor in &Factor::ALL {
            let mappings = self.factor(*factor);
            match mappings.alphabet() {
                Some(alphabet) => log::info!(
                    "{}: {} values, {} characters",
                    factor,
                    mappings.vocab().len(),
                    alphabet.len()
                ),
                None => log::info!("{}: {} values", factor, mappings.vocab().len()),
            }
        }
        log::info!(
            "{} document variants, lemma rules {} copying",
            self.n_variants(),
            if self.lemma_encoder.allow_copy() {
                "with"
            } else {
                "without"
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use udfactor_encoders::vocab::{ROOT, UNK};

    use super::{ImmutableMappings, MutableMappings};
    use crate::factor::Factor;

    #[test]
    fn root_factors_are_configured() {
        let mappings = MutableMappings::new(&[Factor::Forms, Factor::Head]);
        assert!(mappings.config(Factor::Forms).with_root);
        assert!(mappings.config(Factor::Head).with_root);
        assert!(!mappings.config(Factor::Lemmas).with_root);
        assert!(mappings.alphabet(Factor::Forms).is_some());
        assert!(mappings.alphabet(Factor::XPos).is_none());
    }

    #[test]
    fn frozen_lookups_match_training_ids() {
        let mappings = MutableMappings::new(&[Factor::Forms]);
        let kat = mappings.vocab(Factor::Forms).id_of("kat");
        let noun = mappings.vocab(Factor::UPos).id_of("NOUN");
        assert_eq!(mappings.variant_id(""), 0);
        assert_eq!(mappings.variant_id("news"), 1);

        let mappings = mappings.freeze();
        assert_eq!(mappings.vocab(Factor::Forms).id_of("kat"), kat);
        assert_eq!(mappings.vocab(Factor::UPos).id_of("NOUN"), noun);
        assert_eq!(mappings.vocab(Factor::UPos).id_of("VERB"), UNK);
        assert_eq!(mappings.variant_id("news"), 1);
        assert_eq!(mappings.variant_id("wiki"), 0);
        assert_eq!(mappings.n_variants(), 2);
    }

    #[test]
    fn mappings_survive_serialization() {
        let mappings = MutableMappings::new(&[Factor::Forms]);
        mappings.vocab(Factor::Lemmas).id_of("↓0;d¦-");
        mappings
            .alphabet(Factor::Forms)
            .unwrap()
            .encode("ziet");
        let mappings = mappings.freeze();

        let json = serde_json::to_string(&mappings).unwrap();
        let restored: ImmutableMappings = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.vocab(Factor::Lemmas).get("↓0;d¦-"), Some(3));
        assert_eq!(restored.vocab(Factor::Forms).word_of(ROOT), Some("<root>".to_string()));
        assert_eq!(restored.alphabet(Factor::Forms).unwrap().encode("tien"), vec![6, 4, 5, UNK]);
        assert_eq!(restored.config(Factor::Forms), mappings.config(Factor::Forms));
    }
}
