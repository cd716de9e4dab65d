//! Disambiguation of network predictions with a morphological dictionary.
//!
//! When a dictionary is available, its analyses of a form restrict the
//! tags and lemmas that can be assigned to a token. The network scores
//! are used to choose among the analyses.

mod dictionary;
pub use dictionary::{pdt_lemma_id, Analysis, DictionaryError, LexiconDictionary, MorphoDictionary};

mod disambiguator;
pub use disambiguator::{DictTag, Disambiguation, Disambiguator, UNKNOWN_LEMMA_MARGIN};
