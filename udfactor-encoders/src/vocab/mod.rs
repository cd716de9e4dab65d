//! Vocabularies and character alphabets.
//!
//! A vocabulary maps the strings of an annotation layer to dense
//! integer identifiers. Identifiers `0..=2` are reserved for padding,
//! unknown symbols, and the artificial root token.
//!
//! Growable and frozen vocabularies are different types:
//! [`MutableVocabulary`] appends unknown words, [`ImmutableVocabulary`]
//! maps them to [`UNK`]. A mutable vocabulary is turned into an
//! immutable one with [`MutableVocabulary::freeze`].

use numberer::Numberer;
use serde_derive::{Deserialize, Serialize};

mod number;
pub use number::{ImmutableNumberer, MutableNumberer, Number};

/// Identifier of the padding symbol.
pub const PAD: usize = 0;

/// Identifier of the unknown symbol.
pub const UNK: usize = 1;

/// Identifier of the artificial root token.
pub const ROOT: usize = 2;

/// Surface strings of the reserved symbols, indexed by identifier.
pub const RESERVED: [&str; 3] = ["<pad>", "<unk>", "<root>"];

/// Vocabulary of an annotation layer.
#[derive(Debug, Deserialize, Serialize)]
pub struct Vocabulary<N> {
    words: N,
}

impl<N> Vocabulary<N>
where
    N: Number<String>,
{
    /// Get the identifier of a word.
    ///
    /// A growable vocabulary adds the word if it is not known yet. A
    /// frozen vocabulary returns [`UNK`] for unknown words.
    pub fn id_of(&self, word: &str) -> usize {
        self.words.number(word.to_owned()).unwrap_or(UNK)
    }

    /// Get the identifier of a word without adding it.
    pub fn get(&self, word: &str) -> Option<usize> {
        self.words.lookup(&word.to_owned())
    }

    /// Get the word of an identifier.
    pub fn word_of(&self, id: usize) -> Option<String> {
        self.words.value(id)
    }

    /// The number of words, including the reserved symbols.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.words.len()
    }
}

pub type MutableVocabulary = Vocabulary<MutableNumberer<String>>;

pub type ImmutableVocabulary = Vocabulary<ImmutableNumberer<String>>;

impl Default for MutableVocabulary {
    fn default() -> Self {
        let vocab = Vocabulary {
            words: MutableNumberer::new(Numberer::new(0)),
        };
        for reserved in &RESERVED {
            vocab.id_of(reserved);
        }
        vocab
    }
}

impl MutableVocabulary {
    /// Construct a vocabulary that only contains the reserved symbols.
    pub fn new() -> Self {
        Default::default()
    }

    /// Freeze the vocabulary.
    pub fn freeze(self) -> ImmutableVocabulary {
        Vocabulary {
            words: self.words.into_immutable(),
        }
    }
}

/// Character alphabet, used for sub-word representations.
///
/// Identifiers `0..=2` are reserved and do not correspond to
/// characters.
#[derive(Debug, Deserialize, Serialize)]
pub struct Alphabet<N> {
    chars: N,
}

impl<N> Alphabet<N>
where
    N: Number<char>,
{
    /// Get the identifier of a character.
    ///
    /// A growable alphabet adds the character if it is not known yet.
    /// A frozen alphabet returns [`UNK`] for unknown characters.
    pub fn id_of(&self, c: char) -> usize {
        self.chars.number(c).unwrap_or(UNK)
    }

    /// Get the character of an identifier.
    pub fn char_of(&self, id: usize) -> Option<char> {
        self.chars.value(id)
    }

    /// Get the identifiers of the characters of a word.
    pub fn encode(&self, word: &str) -> Vec<usize> {
        word.chars().map(|c| self.id_of(c)).collect()
    }

    /// The alphabet size, including the reserved symbols.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.chars.len()
    }
}

pub type MutableAlphabet = Alphabet<MutableNumberer<char>>;

pub type ImmutableAlphabet = Alphabet<ImmutableNumberer<char>>;

impl Default for MutableAlphabet {
    fn default() -> Self {
        Alphabet {
            chars: MutableNumberer::new(Numberer::new(RESERVED.len())),
        }
    }
}

impl MutableAlphabet {
    /// Construct an empty alphabet.
    pub fn new() -> Self {
        Default::default()
    }

    /// Freeze the alphabet.
    pub fn freeze(self) -> ImmutableAlphabet {
        Alphabet {
            chars: self.chars.into_immutable(),
        }
    }
}
