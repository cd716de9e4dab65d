//! Lemma rules.
//!
//! A lemma rule is a compact, reversible description of how a lemma
//! is derived from a form. Rules are independent of the form length
//! for the most common case of suffix changes, so that a small
//! inventory of rules covers the lemmas of a corpus.

use thiserror::Error;

mod encoder;
pub use self::encoder::{CopyPolicySelector, LemmaRuleEncoder};

mod rule;
pub use rule::{Case, CaseTransition, EditOp, EditScript, EditSpec, LemmaRule};

/// Lemma rule decoding error.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DecodeError {
    /// A casing transition cannot be parsed.
    #[error("invalid casing transition: '{casing:?}'")]
    InvalidCasing { casing: String },

    /// An edit script cannot be parsed.
    #[error("invalid edit script in lemma rule: '{rule:?}'")]
    InvalidScript { rule: String },

    /// The rule does not separate the casing from the edits.
    #[error("lemma rule without casing separator: '{rule:?}'")]
    MissingCasing { rule: String },

    /// The rule has an unknown edit type.
    #[error("unknown edit type in lemma rule: '{rule:?}'")]
    UnknownEdit { rule: String },
}
