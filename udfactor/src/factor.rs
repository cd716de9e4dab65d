//! Annotation layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UdFactorError;

/// An annotation layer of a sentence.
///
/// Factors correspond to the CoNLL-U columns after the token index,
/// in column order.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Factor {
    Forms,
    Lemmas,
    UPos,
    XPos,
    Feats,
    Head,
    DepRel,
    Deps,
    Misc,
}

impl Factor {
    /// All factors in column order.
    pub const ALL: [Factor; 9] = [
        Factor::Forms,
        Factor::Lemmas,
        Factor::UPos,
        Factor::XPos,
        Factor::Feats,
        Factor::Head,
        Factor::DepRel,
        Factor::Deps,
        Factor::Misc,
    ];

    /// The number of factors.
    pub const COUNT: usize = 9;

    /// The position of the factor among the annotation columns.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The CoNLL-U column name.
    pub fn name(self) -> &'static str {
        use Factor::*;

        match self {
            Forms => "FORMS",
            Lemmas => "LEMMAS",
            UPos => "UPOS",
            XPos => "XPOS",
            Feats => "FEATS",
            Head => "HEAD",
            DepRel => "DEPREL",
            Deps => "DEPS",
            Misc => "MISC",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Factor {
    type Err = UdFactorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Factor::ALL
            .iter()
            .copied()
            .find(|factor| factor.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UdFactorError::IllegalConfigurationError(format!("Unknown factor: {}", s)))
    }
}

/// How a factor is represented.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FactorConfig {
    /// Prepend the artificial root token to every sentence.
    pub with_root: bool,

    /// Build character sequences of the factor values.
    pub characters: bool,
}

impl FactorConfig {
    /// Get the default representation of a factor.
    ///
    /// Only forms have character sequences.
    pub fn new(factor: Factor, with_root: bool) -> Self {
        FactorConfig {
            with_root,
            characters: factor == Factor::Forms,
        }
    }

    /// The number of positions taken by the root token (0 or 1).
    pub fn root_offset(&self) -> usize {
        self.with_root as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{Factor, FactorConfig};

    #[test]
    fn factors_are_in_column_order() {
        for (idx, factor) in Factor::ALL.iter().enumerate() {
            assert_eq!(factor.index(), idx);
        }
        assert_eq!(Factor::COUNT, Factor::ALL.len());
    }

    #[test]
    fn factor_names_roundtrip() {
        for factor in &Factor::ALL {
            assert_eq!(factor.to_string().parse::<Factor>().unwrap(), *factor);
        }
        assert_eq!("xpos".parse::<Factor>().unwrap(), Factor::XPos);
        assert!("lemma".parse::<Factor>().is_err());
    }

    #[test]
    fn only_forms_have_characters() {
        assert!(FactorConfig::new(Factor::Forms, true).characters);
        assert!(!FactorConfig::new(Factor::Lemmas, true).characters);
        assert_eq!(FactorConfig::new(Factor::Head, true).root_offset(), 1);
        assert_eq!(FactorConfig::new(Factor::Head, false).root_offset(), 0);
    }
}
