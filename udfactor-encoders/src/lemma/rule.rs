use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::lemma::DecodeError;

const UPPER: char = '↑';
const LOWER: char = '↓';
const SEPARATOR: char = '¦';
const COPY: char = '→';
const DELETE: char = '-';
const INSERT: char = '+';

/// Letter case.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Case {
    Lower,
    Upper,
}

impl Case {
    fn of(c: char) -> Self {
        if c.to_lowercase().eq(std::iter::once(c)) {
            Case::Lower
        } else {
            Case::Upper
        }
    }

    fn marker(self) -> char {
        match self {
            Case::Lower => LOWER,
            Case::Upper => UPPER,
        }
    }
}

/// A change of letter case within a lemma.
///
/// The offset is counted from the start of the lemma when it is
/// non-negative and from the end of the lemma otherwise.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CaseTransition {
    pub case: Case,
    pub offset: isize,
}

impl CaseTransition {
    pub fn new(case: Case, offset: isize) -> Self {
        CaseTransition { case, offset }
    }

    /// Compute the case transitions of a lemma.
    ///
    /// Transitions in the first half of the lemma are expressed as
    /// offsets from the start, the others as offsets from the end.
    pub fn of_lemma(lemma: &str) -> Vec<CaseTransition> {
        let len = lemma.chars().count();

        let mut transitions = Vec::new();
        let mut previous = None;
        for (idx, c) in lemma.chars().enumerate() {
            let case = Case::of(c);
            if previous != Some(case) {
                let offset = if idx <= len / 2 {
                    idx as isize
                } else {
                    idx as isize - len as isize
                };
                transitions.push(CaseTransition::new(case, offset));
            }
            previous = Some(case);
        }

        transitions
    }

    /// Re-case the lemma suffix starting at this transition.
    pub fn apply(&self, lemma: &str) -> String {
        let len = lemma.chars().count() as isize;
        let split = if self.offset >= 0 {
            self.offset.min(len)
        } else {
            (len + self.offset).max(0)
        } as usize;

        let split_byte = lemma
            .char_indices()
            .nth(split)
            .map(|(idx, _)| idx)
            .unwrap_or_else(|| lemma.len());
        let (prefix, suffix) = lemma.split_at(split_byte);

        match self.case {
            Case::Lower => format!("{}{}", prefix, suffix.to_lowercase()),
            Case::Upper => format!("{}{}", prefix, suffix.to_uppercase()),
        }
    }

    /// Lemmas are lower-cased before casing is applied, so a
    /// lower-case transition at the start is a no-op.
    fn is_initial_lowercase(&self) -> bool {
        self.case == Case::Lower && self.offset == 0
    }
}

impl fmt::Display for CaseTransition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.case.marker(), self.offset)
    }
}

impl FromStr for CaseTransition {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let case = match chars.next() {
            Some(UPPER) => Case::Upper,
            Some(LOWER) => Case::Lower,
            _ => {
                return Err(DecodeError::InvalidCasing {
                    casing: s.to_owned(),
                })
            }
        };

        let offset = chars
            .as_str()
            .parse()
            .map_err(|_| DecodeError::InvalidCasing {
                casing: s.to_owned(),
            })?;

        Ok(CaseTransition::new(case, offset))
    }
}

/// Edit operation of an edit script.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EditOp {
    /// Copy a source character.
    Copy,

    /// Skip a source character.
    Delete,

    /// Emit a character.
    Insert(char),
}

/// Script that rewrites a source string into a target string.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct EditScript(pub Vec<EditOp>);

impl EditScript {
    /// The number of source characters consumed by the script.
    pub fn source_len(&self) -> usize {
        self.0
            .iter()
            .filter(|op| matches!(op, EditOp::Copy | EditOp::Delete))
            .count()
    }

    /// Replay the script on `source`, starting at `offset`.
    ///
    /// Returns `None` when the script reads outside `source`.
    pub(crate) fn replay(
        &self,
        source: &[char],
        mut offset: usize,
        target: &mut Vec<char>,
    ) -> Option<()> {
        for op in &self.0 {
            match op {
                EditOp::Copy => {
                    target.push(*source.get(offset)?);
                    offset += 1;
                }
                EditOp::Delete => offset += 1,
                EditOp::Insert(c) => target.push(*c),
            }
        }

        Some(())
    }

    /// Parse a script from the front of `chars`.
    ///
    /// Parsing stops after a separator or at the end of input. The
    /// returned flag is `true` when a separator was consumed.
    fn parse(chars: &mut std::str::Chars, rule: &str) -> Result<(Self, bool), DecodeError> {
        let mut ops = Vec::new();
        while let Some(c) = chars.next() {
            match c {
                COPY => ops.push(EditOp::Copy),
                DELETE => ops.push(EditOp::Delete),
                INSERT => match chars.next() {
                    Some(c) => ops.push(EditOp::Insert(c)),
                    None => {
                        return Err(DecodeError::InvalidScript {
                            rule: rule.to_owned(),
                        })
                    }
                },
                SEPARATOR => return Ok((EditScript(ops), true)),
                _ => {
                    return Err(DecodeError::InvalidScript {
                        rule: rule.to_owned(),
                    })
                }
            }
        }

        Ok((EditScript(ops), false))
    }
}

impl fmt::Display for EditScript {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for op in &self.0 {
            match op {
                EditOp::Copy => write!(f, "{}", COPY)?,
                EditOp::Delete => write!(f, "{}", DELETE)?,
                EditOp::Insert(c) => write!(f, "{}{}", INSERT, c)?,
            }
        }

        Ok(())
    }
}

/// How the lower-cased lemma is obtained from the lower-cased form.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum EditSpec {
    /// The lemma is stored literally.
    Absolute(String),

    /// The lemma is the form with its prefix and suffix around the
    /// longest common substring rewritten.
    Diff { prefix: EditScript, suffix: EditScript },
}

/// Lemma rule.
///
/// A lemma rule describes how to derive a lemma from a form. Its
/// textual representation is `casing;edit`, for example `↓0;d¦-`
/// rewrites *dogs* into *dog*.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LemmaRule {
    pub casing: Vec<CaseTransition>,
    pub edit: EditSpec,
}

impl LemmaRule {
    /// Apply the rule to a form.
    ///
    /// If the edit scripts do not fit the form, the lower-cased form
    /// is used in place of the rewritten lemma. The casing of the rule
    /// is applied in either case.
    pub fn apply(&self, form: &str) -> String {
        let mut lemma = match &self.edit {
            EditSpec::Absolute(lemma) => lemma.clone(),
            EditSpec::Diff { prefix, suffix } => {
                let form = form.to_lowercase();
                let form_chars = form.chars().collect::<Vec<_>>();
                match Self::replay(&form_chars, prefix, suffix) {
                    Some(lemma) => lemma.into_iter().collect(),
                    None => form,
                }
            }
        };

        for transition in &self.casing {
            if transition.is_initial_lowercase() {
                continue;
            }
            lemma = transition.apply(&lemma);
        }

        lemma
    }

    fn replay(form: &[char], prefix: &EditScript, suffix: &EditScript) -> Option<Vec<char>> {
        let prefix_len = prefix.source_len();
        let suffix_start = form.len().checked_sub(suffix.source_len())?;

        let mut lemma = Vec::with_capacity(form.len());
        prefix.replay(form, 0, &mut lemma)?;
        if prefix_len < suffix_start {
            lemma.extend_from_slice(&form[prefix_len..suffix_start]);
        }
        suffix.replay(form, suffix_start, &mut lemma)?;

        Some(lemma)
    }
}

impl fmt::Display for LemmaRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.casing.iter().join(&SEPARATOR.to_string()))?;

        match &self.edit {
            EditSpec::Absolute(lemma) => write!(f, ";a{}", lemma),
            EditSpec::Diff { prefix, suffix } => {
                write!(f, ";d{}{}{}", prefix, SEPARATOR, suffix)
            }
        }
    }
}

impl FromStr for LemmaRule {
    type Err = DecodeError;

    fn from_str(rule: &str) -> Result<Self, Self::Err> {
        let (casing, edit) = rule
            .split_once(';')
            .ok_or_else(|| DecodeError::MissingCasing {
                rule: rule.to_owned(),
            })?;

        // Empty lemmas have an empty casing specification.
        let casing = casing
            .split(SEPARATOR)
            .filter(|transition| !transition.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let mut chars = edit.chars();
        let edit = match chars.next() {
            Some('a') => EditSpec::Absolute(chars.as_str().to_owned()),
            Some('d') => {
                let (prefix, separated) = EditScript::parse(&mut chars, rule)?;
                let (suffix, trailing) = EditScript::parse(&mut chars, rule)?;
                if !separated || trailing {
                    return Err(DecodeError::InvalidScript {
                        rule: rule.to_owned(),
                    });
                }
                EditSpec::Diff { prefix, suffix }
            }
            _ => {
                return Err(DecodeError::UnknownEdit {
                    rule: rule.to_owned(),
                })
            }
        };

        Ok(LemmaRule { casing, edit })
    }
}
