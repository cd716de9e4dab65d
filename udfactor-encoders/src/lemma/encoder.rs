use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::lemma::{CaseTransition, DecodeError, EditOp, EditScript, EditSpec, LemmaRule};

/// Lemma rule encoder.
///
/// The encoder rewrites a (form, lemma) pair into a [`LemmaRule`] and
/// decodes rules back into lemmas. `allow_copy` determines whether the
/// edit scripts may copy characters from the form. It should be chosen
/// once per corpus, see [`CopyPolicySelector`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LemmaRuleEncoder {
    allow_copy: bool,
}

impl LemmaRuleEncoder {
    pub fn new(allow_copy: bool) -> Self {
        LemmaRuleEncoder { allow_copy }
    }

    pub fn allow_copy(&self) -> bool {
        self.allow_copy
    }

    /// Encode the rule that rewrites `form` into `lemma`.
    pub fn encode(&self, form: &str, lemma: &str) -> LemmaRule {
        let form = form.to_lowercase().chars().collect::<Vec<_>>();
        let casing = CaseTransition::of_lemma(lemma);
        let lemma = lemma.to_lowercase().chars().collect::<Vec<_>>();

        let (len, form_start, lemma_start) = longest_common_substring(&form, &lemma);

        let edit = if len == 0 {
            EditSpec::Absolute(lemma.into_iter().collect())
        } else {
            EditSpec::Diff {
                prefix: min_edit_script(
                    &form[..form_start],
                    &lemma[..lemma_start],
                    self.allow_copy,
                ),
                suffix: min_edit_script(
                    &form[form_start + len..],
                    &lemma[lemma_start + len..],
                    self.allow_copy,
                ),
            }
        };

        LemmaRule { casing, edit }
    }

    /// Decode the lemma of `form` from a textual lemma rule.
    ///
    /// Rules that do not fit the form are not an error, see
    /// [`LemmaRule::apply`]. An error is only returned when the rule
    /// cannot be parsed.
    pub fn decode(&self, form: &str, rule: &str) -> Result<String, DecodeError> {
        let rule = rule.parse::<LemmaRule>()?;
        Ok(rule.apply(form))
    }
}

/// Find the longest common substring of two strings.
///
/// Returns the length and the start offsets in `form` and `lemma`.
/// Among substrings of equal length, the one that starts earliest in
/// the lemma wins, then the one that starts earliest in the form.
fn longest_common_substring(form: &[char], lemma: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);

    for lemma_start in 0..lemma.len() {
        for form_start in 0..form.len() {
            let len = form[form_start..]
                .iter()
                .zip(&lemma[lemma_start..])
                .take_while(|(f, l)| f == l)
                .count();
            if len > best.0 {
                best = (len, form_start, lemma_start);
            }
        }
    }

    best
}

/// Compute a minimum edit script that rewrites `source` into `target`.
///
/// Deletions and insertions cost 1. Copies are free and preferred,
/// but only considered when `allow_copy` is set.
fn min_edit_script(source: &[char], target: &[char], allow_copy: bool) -> EditScript {
    let worst = source.len() + target.len() + 1;
    let mut table = vec![vec![(worst, None); target.len() + 1]; source.len() + 1];
    table[0][0] = (0, None);

    for i in 0..=source.len() {
        for j in 0..=target.len() {
            if i == 0 && j == 0 {
                continue;
            }

            let mut cell: (usize, Option<EditOp>) = (worst, None);
            if allow_copy && i > 0 && j > 0 && source[i - 1] == target[j - 1] {
                let (cost, _) = table[i - 1][j - 1];
                if cost < cell.0 {
                    cell = (cost, Some(EditOp::Copy));
                }
            }
            if i > 0 && table[i - 1][j].0 < cell.0 {
                cell = (table[i - 1][j].0 + 1, Some(EditOp::Delete));
            }
            if j > 0 && table[i][j - 1].0 < cell.0 {
                cell = (table[i][j - 1].0 + 1, Some(EditOp::Insert(target[j - 1])));
            }

            table[i][j] = cell;
        }
    }

    let (mut i, mut j) = (source.len(), target.len());
    let mut ops = Vec::new();
    while let (_, Some(op)) = table[i][j] {
        match op {
            EditOp::Copy => {
                i -= 1;
                j -= 1;
            }
            EditOp::Delete => i -= 1,
            EditOp::Insert(_) => j -= 1,
        }
        ops.push(op);
    }
    ops.reverse();

    EditScript(ops)
}

/// Choose whether lemma rules should copy characters.
///
/// Rules are collected with and without copying for every training
/// pair. Copying is enabled when it results in fewer distinct rules.
#[derive(Debug, Default)]
pub struct CopyPolicySelector {
    with_copy: HashSet<String>,
    without_copy: HashSet<String>,
}

impl CopyPolicySelector {
    pub fn new() -> Self {
        Default::default()
    }

    /// Record a (form, lemma) pair.
    pub fn add(&mut self, form: &str, lemma: &str) {
        self.with_copy
            .insert(LemmaRuleEncoder::new(true).encode(form, lemma).to_string());
        self.without_copy
            .insert(LemmaRuleEncoder::new(false).encode(form, lemma).to_string());
    }

    /// The number of distinct rules with and without copying.
    pub fn rule_counts(&self) -> (usize, usize) {
        (self.with_copy.len(), self.without_copy.len())
    }

    /// Get the encoder with the smallest rule vocabulary.
    pub fn select(&self) -> LemmaRuleEncoder {
        LemmaRuleEncoder::new(self.with_copy.len() < self.without_copy.len())
    }
}
