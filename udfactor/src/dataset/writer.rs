use std::borrow::Cow;
use std::io::{self, Write};

use thiserror::Error;

use crate::dataset::Sentence;
use crate::factor::Factor;
use crate::mappings::ImmutableMappings;

/// Corpus writing error.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("Cannot write sentence: {0}")]
    Io(#[from] io::Error),

    #[error("Identifier {id} is not in the {factor} vocabulary")]
    UnknownId { factor: Factor, id: usize },
}

/// A value that replaces the value of a token in the written output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Override {
    /// A vocabulary identifier.
    ///
    /// Lemma identifiers refer to lemma rules, which are applied to the
    /// form of the token.
    Id(usize),

    /// A head, `None` is written as `_`.
    Head(Option<usize>),

    /// A value that is written as-is.
    Literal(String),
}

/// Per-token overrides of factors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Overrides(Vec<Option<Vec<Override>>>);

impl Default for Overrides {
    fn default() -> Self {
        Overrides(vec![None; Factor::COUNT])
    }
}

impl Overrides {
    pub fn new() -> Self {
        Default::default()
    }

    /// Override the values of a factor, one value per token.
    pub fn set(&mut self, factor: Factor, values: Vec<Override>) {
        self.0[factor.index()] = Some(values);
    }

    pub fn get(&self, factor: Factor) -> Option<&[Override]> {
        self.0[factor.index()].as_deref()
    }

    pub fn get_mut(&mut self, factor: Factor) -> Option<&mut Vec<Override>> {
        self.0[factor.index()].as_mut()
    }
}

/// Writer of CoNLL-U corpora.
pub struct ConlluWriter<'a, W> {
    write: W,
    mappings: &'a ImmutableMappings,
}

impl<'a, W> ConlluWriter<'a, W>
where
    W: Write,
{
    pub fn new(write: W, mappings: &'a ImmutableMappings) -> Self {
        ConlluWriter { write, mappings }
    }

    /// Write a sentence.
    ///
    /// Factors without overrides are written as they were read. Extras
    /// are written verbatim before the token that they preceded.
    pub fn write_sentence(
        &mut self,
        sentence: &Sentence,
        overrides: &Overrides,
    ) -> Result<(), SerializeError> {
        let extras = sentence.extras();

        for token in 0..sentence.len() {
            for extra in &extras[token] {
                writeln!(self.write, "{}", extra)?;
            }

            // Nothing of a token is written until all columns resolve.
            let mut columns = Vec::with_capacity(Factor::ALL.len());
            for &factor in &Factor::ALL {
                let value = match overrides.get(factor).and_then(|values| values.get(token)) {
                    Some(value) => self.resolve(sentence, token, factor, value)?,
                    None => Cow::Borrowed(sentence.value(token, factor)),
                };
                columns.push(value);
            }
            writeln!(self.write, "{}\t{}", token + 1, columns.join("\t"))?;
        }

        for extra in &extras[sentence.len()] {
            writeln!(self.write, "{}", extra)?;
        }

        writeln!(self.write)?;

        Ok(())
    }

    fn resolve<'s>(
        &self,
        sentence: &'s Sentence,
        token: usize,
        factor: Factor,
        value: &'s Override,
    ) -> Result<Cow<'s, str>, SerializeError> {
        let id = match value {
            Override::Literal(literal) => return Ok(Cow::Borrowed(literal.as_str())),
            Override::Head(Some(head)) => return Ok(Cow::Owned(head.to_string())),
            Override::Head(None) => return Ok(Cow::Borrowed("_")),
            Override::Id(id) if factor == Factor::Head => return Ok(Cow::Owned(id.to_string())),
            Override::Id(id) => *id,
        };

        let word = self
            .mappings
            .vocab(factor)
            .word_of(id)
            .ok_or(SerializeError::UnknownId { factor, id })?;

        if factor != Factor::Lemmas {
            return Ok(Cow::Owned(word));
        }

        let form = sentence.value(token, Factor::Forms);
        match self.mappings.lemma_encoder().decode(form, &word) {
            Ok(lemma) if lemma.is_empty() => Ok(Cow::Borrowed(form)),
            Ok(lemma) => Ok(Cow::Owned(lemma)),
            Err(err) => {
                log::warn!("Cannot apply lemma rule to '{}': {}", form, err);
                Ok(Cow::Borrowed(form))
            }
        }
    }

    /// Get the underlying writer.
    pub fn into_inner(self) -> W {
        self.write
    }
}
