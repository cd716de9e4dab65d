use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

/// Morphological dictionary error.
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Cannot read dictionary: {0}")]
    Io(#[from] io::Error),

    #[error("Line {line}: expected 3 columns, found {columns}")]
    ColumnCount { line: usize, columns: usize },

    #[error("Cannot analyze '{form}': {reason}")]
    Analysis { form: String, reason: String },
}

/// A dictionary analysis of a form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Analysis {
    /// The full lemma, possibly with additional information.
    pub lemma: String,

    pub tag: String,
}

impl Analysis {
    pub fn new(lemma: impl Into<String>, tag: impl Into<String>) -> Self {
        Analysis {
            lemma: lemma.into(),
            tag: tag.into(),
        }
    }
}

/// Morphological dictionary.
pub trait MorphoDictionary: Send + Sync {
    /// Get the analyses of a form.
    fn analyze(&self, form: &str) -> Result<Vec<Analysis>, DictionaryError>;

    /// Strip additional information from a lemma.
    ///
    /// Analyses with the same stripped lemma are considered to have the
    /// same lemma.
    fn lemma_id<'a>(&self, lemma: &'a str) -> &'a str;
}

/// Strip a lemma following the Prague Dependency Treebank conventions.
///
/// The lemma identifier ends before a `` ` `` or `_` that is not the
/// first character, or after the digits of a `-<digit>` suffix.
pub fn pdt_lemma_id(lemma: &str) -> &str {
    let mut chars = lemma.char_indices().skip(1).peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '`' | '_' => return &lemma[..idx],
            '-' if matches!(chars.peek(), Some((_, next)) if next.is_ascii_digit()) => {
                let end = chars
                    .by_ref()
                    .take_while(|(_, c)| c.is_ascii_digit())
                    .last()
                    .map(|(idx, c)| idx + c.len_utf8())
                    .unwrap_or(idx + 1);
                return &lemma[..end];
            }
            _ => (),
        }
    }

    lemma
}

/// Dictionary backed by a lexicon.
///
/// The lexicon is read from a tab-separated file with the columns
/// form, lemma, and tag. Forms that are not in the lexicon are looked
/// up in lowercase.
#[derive(Debug, Default)]
pub struct LexiconDictionary {
    analyses: HashMap<String, Vec<Analysis>>,
}

impl LexiconDictionary {
    pub fn open<P>(path: P) -> Result<Self, DictionaryError>
    where
        P: AsRef<Path>,
    {
        Self::from_read(BufReader::new(File::open(path)?))
    }

    pub fn from_read<R>(read: R) -> Result<Self, DictionaryError>
    where
        R: BufRead,
    {
        let mut dictionary = LexiconDictionary::default();

        for (idx, line) in read.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let columns = line.split('\t').collect::<Vec<_>>();
            if columns.len() != 3 {
                return Err(DictionaryError::ColumnCount {
                    line: idx + 1,
                    columns: columns.len(),
                });
            }

            dictionary.add(columns[0], Analysis::new(columns[1], columns[2]));
        }

        Ok(dictionary)
    }

    /// Add an analysis of a form.
    pub fn add(&mut self, form: &str, analysis: Analysis) {
        let analyses = self.analyses.entry(form.to_owned()).or_default();
        if !analyses.contains(&analysis) {
            analyses.push(analysis);
        }
    }

    /// The number of forms in the dictionary.
    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }
}

impl MorphoDictionary for LexiconDictionary {
    fn analyze(&self, form: &str) -> Result<Vec<Analysis>, DictionaryError> {
        let analyses = match self.analyses.get(form) {
            Some(analyses) => analyses,
            None => match self.analyses.get(&form.to_lowercase()) {
                Some(analyses) => analyses,
                None => return Ok(Vec::new()),
            },
        };

        Ok(analyses.clone())
    }

    fn lemma_id<'a>(&self, lemma: &'a str) -> &'a str {
        pdt_lemma_id(lemma)
    }
}
