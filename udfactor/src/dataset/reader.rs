use std::io::{self, BufRead};

use thiserror::Error;

use crate::factor::Factor;

/// The number of columns of a token line.
pub const N_COLUMNS: usize = 10;

/// Corpus reading error.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Cannot read corpus: {0}")]
    Io(#[from] io::Error),

    #[error("Line {line}: expected {} columns, found {columns}", N_COLUMNS)]
    ColumnCount { line: usize, columns: usize },

    #[error("Line {line}: invalid token index '{index}'")]
    InvalidIndex { line: usize, index: String },

    #[error("Line {line}: invalid head '{head}'")]
    InvalidHead { line: usize, head: String },

    #[error("Embeddings line {line}: {reason}")]
    Embeddings { line: usize, reason: String },

    #[error("{embeddings} sentences with embeddings, corpus has {sentences} sentences")]
    EmbeddingsCount { embeddings: usize, sentences: usize },

    #[error("Sentence {sentence}: embeddings for {embeddings} tokens, sentence has {tokens} tokens")]
    EmbeddingsLength {
        sentence: usize,
        embeddings: usize,
        tokens: usize,
    },
}

/// A sentence as it is stored in the corpus.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawSentence {
    /// The annotation columns of every token, indexed by factor.
    pub tokens: Vec<Vec<String>>,

    /// Lines that are not tokens, by the token position that they
    /// precede. Position `tokens.len()` holds trailing lines.
    pub extras: Vec<Vec<String>>,

    /// The document variant of the sentence.
    pub variant: String,
}

impl RawSentence {
    /// Get a column of a token.
    pub fn value(&self, token: usize, factor: Factor) -> &str {
        &self.tokens[token][factor.index()]
    }

    fn attach_extra(&mut self, position: usize, line: String) {
        if self.extras.len() <= position {
            self.extras.resize_with(position + 1, Vec::new);
        }
        self.extras[position].push(line);
    }
}

/// Check whether a line is a comment, multiword token, or empty node.
fn is_extra(line: &str) -> bool {
    if line.starts_with('#') {
        return true;
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && matches!(line.as_bytes().get(digits), Some(b'-') | Some(b'.'))
}

/// Extract the variant of a `# variant = X` comment.
fn variant_comment(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("variant")?.trim_start();
    let value = rest.strip_prefix('=')?.trim_start();
    value.split_whitespace().next()
}

/// Reader of CoNLL-U corpora.
///
/// Token lines are split into their annotation columns. Comments,
/// multiword tokens, and empty nodes are kept verbatim as extras of the
/// sentence. A `# variant = X` comment sets the document variant of
/// all following sentences.
pub struct ConlluReader<R> {
    read: R,
    line_no: usize,
    max_sentence_len: Option<usize>,
    variant: String,
    pending_extras: Vec<String>,
}

impl<R> ConlluReader<R>
where
    R: BufRead,
{
    pub fn new(read: R) -> Self {
        ConlluReader {
            read,
            line_no: 0,
            max_sentence_len: None,
            variant: String::new(),
            pending_extras: Vec::new(),
        }
    }

    /// Drop the tokens of a sentence beyond `max_sentence_len`.
    pub fn max_sentence_len(mut self, max_sentence_len: Option<usize>) -> Self {
        self.max_sentence_len = max_sentence_len;
        self
    }

    /// Read the next sentence.
    pub fn read_sentence(&mut self) -> Result<Option<RawSentence>, CorpusError> {
        let mut sentence: Option<RawSentence> = None;
        let mut buf = String::new();

        loop {
            buf.clear();
            if self.read.read_line(&mut buf)? == 0 {
                return Ok(sentence.map(Self::finish));
            }
            self.line_no += 1;

            let line = buf.trim_end_matches(|c| c == '\n' || c == '\r');

            if line.is_empty() {
                match sentence {
                    Some(sentence) => return Ok(Some(Self::finish(sentence))),
                    None => continue,
                }
            }

            if is_extra(line) {
                if let Some(variant) = variant_comment(line) {
                    self.variant = variant.to_owned();
                }

                match sentence.as_mut() {
                    Some(sentence) => {
                        let position = sentence.tokens.len();
                        sentence.attach_extra(position, line.to_owned());
                    }
                    None => self.pending_extras.push(line.to_owned()),
                }

                continue;
            }

            let columns = self.parse_token(line)?;

            let sentence = sentence.get_or_insert_with(|| {
                let mut sentence = RawSentence {
                    variant: self.variant.clone(),
                    ..Default::default()
                };
                for extra in self.pending_extras.drain(..) {
                    sentence.attach_extra(0, extra);
                }
                sentence
            });

            if let Some(max_sentence_len) = self.max_sentence_len {
                if sentence.tokens.len() >= max_sentence_len {
                    continue;
                }
            }

            sentence.tokens.push(columns);
        }
    }

    fn parse_token(&self, line: &str) -> Result<Vec<String>, CorpusError> {
        let mut columns = line.split('\t');

        let index = columns.next().unwrap_or_default();
        if index.parse::<usize>().is_err() {
            return Err(CorpusError::InvalidIndex {
                line: self.line_no,
                index: index.to_owned(),
            });
        }

        let columns = columns.map(ToOwned::to_owned).collect::<Vec<_>>();
        if columns.len() != N_COLUMNS - 1 {
            return Err(CorpusError::ColumnCount {
                line: self.line_no,
                columns: columns.len() + 1,
            });
        }

        let head = &columns[Factor::Head.index()];
        if head != "_" && head.parse::<usize>().is_err() {
            return Err(CorpusError::InvalidHead {
                line: self.line_no,
                head: head.clone(),
            });
        }

        Ok(columns)
    }

    fn finish(mut sentence: RawSentence) -> RawSentence {
        sentence
            .extras
            .resize_with(sentence.tokens.len() + 1, Vec::new);
        sentence
    }
}

impl<R> Iterator for ConlluReader<R>
where
    R: BufRead,
{
    type Item = Result<RawSentence, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_sentence().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{is_extra, variant_comment, ConlluReader, CorpusError};
    use crate::factor::Factor;

    static CORPUS: &str = "# sent_id = 1
# variant = news
1\tZe\tze\tPRON\tVNW\t_\t2\tnsubj\t_\t_
2-3\tkoopt'r\t_\t_\t_\t_\t_\t_\t_\t_
2\tkoopt\tkopen\tVERB\tWW\t_\t0\troot\t_\t_
3\ter\ter\tADV\tVNW\t_\t2\tadvmod\t_\t_
3.1\tiets\tiets\tPRON\tVNW\t_\t_\t_\t2:obj\t_

1\tJa\tja\tINTJ\tTSW\t_\t0\troot\t_\t_
# trailing
";

    #[test]
    fn recognizes_extras() {
        assert!(is_extra("# text = Ja"));
        assert!(is_extra("3-4\tvan de"));
        assert!(is_extra("3.1\tiets"));
        assert!(!is_extra("3\tiets"));
        assert!(!is_extra("-3\tiets"));
    }

    #[test]
    fn parses_variant_comments() {
        assert_eq!(variant_comment("# variant = news"), Some("news"));
        assert_eq!(variant_comment("#variant=wiki x"), Some("wiki"));
        assert_eq!(variant_comment("# variants = news"), None);
        assert_eq!(variant_comment("# text = variant"), None);
    }

    #[test]
    fn reads_sentences_with_extras() {
        let sentences = ConlluReader::new(Cursor::new(CORPUS))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(sentences.len(), 2);

        let first = &sentences[0];
        assert_eq!(first.tokens.len(), 3);
        assert_eq!(first.value(1, Factor::Lemmas), "kopen");
        assert_eq!(first.value(2, Factor::Head), "2");
        assert_eq!(first.variant, "news");
        assert_eq!(
            first.extras,
            vec![
                vec!["# sent_id = 1".to_string(), "# variant = news".to_string()],
                vec!["2-3\tkoopt'r\t_\t_\t_\t_\t_\t_\t_\t_".to_string()],
                vec![],
                vec!["3.1\tiets\tiets\tPRON\tVNW\t_\t_\t_\t2:obj\t_".to_string()],
            ]
        );

        let second = &sentences[1];
        assert_eq!(second.variant, "news");
        assert_eq!(second.extras, vec![vec![], vec!["# trailing".to_string()]]);
    }

    #[test]
    fn truncates_long_sentences() {
        let sentences = ConlluReader::new(Cursor::new(CORPUS))
            .max_sentence_len(Some(2))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(sentences[0].tokens.len(), 2);
        assert_eq!(sentences[0].extras.len(), 3);
        assert_eq!(sentences[0].extras[2].len(), 1);
        assert_eq!(sentences[1].tokens.len(), 1);
    }

    #[test]
    fn reports_line_of_malformed_token() {
        let corpus = "1\tZe\tze\tPRON\tVNW\t_\t2\tnsubj\t_\t_\n\n# c\n1\tJa\tja\tINTJ\n";
        let mut reader = ConlluReader::new(Cursor::new(corpus));
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(
            reader.next().unwrap(),
            Err(CorpusError::ColumnCount {
                line: 4,
                columns: 4
            })
        ));

        let corpus = "1\tZe\tze\tPRON\tVNW\t_\tx\tnsubj\t_\t_\n";
        let mut reader = ConlluReader::new(Cursor::new(corpus));
        assert!(matches!(
            reader.next().unwrap(),
            Err(CorpusError::InvalidHead { line: 1, .. })
        ));

        let corpus = "a\tZe\tze\tPRON\tVNW\t_\t2\tnsubj\t_\t_\n";
        let mut reader = ConlluReader::new(Cursor::new(corpus));
        assert!(matches!(
            reader.next().unwrap(),
            Err(CorpusError::InvalidIndex { line: 1, .. })
        ));
    }
}
