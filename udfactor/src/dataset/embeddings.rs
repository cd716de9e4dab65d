use std::io::BufRead;

use ndarray::{concatenate, Array2, ArrayView2, Axis};

use crate::dataset::CorpusError;

/// Precomputed contextualized embeddings of the tokens of a corpus.
///
/// Embeddings are read from JSON lines, one sentence per line. Every
/// line is an array with one embedding array per token.
#[derive(Clone, Debug, PartialEq)]
pub struct Embeddings {
    sentences: Vec<Array2<f32>>,
    dim: usize,
}

impl Embeddings {
    /// Read embeddings.
    ///
    /// The embeddings of tokens beyond `max_sentence_len` are dropped.
    pub fn read<R>(read: R, max_sentence_len: Option<usize>) -> Result<Self, CorpusError>
    where
        R: BufRead,
    {
        let mut sentences = Vec::new();
        let mut dim = None;

        for (idx, line) in read.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;

            let tokens: Vec<Vec<f32>> =
                serde_json::from_str(&line).map_err(|err| CorpusError::Embeddings {
                    line: line_no,
                    reason: err.to_string(),
                })?;

            let n_tokens = max_sentence_len
                .unwrap_or(tokens.len())
                .min(tokens.len());
            let token_dim = match tokens.first() {
                Some(token) => *dim.get_or_insert(token.len()),
                None => dim.unwrap_or(0),
            };

            let mut data = Vec::with_capacity(n_tokens * token_dim);
            for token in &tokens[..n_tokens] {
                if token.len() != token_dim {
                    return Err(CorpusError::Embeddings {
                        line: line_no,
                        reason: format!(
                            "embedding of size {}, expected {}",
                            token.len(),
                            token_dim
                        ),
                    });
                }
                data.extend_from_slice(token);
            }

            let sentence = Array2::from_shape_vec((n_tokens, token_dim), data).map_err(|err| {
                CorpusError::Embeddings {
                    line: line_no,
                    reason: err.to_string(),
                }
            })?;
            sentences.push(sentence);
        }

        Ok(Embeddings {
            sentences,
            dim: dim.unwrap_or(0),
        })
    }

    /// Concatenate the embeddings of every token with `other`.
    pub fn concat(self, other: Embeddings) -> Result<Self, CorpusError> {
        if self.len() != other.len() {
            return Err(CorpusError::EmbeddingsCount {
                embeddings: other.len(),
                sentences: self.len(),
            });
        }

        let sentences = self
            .sentences
            .iter()
            .zip(&other.sentences)
            .enumerate()
            .map(|(idx, (ours, theirs))| {
                if ours.nrows() != theirs.nrows() {
                    return Err(CorpusError::EmbeddingsLength {
                        sentence: idx,
                        embeddings: theirs.nrows(),
                        tokens: ours.nrows(),
                    });
                }

                concatenate(Axis(1), &[ours.view(), theirs.view()]).map_err(|err| {
                    CorpusError::Embeddings {
                        line: idx + 1,
                        reason: err.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Embeddings {
            sentences,
            dim: self.dim + other.dim,
        })
    }

    /// The embedding size.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// The embeddings of a sentence, `[n_tokens, dim]`.
    pub fn sentence(&self, idx: usize) -> ArrayView2<f32> {
        self.sentences[idx].view()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use ndarray::arr2;

    use super::Embeddings;
    use crate::dataset::CorpusError;

    static EMBEDS: &str = "[[0.5, 1.0], [1.5, 2.0]]
[[3.0, 4.0]]
";

    #[test]
    fn embeddings_are_read() {
        let embeddings = Embeddings::read(Cursor::new(EMBEDS), None).unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings.dim(), 2);
        assert_eq!(embeddings.sentence(0), arr2(&[[0.5, 1.0], [1.5, 2.0]]));
        assert_eq!(embeddings.sentence(1), arr2(&[[3.0, 4.0]]));
    }

    #[test]
    fn long_sentences_are_truncated() {
        let embeddings = Embeddings::read(Cursor::new(EMBEDS), Some(1)).unwrap();
        assert_eq!(embeddings.sentence(0), arr2(&[[0.5, 1.0]]));
        assert_eq!(embeddings.sentence(1), arr2(&[[3.0, 4.0]]));
    }

    #[test]
    fn embeddings_are_concatenated() {
        let first = Embeddings::read(Cursor::new(EMBEDS), None).unwrap();
        let second = Embeddings::read(Cursor::new("[[9.0], [8.0]]\n[[7.0]]\n"), None).unwrap();

        let embeddings = first.concat(second).unwrap();
        assert_eq!(embeddings.dim(), 3);
        assert_eq!(
            embeddings.sentence(0),
            arr2(&[[0.5, 1.0, 9.0], [1.5, 2.0, 8.0]])
        );
        assert_eq!(embeddings.sentence(1), arr2(&[[3.0, 4.0, 7.0]]));
    }

    #[test]
    fn inconsistent_embeddings_are_rejected() {
        assert!(matches!(
            Embeddings::read(Cursor::new("[[1.0, 2.0], [3.0]]\n"), None),
            Err(CorpusError::Embeddings { line: 1, .. })
        ));
        assert!(matches!(
            Embeddings::read(Cursor::new("[[1.0]]\nnot json\n"), None),
            Err(CorpusError::Embeddings { line: 2, .. })
        ));

        let first = Embeddings::read(Cursor::new(EMBEDS), None).unwrap();
        let second = Embeddings::read(Cursor::new("[[9.0]]\n[[7.0]]\n"), None).unwrap();
        assert!(matches!(
            first.concat(second),
            Err(CorpusError::EmbeddingsLength {
                sentence: 0,
                embeddings: 1,
                tokens: 2
            })
        ));

        let first = Embeddings::read(Cursor::new(EMBEDS), None).unwrap();
        let second = Embeddings::read(Cursor::new("[[9.0]]\n"), None).unwrap();
        assert!(matches!(
            first.concat(second),
            Err(CorpusError::EmbeddingsCount {
                embeddings: 1,
                sentences: 2
            })
        ));
    }
}
