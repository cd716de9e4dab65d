//! Network outputs for a sentence.
//!
//! The network is an external collaborator. Its outputs are read as
//! JSON records, one record per sentence, with nested arrays.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use ndarray::{Array2, ArrayView2, ShapeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::factor::Factor;

/// Prediction error.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("{factor} cannot be predicted as a tag")]
    UnsupportedFactor { factor: Factor },

    #[error("no logits for {factor}")]
    MissingTag { factor: Factor },

    #[error("no head scores")]
    MissingHeads,

    #[error("rows of {name} have different lengths")]
    Ragged { name: String },

    #[error("{name} has shape {shape:?}, expected {expected:?}")]
    InvalidShape {
        name: String,
        shape: Vec<usize>,
        expected: Vec<usize>,
    },

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("predictions are for {predicted} tokens, sentence has {tokens} tokens")]
    TokenCount { predicted: usize, tokens: usize },
}

/// Serialized network outputs of a sentence.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionRecord {
    /// Per tag factor, the class logits of every token.
    #[serde(default)]
    pub tags: BTreeMap<Factor, Vec<Vec<f32>>>,

    /// Head scores, including the root row and column.
    #[serde(default)]
    pub heads: Option<Vec<Vec<f32>>>,

    /// Best relation identifier for every dependent and head.
    #[serde(default)]
    pub deprels: Option<Vec<Vec<usize>>>,
}

/// Network outputs of a sentence.
#[derive(Clone, Debug, PartialEq)]
pub struct SentencePredictions {
    n_tokens: usize,
    tags: Vec<Option<Array2<f32>>>,
    heads: Option<Array2<f32>>,
    deprels: Option<Array2<usize>>,
}

impl SentencePredictions {
    /// Construct empty predictions for a sentence of `n_tokens` tokens.
    pub fn new(n_tokens: usize) -> Self {
        SentencePredictions {
            n_tokens,
            tags: vec![None; Factor::COUNT],
            heads: None,
            deprels: None,
        }
    }

    /// The number of tokens.
    pub fn len(&self) -> usize {
        self.n_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.n_tokens == 0
    }

    /// Set the tag logits of a factor, `[n_tokens, n_classes]`.
    pub fn set_tag_logits(
        &mut self,
        factor: Factor,
        logits: Array2<f32>,
    ) -> Result<(), PredictionError> {
        if matches!(factor, Factor::Forms | Factor::Head | Factor::DepRel) {
            return Err(PredictionError::UnsupportedFactor { factor });
        }

        if logits.nrows() != self.n_tokens {
            return Err(PredictionError::InvalidShape {
                name: factor.to_string(),
                shape: logits.shape().to_vec(),
                expected: vec![self.n_tokens, logits.ncols()],
            });
        }

        self.tags[factor.index()] = Some(logits);

        Ok(())
    }

    /// Set the head scores, `[n_tokens + 1, n_tokens + 1]`.
    pub fn set_head_scores(&mut self, scores: Array2<f32>) -> Result<(), PredictionError> {
        self.check_square("heads", scores.shape())?;
        self.heads = Some(scores);
        Ok(())
    }

    /// Set the relations, `[n_tokens + 1, n_tokens + 1]`.
    pub fn set_deprels(&mut self, deprels: Array2<usize>) -> Result<(), PredictionError> {
        self.check_square("deprels", deprels.shape())?;
        self.deprels = Some(deprels);
        Ok(())
    }

    fn check_square(&self, name: &str, shape: &[usize]) -> Result<(), PredictionError> {
        let expected = vec![self.n_tokens + 1, self.n_tokens + 1];
        if shape != expected.as_slice() {
            return Err(PredictionError::InvalidShape {
                name: name.to_string(),
                shape: shape.to_vec(),
                expected,
            });
        }

        Ok(())
    }

    pub fn tag_logits(&self, factor: Factor) -> Option<ArrayView2<f32>> {
        self.tags[factor.index()].as_ref().map(Array2::view)
    }

    pub fn head_scores(&self) -> Option<ArrayView2<f32>> {
        self.heads.as_ref().map(Array2::view)
    }

    /// Relations, indexed by dependent and head.
    pub fn deprels(&self) -> Option<ArrayView2<usize>> {
        self.deprels.as_ref().map(Array2::view)
    }
}

fn matrix<T>(name: &str, rows: Vec<Vec<T>>) -> Result<Array2<T>, PredictionError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|row| row.len() != n_cols) {
        return Err(PredictionError::Ragged {
            name: name.to_string(),
        });
    }

    Ok(Array2::from_shape_vec(
        (n_rows, n_cols),
        rows.into_iter().flatten().collect(),
    )?)
}

impl TryFrom<PredictionRecord> for SentencePredictions {
    type Error = PredictionError;

    fn try_from(record: PredictionRecord) -> Result<Self, Self::Error> {
        let first_tag_len = record.tags.values().next().map(Vec::len);

        let heads = record
            .heads
            .map(|heads| matrix("heads", heads))
            .transpose()?;
        let deprels = record
            .deprels
            .map(|deprels| matrix("deprels", deprels))
            .transpose()?;

        let n_tokens = heads
            .as_ref()
            .map(|heads| heads.nrows().saturating_sub(1))
            .or_else(|| deprels.as_ref().map(|d| d.nrows().saturating_sub(1)))
            .or(first_tag_len)
            .unwrap_or(0);

        let mut predictions = SentencePredictions::new(n_tokens);

        for (factor, logits) in record.tags {
            predictions.set_tag_logits(factor, matrix(factor.name(), logits)?)?;
        }

        if let Some(heads) = heads {
            predictions.set_head_scores(heads)?;
        }

        if let Some(deprels) = deprels {
            predictions.set_deprels(deprels)?;
        }

        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use maplit::btreemap;
    use ndarray::arr2;

    use super::{PredictionError, PredictionRecord, SentencePredictions};
    use crate::factor::Factor;

    #[test]
    fn records_are_converted() {
        let record: PredictionRecord = serde_json::from_str(
            r#"{
                "tags": {"UPOS": [[0.1, 0.9], [0.7, 0.3]]},
                "heads": [[0, 0, 0], [1, 0, 2], [3, 1, 0]],
                "deprels": [[0, 0, 0], [4, 0, 5], [6, 7, 0]]
            }"#,
        )
        .unwrap();

        let predictions = SentencePredictions::try_from(record).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(
            predictions.tag_logits(Factor::UPos).unwrap(),
            arr2(&[[0.1, 0.9], [0.7, 0.3]])
        );
        assert!(predictions.tag_logits(Factor::XPos).is_none());
        assert_eq!(predictions.head_scores().unwrap()[[2, 0]], 3.);
        assert_eq!(predictions.deprels().unwrap()[[1, 2]], 5);
    }

    #[test]
    fn tags_without_tree() {
        let record = PredictionRecord {
            tags: btreemap! {
                Factor::Lemmas => vec![vec![0.; 4]; 3],
                Factor::XPos => vec![vec![1.; 2]; 3],
            },
            ..Default::default()
        };

        let predictions = SentencePredictions::try_from(record).unwrap();
        assert_eq!(predictions.len(), 3);
        assert!(predictions.head_scores().is_none());
        assert_eq!(predictions.tag_logits(Factor::XPos).unwrap().shape(), &[3, 2]);
    }

    #[test]
    fn relations_without_heads() {
        let record = PredictionRecord {
            tags: btreemap! { Factor::UPos => vec![vec![0.; 2]; 2] },
            deprels: Some(vec![vec![0; 3]; 3]),
            ..Default::default()
        };

        let predictions = SentencePredictions::try_from(record).unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(predictions.head_scores().is_none());
        assert_eq!(predictions.deprels().unwrap().shape(), &[3, 3]);
    }

    #[test]
    fn invalid_records_are_rejected() {
        let ragged = PredictionRecord {
            heads: Some(vec![vec![0., 1.], vec![0.]]),
            ..Default::default()
        };
        assert!(matches!(
            SentencePredictions::try_from(ragged),
            Err(PredictionError::Ragged { .. })
        ));

        let mismatch = PredictionRecord {
            tags: btreemap! { Factor::UPos => vec![vec![0.; 2]; 3] },
            heads: Some(vec![vec![0.; 3]; 3]),
            ..Default::default()
        };
        assert!(matches!(
            SentencePredictions::try_from(mismatch),
            Err(PredictionError::InvalidShape { .. })
        ));

        let forms = PredictionRecord {
            tags: btreemap! { Factor::Forms => vec![vec![0.; 2]] },
            ..Default::default()
        };
        assert!(matches!(
            SentencePredictions::try_from(forms),
            Err(PredictionError::UnsupportedFactor {
                factor: Factor::Forms
            })
        ));
    }
}
