use std::io;

use ndarray::ShapeError;
use thiserror::Error;
use udfactor_encoders::dependency::TreeError;
use udfactor_encoders::lemma::DecodeError;

use crate::dataset::{CorpusError, SerializeError};
use crate::disambiguate::DictionaryError;
use crate::predictions::PredictionError;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum UdFactorError {
    #[error(transparent)]
    CorpusError(#[from] CorpusError),

    #[error(transparent)]
    DictionaryError(#[from] DictionaryError),

    #[error("Illegal configuration: {0}")]
    IllegalConfigurationError(String),

    #[error(transparent)]
    IoError(#[from] io::Error),

    #[error(transparent)]
    LemmaDecodeError(#[from] DecodeError),

    #[error(transparent)]
    PredictionError(#[from] PredictionError),

    #[error("Cannot relativize path: {0}")]
    RelativizePathError(String),

    #[error(transparent)]
    SerializeError(#[from] SerializeError),

    #[error(transparent)]
    ShapeError(#[from] ShapeError),

    #[error(transparent)]
    TomlDeserializationError(#[from] toml::de::Error),

    #[error(transparent)]
    TreeError(#[from] TreeError),
}
