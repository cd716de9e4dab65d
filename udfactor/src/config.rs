use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::{CorpusOptions, DEFAULT_MAX_FORM_LEN};
use crate::disambiguate::UNKNOWN_LEMMA_MARGIN;
use crate::error::UdFactorError;
use crate::factor::Factor;

/// Corpus configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusConfig {
    /// Factors that get the artificial root token.
    #[serde(default = "default_root_factors")]
    pub root_factors: Vec<Factor>,

    /// Drop tokens beyond this sentence length in training data.
    pub max_sentence_len: Option<usize>,

    /// Truncate character sequences to this length.
    #[serde(default = "default_max_form_len")]
    pub max_form_len: usize,
}

impl CorpusConfig {
    /// Get the options for reading a corpus that is annotated.
    ///
    /// Sentences are never truncated, every token is written back.
    pub fn options(&self) -> CorpusOptions {
        CorpusOptions::default()
    }

    /// Get the options for reading training data.
    pub fn train_options(&self) -> CorpusOptions {
        CorpusOptions {
            max_sentence_len: self.max_sentence_len,
            ..Default::default()
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        CorpusConfig {
            root_factors: default_root_factors(),
            max_sentence_len: None,
            max_form_len: default_max_form_len(),
        }
    }
}

fn default_root_factors() -> Vec<Factor> {
    vec![Factor::Forms, Factor::Head]
}

fn default_max_form_len() -> usize {
    DEFAULT_MAX_FORM_LEN
}

/// Batch configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Shuffle the sentences every epoch.
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,

    /// Seed of the shuffling random number generator.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            batch_size: default_batch_size(),
            shuffle: default_shuffle(),
            seed: default_seed(),
        }
    }
}

fn default_batch_size() -> usize {
    32
}

fn default_shuffle() -> bool {
    true
}

fn default_seed() -> u64 {
    42
}

/// Decoder configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DecoderConfig {
    /// Only allow one token to attach to the root.
    #[serde(default = "default_single_root")]
    pub single_root: bool,

    /// Factors that are predicted as tags.
    #[serde(default = "default_tags")]
    pub tags: Vec<Factor>,

    /// Predict dependency trees.
    #[serde(default = "default_parse")]
    pub parse: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            single_root: default_single_root(),
            tags: default_tags(),
            parse: default_parse(),
        }
    }
}

fn default_single_root() -> bool {
    true
}

fn default_tags() -> Vec<Factor> {
    vec![
        Factor::UPos,
        Factor::XPos,
        Factor::Feats,
        Factor::Lemmas,
    ]
}

fn default_parse() -> bool {
    true
}

/// Mappings configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MappingsConfig {
    /// The mappings file.
    pub path: String,
}

/// Morphological dictionary configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DictionaryConfig {
    /// The lexicon file.
    pub path: String,

    /// Margin by which the tag score of an analysis with an unknown
    /// lemma rule must exceed the best known analysis.
    #[serde(default = "default_unknown_lemma_margin")]
    pub unknown_lemma_margin: f32,
}

fn default_unknown_lemma_margin() -> f32 {
    UNKNOWN_LEMMA_MARGIN
}

/// Annotator configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,

    pub mappings: MappingsConfig,

    /// Disambiguate tags and lemmas with a morphological dictionary.
    pub dictionary: Option<DictionaryConfig>,
}

impl Config {
    /// Make configuration paths relative to the configuration file.
    pub fn relativize_paths<P>(&mut self, config_path: P) -> Result<(), UdFactorError>
    where
        P: AsRef<Path>,
    {
        let config_path = config_path.as_ref();

        self.mappings.path = relativize_path(config_path, &self.mappings.path)?;
        if let Some(ref mut dictionary) = self.dictionary {
            dictionary.path = relativize_path(config_path, &dictionary.path)?;
        }

        Ok(())
    }
}

pub trait TomlRead
where
    Self: Sized,
{
    fn from_toml_read(read: impl Read) -> Result<Self, UdFactorError>;
}

impl TomlRead for Config {
    fn from_toml_read(mut read: impl Read) -> Result<Self, UdFactorError> {
        let mut data = String::new();
        read.read_to_string(&mut data)?;
        let config: Config = toml::from_str(&data)?;

        if config.batch.batch_size == 0 {
            return Err(UdFactorError::IllegalConfigurationError(
                "batch size must be larger than zero".to_string(),
            ));
        }

        Ok(config)
    }
}

fn relativize_path(config_path: &Path, filename: &str) -> Result<String, UdFactorError> {
    if filename.is_empty() {
        return Ok(filename.to_owned());
    }

    let path = Path::new(&filename);

    // Don't touch absolute paths.
    if path.is_absolute() {
        return Ok(filename.to_owned());
    }

    let abs_config_path = config_path.canonicalize()?;
    Ok(abs_config_path
        .parent()
        .ok_or_else(|| {
            UdFactorError::RelativizePathError(format!(
                "Cannot get parent path of the configuration file: {}",
                abs_config_path.to_string_lossy()
            ))
        })?
        .join(path)
        .to_str()
        .ok_or_else(|| {
            UdFactorError::RelativizePathError(format!(
                "Cannot convert parent path to string: {}",
                abs_config_path.to_string_lossy()
            ))
        })?
        .to_owned())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::config::{
        BatchConfig, Config, CorpusConfig, DecoderConfig, DictionaryConfig, MappingsConfig,
        TomlRead,
    };
    use crate::dataset::CorpusOptions;
    use crate::error::UdFactorError;
    use crate::factor::Factor;

    #[test]
    fn config() {
        let config =
            Config::from_toml_read(include_bytes!("../testdata/udfactor.conf").as_ref()).unwrap();

        assert_eq!(
            config,
            Config {
                corpus: CorpusConfig {
                    root_factors: vec![Factor::Forms, Factor::Head, Factor::DepRel],
                    max_sentence_len: Some(120),
                    max_form_len: 64,
                },
                batch: BatchConfig {
                    batch_size: 16,
                    shuffle: false,
                    seed: 42,
                },
                decoder: DecoderConfig {
                    single_root: true,
                    tags: vec![Factor::UPos, Factor::XPos, Factor::Lemmas],
                    parse: true,
                },
                mappings: MappingsConfig {
                    path: "udfactor.mappings".to_string(),
                },
                dictionary: Some(DictionaryConfig {
                    path: "lexicon.tsv".to_string(),
                    unknown_lemma_margin: 0.5,
                }),
            }
        );
    }

    #[test]
    fn defaults_are_used() {
        let config = Config::from_toml_read("[mappings]\npath = \"m.yaml\"\n".as_bytes()).unwrap();
        assert_eq!(config.corpus, CorpusConfig::default());
        assert_eq!(config.batch, BatchConfig::default());
        assert_eq!(config.decoder, DecoderConfig::default());
        assert!(config.dictionary.is_none());
    }

    #[test]
    fn only_training_data_is_truncated() {
        let config =
            Config::from_toml_read(include_bytes!("../testdata/udfactor.conf").as_ref()).unwrap();
        assert_eq!(config.corpus.train_options().max_sentence_len, Some(120));
        assert_eq!(config.corpus.options(), CorpusOptions::default());
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(matches!(
            Config::from_toml_read("[mappings]\npath = \"m\"\nfoo = 1\n".as_bytes()),
            Err(UdFactorError::TomlDeserializationError(_))
        ));
        assert!(matches!(
            Config::from_toml_read(
                "[batch]\nbatch_size = 0\n[mappings]\npath = \"m\"\n".as_bytes()
            ),
            Err(UdFactorError::IllegalConfigurationError(_))
        ));
    }

    #[test]
    fn paths_are_relativized() {
        let config_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/udfactor.conf");
        let mut config =
            Config::from_toml_read(include_bytes!("../testdata/udfactor.conf").as_ref()).unwrap();
        config.relativize_paths(&config_path).unwrap();

        let testdata = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("testdata")
            .canonicalize()
            .unwrap();
        assert_eq!(
            Path::new(&config.mappings.path),
            testdata.join("udfactor.mappings")
        );
        assert_eq!(
            Path::new(&config.dictionary.unwrap().path),
            testdata.join("lexicon.tsv")
        );
    }
}
