use std::fs::File;
use std::io::{BufReader, Write};

use anyhow::{Context, Result};
use udfactor::config::{Config, TomlRead};
use udfactor::disambiguate::LexiconDictionary;
use udfactor::mappings::ImmutableMappings;

pub fn load_config(config_path: &str) -> Result<Config> {
    let config_file = File::open(config_path)
        .context(format!("Cannot open configuration file '{}'", &config_path))?;
    let mut config = Config::from_toml_read(config_file)
        .context(format!("Cannot parse configuration file: {}", config_path))?;
    config.relativize_paths(config_path).context(format!(
        "Cannot relativize paths in configuration file: {}",
        config_path
    ))?;

    Ok(config)
}

/// Load the frozen mappings of the configuration.
pub fn load_mappings(config: &Config) -> Result<ImmutableMappings> {
    let f = File::open(&config.mappings.path).context(format!(
        "Cannot open mappings file: {}",
        config.mappings.path
    ))?;
    let mappings: ImmutableMappings = serde_yaml::from_reader(BufReader::new(f)).context(
        format!("Cannot deserialize mappings from: {}", config.mappings.path),
    )?;

    mappings.log_sizes();

    Ok(mappings)
}

/// Write the mappings to the path of the configuration.
pub fn save_mappings(config: &Config, mappings: &ImmutableMappings) -> Result<()> {
    let mut f = File::create(&config.mappings.path).context(format!(
        "Cannot create mappings file: {}",
        config.mappings.path
    ))?;
    let serialized = serde_yaml::to_string(mappings).context("Cannot serialize mappings")?;
    f.write_all(serialized.as_bytes())
        .context("Cannot write mappings")
}

/// Load the dictionary of the configuration, if any.
pub fn load_dictionary(config: &Config) -> Result<Option<LexiconDictionary>> {
    let dictionary_config = match &config.dictionary {
        Some(dictionary_config) => dictionary_config,
        None => return Ok(None),
    };

    let dictionary = LexiconDictionary::open(&dictionary_config.path).context(format!(
        "Cannot read dictionary: {}",
        dictionary_config.path
    ))?;
    log::info!("Loaded dictionary with {} forms", dictionary.len());

    Ok(Some(dictionary))
}
