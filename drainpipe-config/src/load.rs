use std::{
    io,
    path::{Path, PathBuf},
};

use rust_cli_config::{
    self as config,
    builder::{ConfigBuilder, DefaultState},
};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory holding configuration files, relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

const BASE_STEM: &str = "base";

/// Overrides look like `APP_PIPELINE__QUEUE__CAPACITY=8`.
const ENV_PREFIX: &str = "APP";
const ENV_SEPARATOR: &str = "__";

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    /// The `configuration` directory does not exist.
    ///
    /// Callers that can run on defaults match on this variant and fall back.
    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    #[error("no `{stem}` configuration file in `{directory}` (tried {tried})")]
    FileMissing {
        stem: &'static str,
        directory: PathBuf,
        tried: String,
    },

    /// A file exists but is not valid for its format.
    #[error("failed to read `{path}`: {source}")]
    FileLoad {
        path: PathBuf,
        source: config::ConfigError,
    },

    /// The merged settings do not fit the target type, or an override is malformed.
    #[error("invalid configuration: {0}")]
    Invalid(#[source] config::ConfigError),

    /// `APP_ENVIRONMENT` holds an unsupported value.
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[source] io::Error),
}

/// Loads configuration from the `configuration` directory of the current working directory.
///
/// See [`load_config_from`] for the layering rules.
pub fn load_config<T: DeserializeOwned>() -> Result<T, LoadConfigError> {
    let cwd = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    load_config_from(&cwd.join(CONFIGURATION_DIR))
}

/// Loads layered configuration from `directory`.
///
/// `base.*` is read first, then the file named after `APP_ENVIRONMENT` (`dev.*` or
/// `prod.*`), then `APP_`-prefixed environment variables. Each file may be yaml, yml or json.
pub fn load_config_from<T: DeserializeOwned>(directory: &Path) -> Result<T, LoadConfigError> {
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(
            directory.to_path_buf(),
        ));
    }

    let environment = Environment::load().map_err(LoadConfigError::Environment)?;

    let mut builder = config::Config::builder();
    for stem in [BASE_STEM, environment.as_str()] {
        let path = find_file(directory, stem)?;
        builder = builder.add_source(config::File::from(path.as_path()));
        check_file(&builder, path)?;
    }

    builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(LoadConfigError::Invalid)
}

fn find_file(directory: &Path, stem: &'static str) -> Result<PathBuf, LoadConfigError> {
    let candidates: Vec<PathBuf> = EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .collect();

    if let Some(path) = candidates.iter().find(|path| path.is_file()) {
        return Ok(path.clone());
    }

    Err(LoadConfigError::FileMissing {
        stem,
        directory: directory.to_path_buf(),
        tried: EXTENSIONS.join(", "),
    })
}

/// Builds the sources added so far so a broken file is reported by path.
fn check_file(
    builder: &ConfigBuilder<DefaultState>,
    path: PathBuf,
) -> Result<(), LoadConfigError> {
    match builder.clone().build() {
        Ok(_) => Ok(()),
        Err(source) => Err(LoadConfigError::FileLoad { path, source }),
    }
}
