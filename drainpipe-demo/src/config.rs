use anyhow::Context;
use drainpipe_config::shared::DemoConfig;
use drainpipe_config::{LoadConfigError, load_config};

/// Loads and validates the demo configuration.
///
/// Falls back to the built-in defaults when no `configuration` directory exists, so the
/// binary can run from any working directory.
pub fn load_demo_config() -> anyhow::Result<DemoConfig> {
    let config = match load_config::<DemoConfig>() {
        Ok(config) => config,
        Err(LoadConfigError::MissingConfigurationDirectory(_)) => DemoConfig::default(),
        Err(err) => return Err(err).context("failed to load demo configuration"),
    };

    config
        .validate()
        .context("invalid demo configuration")?;

    Ok(config)
}
