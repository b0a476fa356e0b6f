mod settings;

use config::{Config, ConfigError, Environment, File};

use crate::config::settings::PartialSettings;

pub use settings::{BrokerSettings, DatasetSettings, LoggingSettings, ServerSettings, Settings};

/// Default location of the optional configuration file (extension optional).
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Prefix of the environment variables that override file settings, e.g.
/// `LOGSTREAM_BROKER__TOPIC=audit`.
pub const ENV_PREFIX: &str = "LOGSTREAM";

/// Loads the configuration from the default file and environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Loads the configuration from `path` (if it exists) and environment
/// variables, merged over the defaults.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_onto(Settings::default()))
}

#[cfg(test)]
mod tests;
