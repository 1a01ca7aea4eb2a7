mod settings;

use config::{Config, Environment, File};

use crate::utils::error::Result;

pub use settings::{
    ClientSettings, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_URL,
    PartialReconnectSettings, PartialSettings, ReconnectSettings,
};

/// Environment variable prefix, e.g. `POPSUB__RECONNECT__DELAY_MS=250`.
pub const ENV_PREFIX: &str = "POPSUB";

/// Loads the configuration from `config/client` and `POPSUB__*` environment
/// variables, merged over the defaults.
pub fn load_config() -> Result<ClientSettings> {
    load_config_from("config/client")
}

/// Same as [`load_config`] with an explicit settings file (extension optional).
///
/// Source and type errors surface as `SessionError::Config`.
pub fn load_config_from(path: &str) -> Result<ClientSettings> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(ClientSettings::default().merge(partial))
}

#[cfg(test)]
mod tests;
