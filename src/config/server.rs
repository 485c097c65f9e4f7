use std::path::Path;

use figment::providers::{Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::options::Options;

/// Configuration of the demo server binary.
///
/// The `staging` section holds the programmatic options; `STAGING_*`
/// environment variables are layered underneath it when the gate is built.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub staging: Options,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: default_bind_address(),
            logging: LoggingConfig::default(),
            staging: Options::default(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

/// Load the server config from a YAML file. A missing file yields the
/// defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<ServerConfig, figment::Error> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ServerConfig::default());
    }
    Figment::new().merge(Yaml::file(path)).extract()
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(ServerConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
