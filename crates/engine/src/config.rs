//! Loading build configuration from disk and the environment.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use vpcimage_types::BuildConfig;

/// Environment variables consulted for the API key, in priority order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["IBM_API_KEY", "IC_API_KEY"];

/// Read a YAML or JSON configuration file and apply environment overrides.
///
/// The result is not validated; call [`BuildConfig::validate`] once every
/// override has been layered on.
pub fn load_build_config(path: impl AsRef<Path>) -> Result<BuildConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).with_context(|| format!("read build configuration {}", path.display()))?;
    let mut config = parse_build_config(&content).with_context(|| format!("parse build configuration {}", path.display()))?;
    apply_environment_overrides(&mut config);
    debug!(path = %path.display(), region = %config.region, image_name = %config.image_name, "loaded build configuration");
    Ok(config)
}

/// Parse configuration text. JSON is accepted as a subset of YAML.
pub fn parse_build_config(content: &str) -> Result<BuildConfig> {
    let config: BuildConfig = serde_yaml::from_str(content).context("invalid build configuration document")?;
    Ok(config)
}

/// Fill the API key from the environment when the file does not carry one.
pub fn apply_environment_overrides(config: &mut BuildConfig) {
    if config.api_key().is_some() {
        return;
    }
    for name in API_KEY_ENV_VARS {
        if let Ok(value) = std::env::var(name)
            && !value.trim().is_empty()
        {
            debug!(source = name, "using API key from environment");
            config.api_key = Some(value);
            return;
        }
    }
}
