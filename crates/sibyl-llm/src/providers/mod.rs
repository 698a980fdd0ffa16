pub mod anthropic;
pub mod openai;

use sibyl_core::config::ModelConfig;
use sibyl_core::error::{Result, SibylError};

/// Resolve the API key for a provider: explicit config value first, then the
/// provider's conventional environment variable.
pub(crate) fn resolve_api_key(config: &ModelConfig, env_var: &str) -> Result<String> {
    if let Some(ref key) = config.api_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }
    std::env::var(env_var)
        .map_err(|_| SibylError::Config(format!("No API key: set model.api_key or {}", env_var)))
}
