//! Config loading with JSON-path context in error messages.
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

fn with_path<'de, D, T>(de: D) -> Result<T, ConfigError>
where
    D: serde::Deserializer<'de, Error = serde_json::Error>,
    T: DeserializeOwned,
{
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        ConfigError { path, source: err.into_inner() }
    })
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, ConfigError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    let value = with_path(&mut *de)?;
    de.end().map_err(|source| ConfigError { path: ".".to_string(), source })?;
    Ok(value)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ConfigError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    let value = with_path(&mut *de)?;
    de.end().map_err(|source| ConfigError { path: ".".to_string(), source })?;
    Ok(value)
}

/// Reads and deserializes a JSON config file (`GlobalOption`, `MapOption`, `CompilerConfig`).
pub fn from_file_with_path<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    use anyhow::Context;
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    from_slice_with_path(&bytes).with_context(|| format!("invalid config file {}", path.display()))
}
