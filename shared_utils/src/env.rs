use crate::config::ConfigError;

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

/// Like [`get_env_var`], but treats a blank value as missing.
///
/// API keys exported as `KEY=` in a shell profile should fail the same way
/// as an unset variable instead of reaching the provider as an empty string.
pub fn get_non_empty_env_var(name: &str) -> Result<String, ConfigError> {
    let value = get_env_var(name)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingEnvVar(name.to_string()));
    }
    Ok(trimmed.to_string())
}
