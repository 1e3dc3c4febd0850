use thiserror::Error;

/// Errors related to application configuration.
///
/// Every variant is fatal: it is raised before any network activity and
/// aborts the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// A credential for the named provider was not supplied.
    #[error("Missing credential for provider '{0}'")]
    MissingCredential(String),

    /// A batch run was requested with nothing to fetch.
    #[error("Parameter list is empty")]
    EmptyParameterList,

    /// A configuration value is outside its allowed range.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("Failed to load configuration from {path}: {reason}")]
    Load { path: String, reason: String },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_display_names_field() {
        let err = ConfigError::invalid("schedule.window_size", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid value for `schedule.window_size`: must be at least 1"
        );
    }
}
