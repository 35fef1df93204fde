use std::str::FromStr;

use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// An environment variable is set but cannot be parsed into the requested type.
#[derive(Debug, Error)]
#[error("Invalid value for environment variable {name}: {value:?}")]
pub struct InvalidEnvVarError {
    /// Variable name.
    pub name: String,
    /// Raw value that failed to parse.
    pub value: String,
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables. Empty values are
/// treated as missing.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Reads an optional environment variable (`None` when unset or empty).
pub fn get_env_var_opt(name: &str) -> Option<String> {
    get_env_var(name).ok()
}

/// Reads and parses an optional environment variable.
pub fn parse_env_var<T: FromStr>(name: &str) -> Result<Option<T>, InvalidEnvVarError> {
    match get_env_var_opt(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| InvalidEnvVarError {
            name: name.to_string(),
            value: raw,
        }),
    }
}

/// Loads a `.env` file from the working directory (or its parents) if present.
///
/// Returns the path that was loaded. A missing file is not an error.
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}
