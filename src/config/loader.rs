use crate::config::schema::{RulesetConfig, ValidationError};
use crate::ruleset::Ruleset;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    /// `ruleset` is `meta.name`, empty when the file does not set one.
    Validation {
        path: Option<PathBuf>,
        ruleset: String,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = Some(path.to_path_buf());
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml { path, source },
            ConfigError::Validation {
                path: None,
                ruleset,
                source,
            } => ConfigError::Validation {
                path,
                ruleset,
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read ruleset from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse ruleset TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse ruleset TOML: {}", source),
            },
            ConfigError::Validation {
                path,
                ruleset,
                source,
            } => {
                let name = if ruleset.is_empty() {
                    "ruleset".to_string()
                } else {
                    format!("ruleset '{ruleset}'")
                };
                match path {
                    Some(path) => write!(f, "{name} ({}) is invalid:", path.display())?,
                    None => write!(f, "{name} is invalid:")?,
                }
                for issue in &source.issues {
                    write!(f, "\n  - {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse the raw TOML form without validating it.
pub fn parse_config(input: &str) -> Result<RulesetConfig, ConfigError> {
    toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml { path: None, source })
}

/// Parse, validate and compile a ruleset from TOML text.
pub fn load_from_str(input: &str) -> Result<Ruleset, ConfigError> {
    let config = parse_config(input)?;
    let ruleset = config.meta.name.clone();
    Ruleset::try_from(config).map_err(|source| ConfigError::Validation {
        path: None,
        ruleset,
        source,
    })
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Ruleset, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}
