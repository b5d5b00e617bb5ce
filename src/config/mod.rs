pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, parse_config, ConfigError};
pub use schema::{
    ChangeDefinition, MatchSpec, Metadata, RuleDefinition, RulesetConfig, ValidationError,
    ValidationIssue,
};
