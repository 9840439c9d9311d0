//! Configuration loading from disk and the command line.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::cli::CliArgs;
use crate::config::schema::FrontendConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a configuration document without validating it.
pub fn parse_config(content: &str) -> Result<FrontendConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<FrontendConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build the effective configuration: file values (if any), then CLI
/// overrides, then validation.
pub fn resolve_config(args: &CliArgs) -> Result<FrontendConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => FrontendConfig::default(),
    };

    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
cache_data_path = "/var/lib/frontend"

[server]
listen_address = "127.0.0.1:9481"

[search]
max_concurrent_requests = 4
max_queue_duration_ms = 250

[storage]
nodes = ["storage-1:8401", "storage-2:8401"]
"#;

    #[test]
    fn parses_partial_document_with_defaults() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.server.listen_address, "127.0.0.1:9481");
        assert_eq!(config.search.concurrency(), 4);
        assert_eq!(config.search.max_queue_duration_ms, 250);
        assert_eq!(config.search.max_query_duration_ms, 30_000);
        assert_eq!(config.storage.nodes.len(), 2);
        assert_eq!(config.cache_data_path.as_deref(), Some("/var/lib/frontend"));
    }

    #[test]
    fn load_rejects_missing_nodes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nlisten_address = \"127.0.0.1:9481\"").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors, vec![ValidationError::NoStorageNodes]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            max_concurrent_requests: Some(9),
            storage_nodes: vec!["override:8401".into()],
            ..CliArgs::default()
        };

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.search.concurrency(), 9);
        assert_eq!(config.storage.nodes, vec!["override:8401".to_string()]);
        assert_eq!(config.server.listen_address, "127.0.0.1:9481");
    }
}
