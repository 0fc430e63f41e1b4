//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ErrorBodyPolicy, LogFormat, RedirectPolicy};
    use std::io::Write;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config = parse_config(
            r#"
            [upstream]
            origin = "https://app.example.net"
            public_origin = "https://www.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.redirect_policy, RedirectPolicy::Manual);
        assert_eq!(config.upstream.error_body, ErrorBodyPolicy::Passthrough);
        assert_eq!(config.timeouts.upstream_secs, 25);
        assert_eq!(config.routing.reserved_prefix, "/_relay");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_policies_parse_lowercase() {
        let config = parse_config(
            r#"
            [upstream]
            redirect_policy = "follow"
            error_body = "synthesize"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.redirect_policy, RedirectPolicy::Follow);
        assert_eq!(config.upstream.error_body, ErrorBodyPolicy::Synthesize);
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = parse_config("[upstream]\nredirect_policy = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_values_are_validation_error() {
        let err = parse_config("[timeouts]\nupstream_secs = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "timeouts.upstream_secs");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"127.0.0.1:9999\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9999");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
