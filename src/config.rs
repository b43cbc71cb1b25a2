//! Configuration management for certinspect.
//!
//! Settings come from three layers, merged in order of increasing priority:
//!
//! 1. Default values
//! 2. Configuration file (`certinspect.toml` or the file given with `--config`)
//! 3. Command-line arguments
//!
//! The merged [`Config`] is then resolved into an [`InspectConfig`], the
//! immutable value the inspector runs with. Presets are expanded at that
//! point, so the formatter only ever sees a plain field list.
//!
//! # Example Configuration File
//!
//! ```toml
//! host = "example.com"
//! port = 8443
//! sni = true
//! fields = ["header", "cn", "san", "verifychain"]
//! timeout = 10
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Host, Url};

use crate::connector::DEFAULT_TIMEOUT;
use crate::fields::{FieldRequest, Preset, DEFAULT_FIELDS};

/// Default TLS port.
pub const DEFAULT_PORT: u16 = 443;

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "certinspect.toml";

/// Layered configuration.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Host to inspect, or a URL whose host (and port) are used
    pub host: Option<String>,
    /// TCP port
    pub port: Option<u16>,
    /// Send the host name as SNI
    pub sni: Option<bool>,
    /// Fields to print, in order
    pub fields: Option<Vec<String>>,
    /// Replaces `fields` entirely: "all" or "expiry"
    pub preset: Option<String>,
    /// Network timeout in seconds, 0 disables it
    pub timeout: Option<u64>,
}

/// Resolved, validated settings for one inspection run.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectConfig {
    pub host: String,
    pub port: u16,
    pub use_sni: bool,
    pub fields: FieldRequest,
    pub timeout: Option<Duration>,
}

impl InspectConfig {
    /// Settings for `host` with every other value at its default.
    pub fn new(host: impl Into<String>) -> Self {
        InspectConfig {
            host: host.into(),
            port: DEFAULT_PORT,
            use_sni: true,
            fields: FieldRequest::parse(DEFAULT_FIELDS),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT)),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// * `ConfigError::Io` - File could not be read
    /// * `ConfigError::Parse` - File contains invalid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Default values for everything but the host.
    pub fn defaults() -> Self {
        Config {
            host: None,
            port: Some(DEFAULT_PORT),
            sni: Some(true),
            fields: Some(DEFAULT_FIELDS.split(',').map(String::from).collect()),
            preset: None,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// A preset in `other` also clears any field list set by lower layers, so
    /// `--all` on the command line wins over `fields` in the file, and
    /// explicit fields in `other` clear a lower layer's preset.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.sni.is_some() {
            self.sni = other.sni;
        }
        if other.fields.is_some() {
            self.fields = other.fields;
            self.preset = None;
        }
        if other.preset.is_some() {
            self.preset = other.preset;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        self
    }

    /// Creates a Config from command-line arguments for merging.
    ///
    /// Only provided arguments (Some values) override other layers. `output`
    /// is the comma separated field list; when both `all` and `expiry` are
    /// set, `expiry` wins.
    pub fn from_cli_args(
        host: Option<String>,
        port: Option<u16>,
        sni: Option<bool>,
        output: Option<String>,
        all: bool,
        expiry: bool,
        timeout: Option<u64>,
    ) -> Self {
        let preset = if expiry {
            Some(Preset::Expiry.to_string())
        } else if all {
            Some(Preset::All.to_string())
        } else {
            None
        };
        Config {
            host,
            port,
            sni,
            fields: output.map(|list| list.split(',').map(String::from).collect()),
            preset,
            timeout,
        }
    }

    /// Validates the merged layers and expands presets.
    ///
    /// # Errors
    ///
    /// * `ConfigError::Validation` - no host, an unparsable host URL, or an
    ///   unknown preset name
    pub fn resolve(self) -> Result<InspectConfig, ConfigError> {
        let raw_host = self
            .host
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ConfigError::Validation("You must specify a hostname".to_string()))?;
        let (host, url_port) = split_host(raw_host.trim())?;

        let fields = match self.preset {
            Some(name) => name
                .parse::<Preset>()
                .map_err(|_| ConfigError::Validation(format!("unknown preset '{}'", name)))?
                .fields(),
            None => match self.fields {
                Some(list) => FieldRequest::from_identifiers(list),
                None => FieldRequest::parse(DEFAULT_FIELDS),
            },
        };

        let timeout = match self.timeout.unwrap_or(DEFAULT_TIMEOUT) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(InspectConfig {
            host,
            port: self.port.or(url_port).unwrap_or(DEFAULT_PORT),
            use_sni: self.sni.unwrap_or(true),
            fields,
            timeout,
        })
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            host: Some("example.com".to_string()),
            port: Some(DEFAULT_PORT),
            sni: Some(true),
            fields: Some(
                ["header", "cn", "san", "expiry", "chain", "verifychain"]
                    .iter()
                    .map(|f| f.to_string())
                    .collect(),
            ),
            preset: None,
            timeout: Some(DEFAULT_TIMEOUT),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Splits `https://host:port/...` style input; plain hosts pass through.
fn split_host(raw: &str) -> Result<(String, Option<u16>), ConfigError> {
    if !raw.contains("://") {
        return Ok((raw.to_string(), None));
    }
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::Validation(format!("invalid host URL '{}': {}", raw, e)))?;
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => {
            return Err(ConfigError::Validation(format!(
                "host URL '{}' has no host",
                raw
            )))
        }
    };
    Ok((host, url.port_or_known_default()))
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("IO Error: {0}")]
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    #[error("Parse Error: {0}")]
    Parse(String),
    /// Validation error (missing required fields, invalid values, etc.)
    #[error("Validation Error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Field, FieldSpec};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
            host = "jpbd.dev"
            port = 8443
            sni = false
            fields = ["cn", "verifychain"]
            timeout = 5
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.host, Some("jpbd.dev".to_string()));
        assert_eq!(config.port, Some(8443));
        assert_eq!(config.sni, Some(false));
        assert_eq!(
            config.fields,
            Some(vec!["cn".to_string(), "verifychain".to_string()])
        );
        assert_eq!(config.preset, None);
        assert_eq!(config.timeout, Some(5));
    }

    #[test]
    fn test_config_merge() {
        let base_config = Config {
            host: Some("base.com".to_string()),
            port: Some(443),
            sni: Some(true),
            fields: Some(vec!["cn".to_string()]),
            preset: None,
            timeout: Some(30),
        };

        let override_config = Config {
            host: Some("override.com".to_string()),
            port: None,
            sni: Some(false),
            fields: None,
            preset: None,
            timeout: None,
        };

        let merged = base_config.merge_with(override_config);

        assert_eq!(merged.host, Some("override.com".to_string()));
        assert_eq!(merged.port, Some(443)); // From base (not overridden)
        assert_eq!(merged.sni, Some(false));
        assert_eq!(merged.fields, Some(vec!["cn".to_string()]));
        assert_eq!(merged.timeout, Some(30));
    }

    #[test]
    fn test_layer_fields_and_presets_replace_each_other() {
        let file = Config {
            preset: Some("all".to_string()),
            ..Config::default()
        };
        let cli = Config {
            fields: Some(vec!["cn".to_string()]),
            ..Config::default()
        };
        let merged = Config::defaults().merge_with(file).merge_with(cli);
        assert_eq!(merged.preset, None);

        let cli = Config::from_cli_args(None, None, None, None, true, false, None);
        let merged = Config::defaults().merge_with(cli);
        assert_eq!(merged.preset, Some("all".to_string()));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();

        assert_eq!(config.host, None);
        assert_eq!(config.port, Some(443));
        assert_eq!(config.sni, Some(true));
        assert_eq!(config.timeout, Some(30));
        assert!(config.preset.is_none());
    }

    #[test]
    fn test_config_from_cli_args() {
        let config = Config::from_cli_args(
            Some("cli.com".to_string()),
            Some(8443),
            Some(false),
            Some("cn,san".to_string()),
            false,
            false,
            Some(3),
        );

        assert_eq!(config.host, Some("cli.com".to_string()));
        assert_eq!(config.port, Some(8443));
        assert_eq!(config.sni, Some(false));
        assert_eq!(config.fields, Some(vec!["cn".to_string(), "san".to_string()]));
        assert_eq!(config.timeout, Some(3));

        let both = Config::from_cli_args(None, None, None, None, true, true, None);
        assert_eq!(both.preset, Some("expiry".to_string()));
    }

    #[test]
    fn test_resolve_requires_host() {
        let err = Config::defaults().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let blank = Config {
            host: Some("  ".to_string()),
            ..Config::defaults()
        };
        assert!(blank.resolve().is_err());
    }

    #[test]
    fn test_resolve_defaults() {
        let config = Config {
            host: Some("example.com".to_string()),
            ..Config::defaults()
        }
        .resolve()
        .unwrap();

        assert_eq!(config, InspectConfig::new("example.com"));
        assert_eq!(config.fields, FieldRequest::parse("header,cn,san"));
    }

    #[test]
    fn test_resolve_presets() {
        let expiry = Config {
            host: Some("example.com".to_string()),
            preset: Some("expiry".to_string()),
            ..Config::defaults()
        }
        .resolve()
        .unwrap();
        assert_eq!(expiry.fields, Preset::Expiry.fields());

        let bad = Config {
            host: Some("example.com".to_string()),
            preset: Some("everything".to_string()),
            ..Config::defaults()
        };
        assert!(matches!(bad.resolve(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_resolve_keeps_unknown_fields() {
        let config = Config {
            host: Some("example.com".to_string()),
            fields: Some(vec!["CN".to_string(), "bogus".to_string()]),
            ..Config::defaults()
        }
        .resolve()
        .unwrap();
        let fields: Vec<_> = config.fields.iter().cloned().collect();
        assert_eq!(
            fields,
            vec![
                FieldSpec::Builtin(Field::Cn),
                FieldSpec::Unknown("bogus".to_string())
            ]
        );
    }

    #[test]
    fn test_resolve_url_host() {
        let config = Config {
            host: Some("https://secure.example.com:9443/login".to_string()),
            port: None,
            ..Config::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.host, "secure.example.com");
        assert_eq!(config.port, 9443);

        let explicit = Config {
            host: Some("https://secure.example.com".to_string()),
            port: Some(8443),
            ..Config::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(explicit.port, 8443);

        let v6 = Config {
            host: Some("https://[::1]/".to_string()),
            ..Config::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(v6.host, "::1");
        assert_eq!(v6.port, 443);
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = Config {
            host: Some("example.com".to_string()),
            timeout: Some(0),
            ..Config::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_invalid_toml() {
        let invalid_toml = "host = [invalid toml";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::from_file(temp_file.path());
        assert!(result.is_err());

        match result.unwrap_err() {
            ConfigError::Parse(_) => {} // Expected
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/certinspect.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_example_toml_generation() {
        let example = Config::example_toml();

        // Should be valid TOML
        let parsed: Config = toml::from_str(&example).unwrap();

        assert_eq!(parsed.host, Some("example.com".to_string()));
        assert!(parsed.fields.is_some());
        assert!(parsed.resolve().is_ok());
    }
}
