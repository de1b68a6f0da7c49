use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::messages::Locale;
use crate::paths::expand_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot resolve configuration path {0}: home directory unavailable")]
    HomeDirectory(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Largest accepted include nesting depth
pub const MAX_INCLUDE_DEPTH_LIMIT: usize = 1024;

/// How relative `include`/`import` locations of the schema are resolved
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum IncludeResolution {
    /// Compile from memory with the working directory switched to the schema's directory
    #[default]
    #[serde(rename = "working-dir")]
    #[value(name = "working-dir")]
    WorkingDirectory,
    /// Compile with the schema path as explicit base URI; the working directory is untouched
    #[serde(rename = "base-uri")]
    #[value(name = "base-uri")]
    BaseUri,
}

/// What to do with a schema whose local references form a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircularIncludePolicy {
    /// Fail with the cycle path before compiling
    #[default]
    Reject,
    /// Leave cycles to the engine
    Allow,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub schema: SchemaConfig,
    pub output: OutputConfig,
}

/// Schema loading configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    pub include_resolution: IncludeResolution,
    pub circular_includes: CircularIncludePolicy,
    /// Deepest accepted chain of local schema references
    pub max_include_depth: usize,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbose: bool,
    /// Verbose output plus debug details
    pub debug: bool,
    pub quiet: bool,
    pub locale: Locale,
    /// Colour terminal output
    pub color: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            include_resolution: IncludeResolution::WorkingDirectory,
            circular_includes: CircularIncludePolicy::Reject,
            max_include_depth: 64,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            verbose: false,
            debug: false,
            quiet: false,
            locale: Locale::En,
            color: true,
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.output.quiet {
            VerbosityLevel::Quiet
        } else if self.output.debug {
            VerbosityLevel::Debug
        } else if self.output.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    const CONFIG_NAMES: [&'static str; 4] = [
        "validate-xml-xsd.toml",
        "validate-xml-xsd.json",
        ".validate-xml-xsd.toml",
        ".validate-xml-xsd.json",
    ];

    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider)
    }

    pub fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let mut config = match &cli.config {
            Some(path) => {
                let path = expand_home(path).map_err(|_| ConfigError::HomeDirectory(path.clone()))?;
                Self::load_from_file(&path)?
            }
            None => Self::find_config_file()?.unwrap_or_default(),
        };

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading configuration file");

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Result<Option<Config>> {
        let mut candidates: Vec<PathBuf> = Self::CONFIG_NAMES.iter().map(PathBuf::from).collect();
        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("validate-xml-xsd");
            candidates.extend(Self::CONFIG_NAMES.iter().map(|name| app_config_dir.join(name)));
        }

        match candidates.into_iter().find(|path| path.is_file()) {
            Some(path) => Ok(Some(Self::load_from_file(&path)?)),
            None => Ok(None),
        }
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Schema settings
        if let Some(mode) = env.get("VALIDATE_XML_XSD_INCLUDE_RESOLUTION") {
            config.schema.include_resolution = match mode.to_lowercase().as_str() {
                "working-dir" => IncludeResolution::WorkingDirectory,
                "base-uri" => IncludeResolution::BaseUri,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid VALIDATE_XML_XSD_INCLUDE_RESOLUTION value: {}",
                        mode
                    )));
                }
            };
        }

        if let Some(policy) = env.get("VALIDATE_XML_XSD_CIRCULAR_INCLUDES") {
            config.schema.circular_includes = match policy.to_lowercase().as_str() {
                "reject" => CircularIncludePolicy::Reject,
                "allow" => CircularIncludePolicy::Allow,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid VALIDATE_XML_XSD_CIRCULAR_INCLUDES value: {}",
                        policy
                    )));
                }
            };
        }

        if let Some(depth) = env.get("VALIDATE_XML_XSD_MAX_INCLUDE_DEPTH") {
            config.schema.max_include_depth = depth.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid VALIDATE_XML_XSD_MAX_INCLUDE_DEPTH value: {}",
                    depth
                ))
            })?;
        }

        // Output settings
        if let Some(format) = env.get("VALIDATE_XML_XSD_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormat::Human,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid VALIDATE_XML_XSD_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        if let Some(verbose) = env.get("VALIDATE_XML_XSD_VERBOSE") {
            config.output.verbose = parse_bool("VALIDATE_XML_XSD_VERBOSE", &verbose)?;
        }

        if let Some(quiet) = env.get("VALIDATE_XML_XSD_QUIET") {
            config.output.quiet = parse_bool("VALIDATE_XML_XSD_QUIET", &quiet)?;
        }

        if let Some(color) = env.get("VALIDATE_XML_XSD_COLOR") {
            config.output.color = parse_bool("VALIDATE_XML_XSD_COLOR", &color)?;
        }

        if let Some(lang) = env.get("VALIDATE_XML_XSD_LANG") {
            config.output.locale = lang.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid VALIDATE_XML_XSD_LANG value: {}", lang))
            })?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (explicit CLI flags take precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(mode) = cli.include_resolution {
            config.schema.include_resolution = mode;
        }
        if cli.allow_circular_includes {
            config.schema.circular_includes = CircularIncludePolicy::Allow;
        }

        if let Some(format) = cli.format {
            config.output.format = format;
        }
        if let Some(lang) = cli.lang {
            config.output.locale = lang;
        }
        if cli.verbose > 0 {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.verbose > 1 {
            config.output.debug = true;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
            config.output.debug = false;
        }
        if cli.no_color {
            config.output.color = false;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.schema.max_include_depth == 0 {
            return Err(ConfigError::Validation(
                "Include depth must be greater than 0".to_string(),
            ));
        }
        if config.schema.max_include_depth > MAX_INCLUDE_DEPTH_LIMIT {
            return Err(ConfigError::Validation(format!(
                "Include depth cannot exceed {}",
                MAX_INCLUDE_DEPTH_LIMIT
            )));
        }

        if config.output.quiet && (config.output.verbose || config.output.debug) {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn new() -> Self {
            Self::default()
        }

        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["validate-xml-xsd"];
        full.extend_from_slice(args);
        Cli::try_parse_normalized(full).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(
            config.schema.include_resolution,
            IncludeResolution::WorkingDirectory
        );
        assert_eq!(config.schema.circular_includes, CircularIncludePolicy::Reject);
        assert_eq!(config.schema.max_include_depth, 64);

        assert_eq!(config.output.format, OutputFormat::Human);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);
        assert!(config.output.color);
        assert_eq!(config.output.locale, Locale::En);
        assert_eq!(config.verbosity(), VerbosityLevel::Normal);
    }

    #[test]
    fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let toml_content = r#"
[schema]
include_resolution = "base-uri"
circular_includes = "allow"
max_include_depth = 8

[output]
format = "json"
verbose = true
locale = "ru"
color = false
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();

        assert_eq!(config.schema.include_resolution, IncludeResolution::BaseUri);
        assert_eq!(config.schema.circular_includes, CircularIncludePolicy::Allow);
        assert_eq!(config.schema.max_include_depth, 8);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert!(!config.output.quiet);
        assert_eq!(config.output.locale, Locale::Ru);
        assert!(!config.output.color);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[output]\nquiet = true\n").unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();
        assert!(config.output.quiet);
        assert_eq!(config.schema, SchemaConfig::default());
        assert_eq!(config.verbosity(), VerbosityLevel::Quiet);
    }

    #[test]
    fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let json_content = r#"{
  "schema": { "include_resolution": "working-dir", "max_include_depth": 4 },
  "output": { "format": "human", "quiet": true }
}"#;
        fs::write(&config_path, json_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();
        assert_eq!(config.schema.max_include_depth, 4);
        assert!(config.output.quiet);
    }

    #[test]
    fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "invalid: yaml").unwrap();

        match ConfigManager::load_from_file(&config_path).unwrap_err() {
            ConfigError::UnsupportedFormat(ext) => assert_eq!(ext, "yaml"),
            other => panic!("Expected UnsupportedFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid toml [[[").unwrap();

        let result = ConfigManager::load_from_file(&config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::TomlParsing(_)));
    }

    #[test]
    fn test_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ invalid json }").unwrap();

        let result = ConfigManager::load_from_file(&config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::JsonParsing(_)));
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("VALIDATE_XML_XSD_INCLUDE_RESOLUTION", "base-uri");
        mock_env.set("VALIDATE_XML_XSD_CIRCULAR_INCLUDES", "allow");
        mock_env.set("VALIDATE_XML_XSD_MAX_INCLUDE_DEPTH", "12");
        mock_env.set("VALIDATE_XML_XSD_FORMAT", "json");
        mock_env.set("VALIDATE_XML_XSD_VERBOSE", "true");
        mock_env.set("VALIDATE_XML_XSD_COLOR", "false");
        mock_env.set("VALIDATE_XML_XSD_LANG", "ru");

        let config =
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).unwrap();

        assert_eq!(config.schema.include_resolution, IncludeResolution::BaseUri);
        assert_eq!(config.schema.circular_includes, CircularIncludePolicy::Allow);
        assert_eq!(config.schema.max_include_depth, 12);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert!(!config.output.color);
        assert_eq!(config.output.locale, Locale::Ru);
    }

    #[test]
    fn test_invalid_environment_values() {
        for (key, value) in [
            ("VALIDATE_XML_XSD_MAX_INCLUDE_DEPTH", "deep"),
            ("VALIDATE_XML_XSD_FORMAT", "xml"),
            ("VALIDATE_XML_XSD_QUIET", "yes"),
            ("VALIDATE_XML_XSD_LANG", "fr"),
        ] {
            let mut mock_env = MockEnvProvider::new();
            mock_env.set(key, value);

            let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
            assert!(
                matches!(result, Err(ConfigError::Environment(_))),
                "{} = {} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_merge_with_cli() {
        let cli = cli(&[
            "-xml",
            "doc.xml",
            "-xsd",
            "schema.xsd",
            "-vv",
            "--format",
            "json",
            "--lang",
            "ru",
            "--include-resolution",
            "base-uri",
            "--allow-circular-includes",
            "--no-color",
        ]);
        let config = ConfigManager::merge_with_cli(Config::default(), &cli);

        assert_eq!(config.schema.include_resolution, IncludeResolution::BaseUri);
        assert_eq!(config.schema.circular_includes, CircularIncludePolicy::Allow);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.locale, Locale::Ru);
        assert!(!config.output.color);
        assert_eq!(config.verbosity(), VerbosityLevel::Debug);
    }

    #[test]
    fn test_cli_without_flags_keeps_file_values() {
        let mut base = Config::default();
        base.output.format = OutputFormat::Json;
        base.schema.include_resolution = IncludeResolution::BaseUri;

        let config = ConfigManager::merge_with_cli(base.clone(), &cli(&[]));
        assert_eq!(config, base);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.schema.max_include_depth = 0;
        assert!(ConfigManager::validate_config(&config).is_err());

        config.schema.max_include_depth = MAX_INCLUDE_DEPTH_LIMIT + 1;
        assert!(ConfigManager::validate_config(&config).is_err());

        config.schema.max_include_depth = 64;
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_integration() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(
            &config_path,
            "[schema]\nmax_include_depth = 5\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let mut mock_env = MockEnvProvider::new();
        mock_env.set("VALIDATE_XML_XSD_FORMAT", "human");

        let cli = cli(&["--config", config_path.to_str().unwrap(), "-v"]);
        let config = ConfigManager::load_config_with(&cli, &mock_env).unwrap();

        // file value survives, environment beats file, CLI adds verbosity
        assert_eq!(config.schema.max_include_depth, 5);
        assert_eq!(config.output.format, OutputFormat::Human);
        assert_eq!(config.verbosity(), VerbosityLevel::Verbose);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = cli(&["--config", "/nonexistent/validate-xml-xsd.toml"]);
        let result = ConfigManager::load_config_with(&cli, &MockEnvProvider::new());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
