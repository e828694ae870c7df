//! Configuration loader and validator for the follower chat archiver.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_OAUTH: &str = "GRAPHQL_OAUTH";
pub const ENV_INTEGRITY: &str = "GRAPHQL_INTEGRITY";
pub const ENV_DEVICE_ID: &str = "GRAPHQL_DEVICEID";

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub app: App,
    pub gql: Gql,
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    pub followers_file: String,
    pub output_dir: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            followers_file: "followers.json".into(),
            output_dir: "chat_data".into(),
        }
    }
}

/// Fixed shape of the moderation-log query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Gql {
    pub endpoint: String,
    pub client_id: String,
    pub channel_id: String,
    pub operation_name: String,
    pub persisted_query_hash: String,
}

impl Default for Gql {
    fn default() -> Self {
        Self {
            endpoint: "https://gql.twitch.tv/gql".into(),
            client_id: "kimne78kx3ncx6brgo4mv6wki5h1ko".into(),
            channel_id: "56395702".into(),
            operation_name: "ViewerCardModLogsMessagesBySender".into(),
            persisted_query_hash:
                "53962d07438ec66900c0265d3e9ec99c4124067ac3a9c718bc29b0b047d1e89c".into(),
        }
    }
}

/// The three secrets every request carries. Only ever sourced from the
/// environment, never from the YAML file.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub oauth_token: String,
    pub integrity_token: String,
    pub device_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through `lookup`; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnv(key))
        };
        Ok(Self {
            oauth_token: require(ENV_OAUTH)?,
            integrity_token: require(ENV_INTEGRITY)?,
            device_id: require(ENV_DEVICE_ID)?,
        })
    }
}

impl Config {
    pub fn followers_path(&self) -> PathBuf {
        PathBuf::from(&self.app.followers_file)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.app.output_dir)
    }

    /// Apply command line overrides, then re-validate.
    pub fn with_overrides(
        mut self,
        followers_file: Option<&Path>,
        output_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = followers_file {
            self.app.followers_file = path.to_string_lossy().into_owned();
        }
        if let Some(path) = output_dir {
            self.app.output_dir = path.to_string_lossy().into_owned();
        }
        validate(&self)?;
        Ok(self)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is Some, the file must exist.
/// - If `path` is None, `config.yaml` in the working directory is used when
///   present; otherwise the built-in defaults apply.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = match path {
        Some(path) => parse(&fs::read_to_string(path)?)?,
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.exists() {
                parse(&fs::read_to_string(fallback)?)?
            } else {
                Config::default()
            }
        }
    };
    validate(&cfg)?;
    Ok(cfg)
}

fn parse(content: &str) -> Result<Config, ConfigError> {
    // An empty document deserializes to unit, not to a mapping.
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.followers_file.trim().is_empty() {
        return Err(ConfigError::Invalid("app.followers_file must be non-empty"));
    }
    if cfg.app.output_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.output_dir must be non-empty"));
    }

    if cfg.gql.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("gql.endpoint must be non-empty"));
    }
    if Url::parse(&cfg.gql.endpoint).is_err() {
        return Err(ConfigError::Invalid("gql.endpoint must be a valid URL"));
    }
    if cfg.gql.client_id.trim().is_empty() {
        return Err(ConfigError::Invalid("gql.client_id must be non-empty"));
    }
    if cfg.gql.channel_id.trim().is_empty() {
        return Err(ConfigError::Invalid("gql.channel_id must be non-empty"));
    }
    if cfg.gql.operation_name.trim().is_empty() {
        return Err(ConfigError::Invalid("gql.operation_name must be non-empty"));
    }
    if cfg.gql.persisted_query_hash.trim().is_empty() {
        return Err(ConfigError::Invalid("gql.persisted_query_hash must be non-empty"));
    }

    Ok(())
}

/// Returns the example YAML content, equal to the built-in defaults.
pub fn example() -> &'static str {
    r#"app:
  followers_file: "followers.json"
  output_dir: "chat_data"

gql:
  endpoint: "https://gql.twitch.tv/gql"
  client_id: "kimne78kx3ncx6brgo4mv6wki5h1ko"
  channel_id: "56395702"
  operation_name: "ViewerCardModLogsMessagesBySender"
  persisted_query_hash: "53962d07438ec66900c0265d3e9ec99c4124067ac3a9c718bc29b0b047d1e89c"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_example_matches_defaults() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = parse("app:\n  output_dir: \"out\"\n").unwrap();
        assert_eq!(cfg.app.output_dir, "out");
        assert_eq!(cfg.app.followers_file, "followers.json");
        assert_eq!(cfg.gql, Gql::default());
    }

    #[test]
    fn invalid_gql_fields() {
        let mut cfg = Config::default();
        cfg.gql.channel_id = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("gql.channel_id")), _ => panic!("wrong error") }

        let mut cfg = Config::default();
        cfg.gql.endpoint = "not a url".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("valid URL")), _ => panic!("wrong error") }

        let mut cfg = Config::default();
        cfg.gql.persisted_query_hash = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn overrides_replace_paths() {
        let cfg = Config::default()
            .with_overrides(Some(Path::new("users.json")), Some(Path::new("logs")))
            .unwrap();
        assert_eq!(cfg.followers_path(), PathBuf::from("users.json"));
        assert_eq!(cfg.output_dir(), PathBuf::from("logs"));

        let err = Config::default()
            .with_overrides(None, Some(Path::new("")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("output_dir")));
    }

    #[test]
    fn credentials_require_all_three() {
        let env = env_of(&[(ENV_OAUTH, "oauth"), (ENV_INTEGRITY, "integrity")]);
        let err = Credentials::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ENV_DEVICE_ID)));
        assert!(err.to_string().contains("GRAPHQL_DEVICEID"));
    }

    #[test]
    fn credentials_reject_blank_values() {
        let env = env_of(&[(ENV_OAUTH, "  "), (ENV_INTEGRITY, "i"), (ENV_DEVICE_ID, "d")]);
        let err = Credentials::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ENV_OAUTH)));
    }

    #[test]
    fn credentials_debug_redacts_tokens() {
        let env = env_of(&[(ENV_OAUTH, "secret-oauth"), (ENV_INTEGRITY, "secret-int"), (ENV_DEVICE_ID, "dev")]);
        let creds = Credentials::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(creds.oauth_token, "secret-oauth");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("dev"));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, "gql:\n  channel_id: \"123\"\n").unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.gql.channel_id, "123");
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let td = tempdir().unwrap();
        let err = load(Some(&td.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
