//! Optional config file loading. Search order: ./mediumconv.toml, then
//! $XDG_CONFIG_HOME/mediumconv/config.toml (or ~/.config/mediumconv/config.toml).
//!
//! `config set|get|reset` edit the user file (the second location).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCAL_FILE: &str = "mediumconv.toml";
const APP_DIR: &str = "mediumconv";
const USER_FILE: &str = "config.toml";

/// Keys accepted by `config set|get|reset`, in display order.
pub const KEYS: &[&str] = &[
    "output_dir",
    "default_format",
    "concurrency",
    "user_agent",
    "timeout_secs",
    "cookie",
    "html_template",
    "latex_template",
    "epub_ncx",
    "llm_provider",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("No user config directory on this platform")]
    NoConfigDir,

    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key '{key}'. Known keys: {}", KEYS.join(", "))]
    UnknownKey { key: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Default output directory when -o is not set. Paths are relative to CWD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Format used when --format is not given (default: markdown).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
    /// Worker threads for `batch` (default: 4).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// HTTP User-Agent header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Raw Cookie header for member-only articles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
    /// Path to a minijinja template replacing the built-in HTML page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_template: Option<PathBuf>,
    /// Path to a minijinja template replacing the built-in LaTeX document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latex_template: Option<PathBuf>,
    /// Include toc.ncx in EPUB output for legacy readers (default: true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epub_ncx: Option<bool>,
    /// Preferred provider shown by `list-providers`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
}

impl Config {
    /// Current value of `key` as a string, or None when unset.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "output_dir" => self.output_dir.as_ref().map(|p| p.display().to_string()),
            "default_format" => self.default_format.clone(),
            "concurrency" => self.concurrency.map(|n| n.to_string()),
            "user_agent" => self.user_agent.clone(),
            "timeout_secs" => self.timeout_secs.map(|n| n.to_string()),
            "cookie" => self.cookie.clone(),
            "html_template" => self.html_template.as_ref().map(|p| p.display().to_string()),
            "latex_template" => self.latex_template.as_ref().map(|p| p.display().to_string()),
            "epub_ncx" => self.epub_ncx.map(|b| b.to_string()),
            "llm_provider" => self.llm_provider.clone(),
            _ => return Err(unknown(key)),
        };
        Ok(value)
    }

    /// Parse and store `value` under `key`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "output_dir" => self.output_dir = Some(PathBuf::from(value)),
            "default_format" => {
                if crate::export::Format::from_id(value).is_none() {
                    return Err(invalid(key, value, "not a known output format"));
                }
                self.default_format = Some(value.to_lowercase());
            }
            "concurrency" => {
                let n: usize = value
                    .parse()
                    .map_err(|_| invalid(key, value, "expected a positive integer"))?;
                if n == 0 {
                    return Err(invalid(key, value, "must be at least 1"));
                }
                self.concurrency = Some(n);
            }
            "user_agent" => self.user_agent = Some(value.to_string()),
            "timeout_secs" => {
                self.timeout_secs = Some(
                    value
                        .parse()
                        .map_err(|_| invalid(key, value, "expected a number of seconds"))?,
                )
            }
            "cookie" => self.cookie = Some(value.to_string()),
            "html_template" => self.html_template = Some(PathBuf::from(value)),
            "latex_template" => self.latex_template = Some(PathBuf::from(value)),
            "epub_ncx" => {
                self.epub_ncx = Some(match value.to_lowercase().as_str() {
                    "true" | "yes" | "1" => true,
                    "false" | "no" | "0" => false,
                    _ => return Err(invalid(key, value, "expected true or false")),
                })
            }
            "llm_provider" => {
                if crate::providers::Provider::from_id(value).is_none() {
                    return Err(invalid(key, value, "not a known provider"));
                }
                self.llm_provider = Some(value.to_lowercase());
            }
            _ => return Err(unknown(key)),
        }
        Ok(())
    }

    /// Remove `key` so the built-in default applies again.
    pub fn reset(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "output_dir" => self.output_dir = None,
            "default_format" => self.default_format = None,
            "concurrency" => self.concurrency = None,
            "user_agent" => self.user_agent = None,
            "timeout_secs" => self.timeout_secs = None,
            "cookie" => self.cookie = None,
            "html_template" => self.html_template = None,
            "latex_template" => self.latex_template = None,
            "epub_ncx" => self.epub_ncx = None,
            "llm_provider" => self.llm_provider = None,
            _ => return Err(unknown(key)),
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Read a config file. A missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        std::fs::write(path, self.to_toml()?).map_err(write_err)
    }
}

fn unknown(key: &str) -> ConfigError {
    ConfigError::UnknownKey {
        key: key.to_string(),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// The per-user file edited by `config set|get|reset`.
pub fn user_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join(USER_FILE))
        .ok_or(ConfigError::NoConfigDir)
}

/// Search order: (1) ./mediumconv.toml, (2) the user config file.
/// Missing files return Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<(PathBuf, Config)>, ConfigError> {
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    let mut paths = vec![cwd.join(LOCAL_FILE)];
    if let Ok(user) = user_config_path() {
        paths.push(user);
    }
    for path in paths {
        if path.exists() {
            let config = Config::load_from(&path)?;
            log::debug!("loaded config from {}", path.display());
            return Ok(Some((path, config)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn parse_empty_config() -> Result<(), Box<dyn Error>> {
        let c: Config = toml::from_str("")?;
        assert_eq!(c, Config::default());
        for key in KEYS {
            assert_eq!(c.get(key)?, None);
        }
        Ok(())
    }

    #[test]
    fn parse_full_config() -> Result<(), Box<dyn Error>> {
        let s = r#"
            output_dir = "out"
            default_format = "epub"
            concurrency = 8
            user_agent = "Custom/1.0"
            timeout_secs = 60
            cookie = "sid=1"
            html_template = "page.html"
            latex_template = "doc.tex"
            epub_ncx = false
            llm_provider = "anthropic"
        "#;
        let c: Config = toml::from_str(s)?;
        assert_eq!(c.output_dir.as_deref(), Some(Path::new("out")));
        assert_eq!(c.default_format.as_deref(), Some("epub"));
        assert_eq!(c.concurrency, Some(8));
        assert_eq!(c.timeout_secs, Some(60));
        assert_eq!(c.epub_ncx, Some(false));
        assert_eq!(c.get("html_template")?.as_deref(), Some("page.html"));
        assert_eq!(c.get("llm_provider")?.as_deref(), Some("anthropic"));
        Ok(())
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("output_dir = [").is_err());
    }

    #[test]
    fn set_parses_typed_values() -> Result<(), ConfigError> {
        let mut c = Config::default();
        c.set("concurrency", "3")?;
        c.set("epub_ncx", "no")?;
        c.set("default_format", "MD")?;
        assert_eq!(c.concurrency, Some(3));
        assert_eq!(c.epub_ncx, Some(false));
        assert_eq!(c.get("default_format")?.as_deref(), Some("md"));
        Ok(())
    }

    #[test]
    fn set_rejects_bad_values_and_unknown_keys() {
        let mut c = Config::default();
        assert!(matches!(
            c.set("concurrency", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            c.set("default_format", "pdf"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            c.set("llm_provider", "nobody"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            c.set("request_delay", "1"),
            Err(ConfigError::UnknownKey { .. })
        ));
        assert!(matches!(c.get("nope"), Err(ConfigError::UnknownKey { .. })));
        assert!(matches!(c.reset("nope"), Err(ConfigError::UnknownKey { .. })));
        assert_eq!(c, Config::default());
    }

    #[test]
    fn save_and_reload_round_trip() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        assert_eq!(Config::load_from(&path)?, Config::default());

        let mut c = Config::default();
        c.set("output_dir", "articles")?;
        c.set("timeout_secs", "10")?;
        c.save_to(&path)?;
        let mut back = Config::load_from(&path)?;
        assert_eq!(back, c);

        back.reset("timeout_secs")?;
        assert_eq!(back.timeout_secs, None);
        assert!(!back.to_toml()?.contains("timeout_secs"));
        Ok(())
    }
}
