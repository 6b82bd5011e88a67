//! Configuration management.
//!
//! [`SarathiConfig`] is built once at process start and passed to every
//! component that needs it. Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `SARATHI_CONFIG_PATH`, or the platform config dir)
//! 3. Environment variables (including those loaded from `.env`)
//!
//! | Setting | Env var | TOML key |
//! |---------|---------|----------|
//! | JSON store | `TIL_JSON_PATH` | `til_json_path` |
//! | Blog root | `BLOG_PATH` | `blog_path` |
//! | Page template | `TIL_TEMPLATE_PATH`, `TIL_JINJA_TEMPLATE_PATH` | `template_path` |
//! | Rendered page | `TIL_FILE_PATH` | `page_path` |
//! | Testing mode | `TESTING` | `testing` |
//! | Fortune binary | `FORTUNE_PATH` | `fortune_path` |
//! | Title fetch timeout | `SARATHI_FETCH_TIMEOUT_SECS` | `fetch_timeout_secs` |
//! | Git remote | `SARATHI_GIT_REMOTE` | `git.remote` |
//! | Git token | `SARATHI_GIT_TOKEN` | `git.token` |
//! | Log format | `SARATHI_LOG_FORMAT` | `logging.format` |
//! | Log file | `SARATHI_LOG_FILE` | `logging.file` |

use crate::observability::LogFormat;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Default timeout for page title lookups.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Main configuration for sarathi.
#[derive(Debug, Clone)]
pub struct SarathiConfig {
    /// Path to the TIL JSON store.
    pub til_json_path: PathBuf,
    /// Root of the blog's git work tree.
    pub blog_path: PathBuf,
    /// Path to the page template.
    pub template_path: PathBuf,
    /// Path the rendered page is written to.
    pub page_path: PathBuf,
    /// When set, nothing is persisted or published.
    pub testing: bool,
    /// The `fortune` program.
    pub fortune_path: PathBuf,
    /// Timeout for page title lookups.
    pub fetch_timeout: Duration,
    /// Git publishing settings.
    pub git: GitSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Git publishing settings.
#[derive(Debug, Clone)]
pub struct GitSettings {
    /// Remote to pull from and push to.
    pub remote: String,
    /// Token for HTTPS remotes. SSH remotes use the agent.
    pub token: Option<String>,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            token: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// JSON store path.
    pub til_json_path: Option<String>,
    /// Blog root.
    pub blog_path: Option<String>,
    /// Page template path.
    pub template_path: Option<String>,
    /// Rendered page path.
    pub page_path: Option<String>,
    /// Testing mode.
    pub testing: Option<bool>,
    /// Fortune binary.
    pub fortune_path: Option<String>,
    /// Title fetch timeout in seconds.
    pub fetch_timeout_secs: Option<u64>,
    /// Git section.
    pub git: Option<ConfigFileGit>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Git section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileGit {
    /// Remote name.
    pub remote: Option<String>,
    /// Push token.
    pub token: Option<String>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl SarathiConfig {
    /// Loads configuration from file and process environment, then validates it.
    ///
    /// An explicit `path` wins over `SARATHI_CONFIG_PATH`, which wins over
    /// the platform config directory. A missing default file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a config file cannot be read or parsed,
    /// or if the resulting configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => ConfigFile::load(path)?,
            None => match std::env::var("SARATHI_CONFIG_PATH") {
                Ok(p) if !p.trim().is_empty() => ConfigFile::load(Path::new(&p))?,
                _ => ConfigFile::load_default()?,
            },
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Builds configuration from a parsed file and an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required paths are missing, values do
    /// not parse, or the store or page lies outside the blog root.
    pub fn from_sources(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let required = |env_keys: &[&str], file_value: Option<String>, name: &str| {
            env_keys
                .iter()
                .find_map(|key| env(key))
                .or(file_value)
                .map(PathBuf::from)
                .ok_or_else(|| {
                    Error::Config(format!("{name} is not set (environment: {})", env_keys[0]))
                })
        };

        let til_json_path = required(&["TIL_JSON_PATH"], file.til_json_path, "TIL store path")?;
        let blog_path = required(&["BLOG_PATH"], file.blog_path, "blog path")?;
        let template_path = required(
            &["TIL_TEMPLATE_PATH", "TIL_JINJA_TEMPLATE_PATH"],
            file.template_path,
            "page template path",
        )?;
        let page_path = required(&["TIL_FILE_PATH"], file.page_path, "page path")?;

        let testing = match env("TESTING") {
            Some(v) => parse_bool(&v),
            None => file.testing.unwrap_or(false),
        };

        let fortune_path = env("FORTUNE_PATH")
            .or(file.fortune_path)
            .map_or_else(|| PathBuf::from("fortune"), PathBuf::from);

        let fetch_timeout = match env("SARATHI_FETCH_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(v.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("SARATHI_FETCH_TIMEOUT_SECS '{v}' is not a number: {e}"))
            })?),
            None => file
                .fetch_timeout_secs
                .map_or(DEFAULT_FETCH_TIMEOUT, Duration::from_secs),
        };

        let file_git = file.git.unwrap_or_default();
        let git = GitSettings {
            remote: env("SARATHI_GIT_REMOTE")
                .or(file_git.remote)
                .unwrap_or_else(|| GitSettings::default().remote),
            token: env("SARATHI_GIT_TOKEN").or(file_git.token),
        };

        let file_logging = file.logging.unwrap_or_default();
        let format = match env("SARATHI_LOG_FORMAT").or(file_logging.format) {
            Some(f) => LogFormat::parse(&f)
                .ok_or_else(|| Error::Config(format!("unknown log format '{f}'")))?,
            None => LogFormat::default(),
        };
        let logging = LoggingSettings {
            format,
            file: env("SARATHI_LOG_FILE")
                .or(file_logging.file)
                .map(PathBuf::from),
        };

        let config = Self {
            til_json_path,
            blog_path,
            template_path,
            page_path,
            testing,
            fortune_path,
            fetch_timeout,
            git,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the store and the page live inside the blog root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending path.
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("TIL store", &self.til_json_path),
            ("TIL page", &self.page_path),
        ] {
            if !is_within_root(&self.blog_path, path) {
                return Err(Error::Config(format!(
                    "the {name} {} needs to be in the blog folder {}",
                    path.display(),
                    self.blog_path.display()
                )));
            }
        }
        Ok(())
    }
}

impl ConfigFile {
    /// Loads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("cannot parse config file {}: {e}", path.display()))
        })
    }

    /// Loads `sarathi/config.toml` from the platform config directory.
    ///
    /// Returns an empty config if there is no such file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file exists but is invalid.
    pub fn load_default() -> Result<Self> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        let candidates = [
            base_dirs.config_dir().join("sarathi").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("sarathi")
                .join("config.toml"),
        ];

        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Returns true if `path` is `root` or lies below it.
///
/// Both paths are normalized lexically first, so `..` cannot escape the
/// root. Relative paths are resolved against the current directory.
#[must_use]
pub fn is_within_root(root: &Path, path: &Path) -> bool {
    let root = normalize_lexically(root);
    let path = normalize_lexically(path);
    path.starts_with(&root)
}

/// Makes a path absolute and removes `.` and `..` components without touching the filesystem.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_default()
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                normalized.pop();
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn parse_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("TIL_JSON_PATH", "/srv/blog/assets/til.json"),
            ("BLOG_PATH", "/srv/blog"),
            ("TIL_JINJA_TEMPLATE_PATH", "/etc/sarathi/til.md.tmpl"),
            ("TIL_FILE_PATH", "/srv/blog/pages/til.md"),
        ]
    }

    #[test]
    fn test_from_env() {
        let config = SarathiConfig::from_sources(ConfigFile::default(), env_from(&base_env()))
            .unwrap();
        assert_eq!(config.blog_path, PathBuf::from("/srv/blog"));
        assert_eq!(config.template_path, PathBuf::from("/etc/sarathi/til.md.tmpl"));
        assert!(!config.testing);
        assert_eq!(config.fortune_path, PathBuf::from("fortune"));
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert_eq!(config.git.remote, "origin");
    }

    #[test]
    fn test_env_overrides_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            til_json_path = "/other/til.json"
            blog_path = "/other"
            template_path = "/other/til.tmpl"
            page_path = "/other/til.md"
            testing = true
            fetch_timeout_secs = 3

            [git]
            remote = "upstream"
            "#,
        )
        .unwrap();

        let mut env = base_env();
        env.push(("TESTING", "0"));
        let config = SarathiConfig::from_sources(file, env_from(&env)).unwrap();
        assert_eq!(config.til_json_path, PathBuf::from("/srv/blog/assets/til.json"));
        assert!(!config.testing);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.git.remote, "upstream");
    }

    #[test]
    fn test_missing_required_path() {
        let env: Vec<_> = base_env()
            .into_iter()
            .filter(|(k, _)| *k != "BLOG_PATH")
            .collect();
        let err = SarathiConfig::from_sources(ConfigFile::default(), env_from(&env)).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("BLOG_PATH")));
    }

    #[test]
    fn test_store_outside_blog_root() {
        let mut env = base_env();
        env.retain(|(k, _)| *k != "TIL_JSON_PATH");
        env.push(("TIL_JSON_PATH", "/srv/blog/../secrets/til.json"));
        let err = SarathiConfig::from_sources(ConfigFile::default(), env_from(&env)).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("blog folder")));
    }

    #[test]
    fn test_bad_timeout() {
        let mut env = base_env();
        env.push(("SARATHI_FETCH_TIMEOUT_SECS", "soon"));
        let err = SarathiConfig::from_sources(ConfigFile::default(), env_from(&env)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_is_within_root() {
        let root = Path::new("/srv/blog");
        assert!(is_within_root(root, Path::new("/srv/blog/assets/til.json")));
        assert!(is_within_root(root, Path::new("/srv/blog/./pages/til.md")));
        assert!(!is_within_root(root, Path::new("/srv/blog/../etc/passwd")));
        assert!(!is_within_root(root, Path::new("/srv/blogger/til.json")));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("yes please"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("False"));
    }
}
