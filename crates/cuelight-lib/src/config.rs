//! Application configuration: TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::led::{Rgba, parse_color};

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# cuelight configuration. Changes made outside the tool may be overwritten.\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Request exclusive lighting control for every device on connect.
    #[serde(default)]
    pub exclusive_access: bool,

    /// Default color for `set` when none is given (hex or name). Default: "#FFFFFF".
    #[serde(default = "default_fill_color")]
    pub fill_color: String,

    /// Path to a simulated host profile (TOML). Empty = no profile.
    #[serde(default)]
    pub host_profile: String,

    /// Restore the saved LED colors before disconnecting.
    #[serde(default = "default_true")]
    pub restore_on_exit: bool,
}

fn default_fill_color() -> String {
    "#FFFFFF".into()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exclusive_access: false,
            fill_color: default_fill_color(),
            host_profile: String::new(),
            restore_on_exit: true,
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The `fill_color` field could not be parsed as a color.
    InvalidColor(String),
    /// The `host_profile` path does not point to a readable file.
    InvalidProfilePath { path: String, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidColor(e) => write!(f, "Invalid fill color: {e}"),
            ValidationError::InvalidProfilePath { path, reason } => {
                write!(f, "Invalid host profile {path}: {reason}")
            }
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cuelight"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Save config to the default platform path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ));
        };
        self.save_to(&path)
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// The fill color, parsed.
    pub fn fill_rgba(&self) -> crate::error::Result<Rgba> {
        parse_color(&self.fill_color)
    }

    /// The host profile path, if one is configured.
    pub fn host_profile_path(&self) -> Option<PathBuf> {
        let trimmed = self.host_profile.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Validate all config fields, collecting every problem.
    ///
    /// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all problems found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.fill_rgba() {
            errors.push(ValidationError::InvalidColor(e.to_string()));
        }

        if let Some(path) = self.host_profile_path() {
            let reason = match std::fs::metadata(&path) {
                Ok(meta) if meta.is_file() => None,
                Ok(_) => Some("not a file".to_string()),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = reason {
                errors.push(ValidationError::InvalidProfilePath {
                    path: path.display().to_string(),
                    reason,
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ──

    #[test]
    fn defaults() {
        let c = Config::default();
        assert!(!c.exclusive_access);
        assert_eq!(c.fill_color, "#FFFFFF");
        assert!(c.host_profile.is_empty());
        assert!(c.restore_on_exit);
    }

    #[test]
    fn serialize_roundtrip() {
        let c = Config {
            exclusive_access: true,
            fill_color: "red".into(),
            host_profile: "/tmp/host.toml".into(),
            restore_on_exit: false,
        };
        let toml_str = toml::to_string_pretty(&c).unwrap();
        let c2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("exclusive_access = true").unwrap();
        assert!(c.exclusive_access);
        assert_eq!(c.fill_color, "#FFFFFF");
        assert!(c.restore_on_exit);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn wrong_type_toml_is_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("restore_on_exit = \"sometimes\"");
        assert!(result.is_err());
    }

    #[test]
    fn config_path_ends_with_toml() {
        if let Some(path) = Config::path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
            assert!(path.parent().unwrap().ends_with("cuelight"));
        }
    }

    // ── Persistence ──

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let c = Config {
            fill_color: "#00FF00".into(),
            ..Config::default()
        };
        c.save_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# cuelight configuration"));
        assert!(!path.with_extension("toml.tmp").exists());

        let (loaded, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(loaded, c);
    }

    #[test]
    fn load_missing_file_gives_defaults_silently() {
        let dir = tempfile::tempdir().unwrap();
        let (c, warnings) = Config::load_from(&dir.path().join("absent.toml"));
        assert_eq!(c, Config::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn load_malformed_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert_eq!(c, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"));
    }

    // ── Validation ──

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_invalid_color() {
        let c = Config {
            fill_color: "chartreuse".into(),
            ..Config::default()
        };
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], ValidationError::InvalidColor(_)));
    }

    #[test]
    fn validate_collects_all_errors() {
        let c = Config {
            fill_color: "#12".into(),
            host_profile: "/definitely/not/here.toml".into(),
            ..Config::default()
        };
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 2);
        assert!(matches!(errs[1], ValidationError::InvalidProfilePath { .. }));
    }

    #[test]
    fn validate_profile_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let c = Config {
            host_profile: dir.path().display().to_string(),
            ..Config::default()
        };
        let errs = c.validate().unwrap_err();
        assert!(errs[0].to_string().contains("not a file"));
    }

    #[test]
    fn blank_profile_is_none() {
        let c = Config {
            host_profile: "   ".into(),
            ..Config::default()
        };
        assert!(c.host_profile_path().is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn fill_rgba_parses_names() {
        let c = Config {
            fill_color: "blue".into(),
            ..Config::default()
        };
        assert_eq!(c.fill_rgba().unwrap(), Rgba::rgb(0, 0, 255));
    }
}
