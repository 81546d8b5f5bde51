use crate::desktop::{DEFAULT_LINE_LIMIT, SectionMode};
use crate::scan::ScanOptions;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GeneralConfig {
    /// Command prefix for `Terminal=true` entries, e.g. "foot -e"
    #[serde(default)]
    pub terminal: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScanConfig {
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_line_limit")]
    pub line_limit: usize,
    #[serde(default = "default_true")]
    pub actions: bool,
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,
}

fn default_line_limit() -> usize { DEFAULT_LINE_LIMIT }
fn default_true() -> bool { true }

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            line_limit: default_line_limit(),
            actions: default_true(),
            extra_dirs: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn options(&self) -> ScanOptions {
        ScanOptions {
            workers: self.workers,
            line_limit: self.line_limit,
            mode: if self.actions { SectionMode::Actions } else { SectionMode::MainOnly },
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FilterConfig {
    /// Regexes matched against entry names
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl FilterConfig {
    pub fn compile(&self) -> Result<Vec<Regex>> {
        self.blacklist
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("invalid blacklist pattern '{}'", pattern))
            })
            .collect()
    }
}

pub fn config_path() -> PathBuf {
    match ProjectDirs::from("org", "deskscan", "deskscan") {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Loads `path`, or the default location when `None`. A missing file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

    if !config_path.exists() {
        debug!("No config at {:?}, using defaults", config_path);
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(config.general.terminal.is_none());
        assert_eq!(config.scan.line_limit, DEFAULT_LINE_LIMIT);
        assert!(config.scan.actions);
        assert_eq!(config.scan.options().mode, SectionMode::Actions);
    }

    #[test]
    fn reads_every_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[general]
terminal = "foot -e"

[scan]
workers = 3
line_limit = 1024
actions = false
extra_dirs = ["/opt/apps"]

[filter]
blacklist = ["^Avahi"]
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.general.terminal.as_deref(), Some("foot -e"));
        let options = config.scan.options();
        assert_eq!(options.workers, 3);
        assert_eq!(options.line_limit, 1024);
        assert_eq!(options.mode, SectionMode::MainOnly);
        assert_eq!(config.scan.extra_dirs, vec![PathBuf::from("/opt/apps")]);
        let patterns = config.filter.compile().unwrap();
        assert!(patterns[0].is_match("Avahi SSH Server Browser"));
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[scan\nworkers = ").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let filter = FilterConfig {
            blacklist: vec!["(".to_string()],
        };
        assert!(filter.compile().is_err());
    }
}
