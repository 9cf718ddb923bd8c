use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::mail::DEFAULT_MAX_DEPTH;

/// Environment variable overriding `forward_to`.
pub const FORWARD_TO_ENV: &str = "FORWARD_TO_ADDRESS";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Comma-separated destination addresses.
    #[serde(default)]
    pub forward_to: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    pub storage_root: Option<String>,
    pub dispatch_endpoint: Option<String>,
    pub dispatch_token: Option<String>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forward_to: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            storage_root: None,
            dispatch_endpoint: None,
            dispatch_token: None,
        }
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Applies environment overrides using `lookup` (normally `std::env::var`).
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addrs) = lookup(FORWARD_TO_ENV) {
            self.forward_to = addrs;
        }
        self
    }

    pub fn forward_to_addresses(&self) -> Vec<String> {
        split_csv(&self.forward_to)
    }

    pub fn storage_root(&self) -> PathBuf {
        PathBuf::from(self.storage_root.as_deref().unwrap_or("."))
    }
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("rs_mail_forwarder"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    p.push("config.toml");
    Ok(p)
}

/// Loads `path`, or the default config file when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        return Ok(Config::from_toml(&s)?.with_env(env_var));
    }

    let path = config_path()?;
    if path.exists() {
        let s = fs::read_to_string(&path)?;
        return Ok(Config::from_toml(&s)?.with_env(env_var));
    }

    // No file: environment alone is enough
    if env_var(FORWARD_TO_ENV).is_some() {
        return Ok(Config::default().with_env(env_var));
    }

    // create a template config for users to edit
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let sample = Config {
        forward_to: "you@example.com".to_string(),
        storage_root: Some("/var/spool/rs_mail_forwarder".to_string()),
        dispatch_endpoint: Some("https://mail-api.example.com/v1/send".to_string()),
        ..Config::default()
    };
    fs::write(&path, toml::to_string_pretty(&sample)?)?;
    Err(anyhow::anyhow!(
        "Created template config at {}, edit it and run again",
        path.display()
    ))
}
