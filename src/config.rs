//! Repository configuration and the providers that supply it.
//!
//! The store never caches configuration: it asks its [`ConfigProvider`] for
//! the current values at the start of every operation, so a changed token or
//! target takes effect on the very next call.
use color_eyre::eyre::Context;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

#[cfg(test)]
use mockall::automock;

use crate::{
    error::{Outcome, StoreError},
    result::Result,
};

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
/// Branch used when none is configured.
pub const DEFAULT_BRANCH: &str = "main";
/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Identifies the remote collection of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// Snapshot of the repository settings at the time of a call.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Repository owner (user or organisation).
    pub username: Option<String>,
    /// Repository name.
    pub repo: Option<String>,
    /// Branch to read from and commit to.
    pub branch: Option<String>,
    /// Access token. `None` means "not configured".
    pub token: Option<SecretString>,
}

impl StoreConfig {
    pub fn new(
        username: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: Option<SecretString>,
    ) -> Self {
        Self {
            username: non_empty(username.into()),
            repo: non_empty(repo.into()),
            branch: non_empty(branch.into()),
            token: token
                .map(|t| t.expose_secret().trim().to_string())
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
        }
    }

    /// Resolve the repository target or report what is missing.
    pub fn target(&self) -> Outcome<RepositoryTarget> {
        match (self.username.as_deref(), self.repo.as_deref()) {
            (Some(owner), Some(repo)) => Ok(RepositoryTarget {
                owner: owner.to_string(),
                repo: repo.to_string(),
                branch: self
                    .branch
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            }),
            _ => Err(StoreError::config_missing(
                "GitHub username or repository not configured",
            )),
        }
    }

    /// Resolve the access token or report that it is missing.
    pub fn credential(&self) -> Outcome<&SecretString> {
        self.token
            .as_ref()
            .ok_or_else(|| StoreError::config_missing("GitHub token not configured"))
    }
}

/// Source of repository settings, consulted on every store operation.
#[cfg_attr(test, automock)]
pub trait ConfigProvider: Send + Sync {
    fn current(&self) -> Result<StoreConfig>;
}

/// Raw layout of the settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    #[serde(rename = "GITHUB_USERNAME")]
    username: String,
    #[serde(rename = "GITHUB_REPO")]
    repo: String,
    #[serde(rename = "GITHUB_BRANCH")]
    branch: String,
    #[serde(rename = "GITHUB_TOKEN")]
    token: String,
}

/// Reads settings from a JSON file on every call.
#[derive(Debug, Clone)]
pub struct JsonFileConfigProvider {
    path: PathBuf,
}

impl JsonFileConfigProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for JsonFileConfigProvider {
    fn current(&self) -> Result<StoreConfig> {
        let file = if self.path.exists() {
            let content = fs::read_to_string(&self.path).wrap_err_with(|| {
                format!("failed to read {}", self.path.display())
            })?;
            serde_json::from_str::<ConfigFile>(&content).wrap_err_with(
                || format!("failed to parse {}", self.path.display()),
            )?
        } else {
            log::debug!(
                "no config file at {}: using defaults",
                self.path.display()
            );
            ConfigFile::default()
        };

        let mut token = file.token;

        if token.is_empty()
            && let Ok(value) = env::var(TOKEN_ENV_VAR)
        {
            token = value;
        }

        Ok(StoreConfig::new(
            file.username,
            file.repo,
            file.branch,
            Some(SecretString::from(token)),
        ))
    }
}

/// Always returns the same settings.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: StoreConfig,
}

impl StaticConfigProvider {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn current(&self) -> Result<StoreConfig> {
        Ok(self.config.clone())
    }
}

/// Values that take precedence over whatever the wrapped provider returns.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub username: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub token: Option<SecretString>,
}

/// Applies [`ConfigOverrides`] on top of another provider on each call.
pub struct OverrideConfigProvider<P: ConfigProvider> {
    inner: P,
    overrides: ConfigOverrides,
}

impl<P: ConfigProvider> OverrideConfigProvider<P> {
    pub fn new(inner: P, overrides: ConfigOverrides) -> Self {
        Self { inner, overrides }
    }
}

impl<P: ConfigProvider> ConfigProvider for OverrideConfigProvider<P> {
    fn current(&self) -> Result<StoreConfig> {
        let mut config = self.inner.current()?;
        let overrides = &self.overrides;

        if let Some(username) = overrides.username.clone().and_then(non_empty) {
            config.username = Some(username);
        }
        if let Some(repo) = overrides.repo.clone().and_then(non_empty) {
            config.repo = Some(repo);
        }
        if let Some(branch) = overrides.branch.clone().and_then(non_empty) {
            config.branch = Some(branch);
        }
        if let Some(token) = overrides
            .token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
        {
            config.token = Some(token.clone());
        }

        Ok(config)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
