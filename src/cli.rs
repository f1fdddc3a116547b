//! CLI argument parsing and store configuration.
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::PathBuf;

use crate::{
    config::{
        ConfigOverrides, DEFAULT_CONFIG_FILE, JsonFileConfigProvider,
        OverrideConfigProvider,
    },
    store::{client::RetryOptions, files::DEFAULT_API_URL},
};

/// Global CLI arguments for repository configuration and debugging.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    /// JSON settings file with GITHUB_USERNAME, GITHUB_REPO, GITHUB_BRANCH
    /// and GITHUB_TOKEN. Re-read before every operation.
    pub config: PathBuf,

    #[arg(long, default_value = "", global = true)]
    /// Repository owner. Overrides the settings file.
    pub github_username: String,

    #[arg(long, default_value = "", global = true)]
    /// Repository name. Overrides the settings file.
    pub github_repo: String,

    #[arg(long, default_value = "", global = true)]
    /// Branch to read from and commit to. Overrides the settings file.
    pub github_branch: String,

    #[arg(long, default_value = "", global = true)]
    /// GitHub personal access token. Falls back to the settings file, then
    /// the GITHUB_TOKEN env var.
    pub github_token: String,

    #[arg(long, default_value = DEFAULT_API_URL, global = true)]
    /// GitHub REST API base URL. Use https://<host>/api/v3 for Enterprise.
    pub api_url: String,

    #[arg(long, default_value_t = 3, global = true)]
    /// Physical attempts per API call, including the first.
    pub max_attempts: u32,

    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// File store subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List markdown files on the configured branch.
    List,

    /// Print a file's decoded content and sha.
    Read {
        /// Repository path of the file.
        path: String,
    },

    /// Create a file, or update it when --sha is given.
    Write {
        /// Repository path of the file.
        path: String,

        #[arg(long)]
        /// Local file to upload. Reads stdin when omitted.
        file: Option<PathBuf>,

        #[arg(long)]
        /// Sha of the remote copy being replaced.
        sha: Option<String>,
    },

    /// Delete a file.
    Delete {
        /// Repository path of the file.
        path: String,

        #[arg(long)]
        /// Current sha of the remote file.
        sha: Option<String>,
    },

    /// Check API health, repository access and listing.
    Check,
}

impl Args {
    /// Settings file layered under any values passed on the command line.
    pub fn config_provider(
        &self,
    ) -> OverrideConfigProvider<JsonFileConfigProvider> {
        let token = if self.github_token.is_empty() {
            None
        } else {
            Some(SecretString::from(self.github_token.clone()))
        };

        OverrideConfigProvider::new(
            JsonFileConfigProvider::new(&self.config),
            ConfigOverrides {
                username: Some(self.github_username.clone()),
                repo: Some(self.github_repo.clone()),
                branch: Some(self.github_branch.clone()),
                token,
            },
        )
    }

    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions {
            max_attempts: self.max_attempts.max(1),
            ..RetryOptions::default()
        }
    }
}
