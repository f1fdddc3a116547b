//! Resilient storage of markdown files in a GitHub repository.
//!
//! [`FileStore`] lists, reads, writes and deletes files through the GitHub
//! contents API. Every call re-reads configuration, retries transient
//! failures, waits out rate limits and reports failures as a closed set of
//! [`StoreError`] kinds.
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod result;
pub mod store;

pub use config::{
    ConfigProvider, JsonFileConfigProvider, OverrideConfigProvider,
    StaticConfigProvider, StoreConfig,
};
pub use error::{FailureKind, Outcome, StoreError};
pub use store::{
    client::{ApiClient, RetryOptions},
    files::FileStore,
    types::{FileContent, FileRecord, RateLimitState, RepoAccess, probe_report},
};

#[cfg(test)]
pub mod test_helpers;
