//! Markdown file CRUD against the GitHub contents API.
//!
//! The store holds no state between calls. Target and credential come from
//! the [`ConfigProvider`] at the start of every operation, and concurrent
//! writers are reconciled by GitHub's compare-and-swap on the file `sha`.
use base64::{Engine, prelude::BASE64_STANDARD};
use log::*;
use reqwest::{Method, Url};
use secrecy::SecretString;
use std::{future::Future, sync::Arc};

use crate::{
    config::{ConfigProvider, RepositoryTarget, StoreConfig},
    error::{Outcome, StoreError},
    store::{
        client::{ApiClient, RetryOptions},
        endpoint,
        preflight::Preflight,
        transport::ApiRequest,
        types::{
            ContentChange, ContentChangeResponse, ContentEntry, ContentFile,
            FileContent, FileRecord, RateLimitState, RepoAccess,
        },
    },
};

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com/";

/// Repository-backed store of markdown files.
pub struct FileStore {
    config: Arc<dyn ConfigProvider>,
    client: ApiClient,
    api_base: Url,
}

impl FileStore {
    /// Store talking to the GitHub API at `api_url` over the network.
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        options: RetryOptions,
        api_url: &str,
    ) -> Outcome<Self> {
        let api_base = Url::parse(api_url)?;
        Ok(Self::with_client(config, ApiClient::new(options)?, api_base))
    }

    pub fn with_client(
        config: Arc<dyn ConfigProvider>,
        client: ApiClient,
        api_base: Url,
    ) -> Self {
        Self {
            config,
            client,
            api_base,
        }
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Markdown files at the top level of the branch, sorted by name.
    pub async fn list_files(&self) -> Outcome<Vec<FileRecord>> {
        self.within_deadline("list", self.list_unbounded()).await
    }

    /// Fetch and decode a single file.
    pub async fn read_file(&self, path: &str) -> Outcome<FileContent> {
        let path = normalize_path(path)?;
        self.within_deadline("read", self.read_unbounded(path)).await
    }

    /// Create `path` when `expected_sha` is `None`, otherwise update it,
    /// provided the remote copy still has that sha.
    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        expected_sha: Option<&str>,
    ) -> Outcome<FileRecord> {
        let path = normalize_path(path)?;
        self.within_deadline(
            "write",
            self.write_unbounded(path, content, expected_sha),
        )
        .await
    }

    /// Delete `path`. The current sha is mandatory so a delete can never
    /// race past an edit the caller has not seen.
    pub async fn delete_file(&self, path: &str, sha: Option<&str>) -> Outcome<()> {
        let path = normalize_path(path)?;

        let sha = match sha.map(str::trim) {
            Some(sha) if !sha.is_empty() => sha,
            _ => {
                return Err(StoreError::ChecksumRequired(format!(
                    "file sha is required to delete {path}"
                )));
            }
        };

        self.within_deadline("delete", self.delete_unbounded(path, sha))
            .await
    }

    /// API reachability and remaining quota.
    pub async fn check_health(&self) -> Outcome<RateLimitState> {
        self.within_deadline("health check", async {
            let config = self.current_config()?;
            let token = config.credential()?;
            self.preflight().check_health(token).await
        })
        .await
    }

    /// What the configured token may do with the configured repository.
    pub async fn check_repo_access(&self) -> Outcome<RepoAccess> {
        self.within_deadline("access check", async {
            let (target, token) = self.resolve()?;
            self.preflight().check_repo_access(&target, &token).await
        })
        .await
    }

    /// Bound a whole operation, preflight and retries included, by the
    /// configured deadline.
    async fn within_deadline<T>(
        &self,
        operation: &str,
        work: impl Future<Output = Outcome<T>>,
    ) -> Outcome<T> {
        let deadline = self.client.options().operation_deadline;

        match tokio::time::timeout(deadline, work).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("{operation} exceeded deadline of {}s", deadline.as_secs());
                Err(StoreError::Timeout(format!(
                    "{operation} did not complete within {}s",
                    deadline.as_secs()
                )))
            }
        }
    }

    async fn list_unbounded(&self) -> Outcome<Vec<FileRecord>> {
        let (target, token) = self.resolve()?;

        let mut url = endpoint(
            &self.api_base,
            ["repos", target.owner.as_str(), target.repo.as_str(), "contents"],
        )?;
        url.query_pairs_mut().append_pair("ref", &target.branch);

        let request = ApiRequest::new(Method::GET, url, &token)?;
        let body = self.client.execute(request).await?;
        let entries: Vec<ContentEntry> = serde_json::from_value(body)?;

        let mut files: Vec<FileRecord> = entries
            .into_iter()
            .filter(ContentEntry::is_markdown_file)
            .map(|entry| FileRecord {
                name: entry.name,
                path: entry.path,
                sha: entry.sha,
            })
            .collect();

        files.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(
            "found {} markdown files in {}/{}@{}",
            files.len(),
            target.owner,
            target.repo,
            target.branch
        );

        Ok(files)
    }

    async fn read_unbounded(&self, path: &str) -> Outcome<FileContent> {
        let (target, token) = self.resolve()?;

        let mut url = self.contents_url(&target, path)?;
        url.query_pairs_mut().append_pair("ref", &target.branch);

        let request = ApiRequest::new(Method::GET, url, &token)?;
        let body = self
            .client
            .execute(request)
            .await
            .map_err(|err| file_failure(err, path))?;

        if body.is_array() {
            return Err(StoreError::unexpected(format!(
                "{path} is a directory, not a file"
            )));
        }

        let file: ContentFile = serde_json::from_value(body)?;

        if file.encoding != "base64" {
            return Err(StoreError::unexpected(format!(
                "{path} cannot be inlined (encoding: {})",
                if file.encoding.is_empty() {
                    "none"
                } else {
                    file.encoding.as_str()
                }
            )));
        }

        let encoded: String =
            file.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64_STANDARD.decode(encoded)?;
        let content = String::from_utf8(bytes)?;

        Ok(FileContent {
            path: file.path,
            content,
            sha: file.sha,
        })
    }

    async fn write_unbounded(
        &self,
        path: &str,
        content: &str,
        expected_sha: Option<&str>,
    ) -> Outcome<FileRecord> {
        let (target, token) = self.resolve()?;

        self.preflight().ensure_writable(&target, &token).await?;

        let change = ContentChange {
            message: format!("docs: update {path}"),
            content: Some(BASE64_STANDARD.encode(content.as_bytes())),
            branch: target.branch.clone(),
            sha: expected_sha.map(str::to_string),
        };

        info!(
            "{} {path} on {}/{}@{}",
            if expected_sha.is_some() { "updating" } else { "creating" },
            target.owner,
            target.repo,
            target.branch
        );

        let url = self.contents_url(&target, path)?;
        let request = ApiRequest::new(Method::PUT, url, &token)?
            .json(serde_json::to_value(&change)?);
        let body = self
            .client
            .execute(request)
            .await
            .map_err(|err| file_failure(err, path))?;

        let response: ContentChangeResponse = serde_json::from_value(body)?;
        let written = response.content.ok_or_else(|| {
            StoreError::unexpected(format!("no content returned for {path}"))
        })?;

        Ok(FileRecord {
            name: written.name,
            path: written.path,
            sha: written.sha,
        })
    }

    async fn delete_unbounded(&self, path: &str, sha: &str) -> Outcome<()> {
        let (target, token) = self.resolve()?;

        self.preflight().ensure_writable(&target, &token).await?;

        let change = ContentChange {
            message: format!("docs: delete {path}"),
            content: None,
            branch: target.branch.clone(),
            sha: Some(sha.to_string()),
        };

        info!(
            "deleting {path} from {}/{}@{}",
            target.owner, target.repo, target.branch
        );

        let url = self.contents_url(&target, path)?;
        let request = ApiRequest::new(Method::DELETE, url, &token)?
            .json(serde_json::to_value(&change)?);
        self.client
            .execute(request)
            .await
            .map_err(|err| file_failure(err, path))?;

        Ok(())
    }

    fn preflight(&self) -> Preflight<'_> {
        Preflight::new(&self.client, &self.api_base)
    }

    fn current_config(&self) -> Outcome<StoreConfig> {
        self.config.current().map_err(|err| {
            StoreError::unexpected(format!("failed to load configuration: {err:#}"))
        })
    }

    /// Fresh target and credential for this call.
    fn resolve(&self) -> Outcome<(RepositoryTarget, SecretString)> {
        let config = self.current_config()?;
        let token = config.credential()?.clone();
        let target = config.target()?;
        Ok((target, token))
    }

    fn contents_url(&self, target: &RepositoryTarget, path: &str) -> Outcome<Url> {
        let mut segments = vec![
            "repos",
            target.owner.as_str(),
            target.repo.as_str(),
            "contents",
        ];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        endpoint(&self.api_base, segments)
    }
}

/// Strip a leading `./` or `/`. Empty paths and `.` or `..` segments are
/// refused since URL resolution would retarget them.
fn normalize_path(path: &str) -> Outcome<&str> {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.trim_start_matches('/');

    let segments: Vec<&str> =
        trimmed.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(StoreError::unexpected(format!(
            "invalid file path: {path:?}"
        )));
    }

    Ok(trimmed)
}

/// Give 404 and 409 on a single file their own failure kinds.
fn file_failure(err: StoreError, path: &str) -> StoreError {
    match err {
        StoreError::ApiError { status: 404, .. } => {
            StoreError::NotFound(format!("{path} not found"))
        }
        StoreError::ApiError {
            status: 409,
            message,
            ..
        } => StoreError::Conflict(format!(
            "{path} was changed remotely since it was loaded: {message}"
        )),
        other => other,
    }
}
