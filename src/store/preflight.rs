//! Read-only checks run immediately before every mutation.
//!
//! A write is only attempted when the API answers, enough quota is left for
//! the caller's follow-up calls, and the token can push to the repository.
use log::*;
use reqwest::{Method, Url};
use secrecy::SecretString;

use crate::{
    config::RepositoryTarget,
    error::{Outcome, StoreError},
    store::{
        client::ApiClient,
        endpoint,
        transport::ApiRequest,
        types::{RateLimitResponse, RateLimitState, RepoAccess, RepoResponse},
    },
};

/// Refuse to write when fewer requests than this are left.
pub const MIN_RATE_LIMIT_REMAINING: u64 = 10;
/// Warn when at most `1/LOW_RATE_LIMIT_DIVISOR` of the quota is left.
pub const LOW_RATE_LIMIT_DIVISOR: u64 = 10;

pub struct Preflight<'a> {
    client: &'a ApiClient,
    api_base: &'a Url,
}

impl<'a> Preflight<'a> {
    pub fn new(client: &'a ApiClient, api_base: &'a Url) -> Self {
        Self { client, api_base }
    }

    /// Current core quota from `GET /rate_limit`.
    pub async fn check_health(
        &self,
        token: &SecretString,
    ) -> Outcome<RateLimitState> {
        let url = endpoint(self.api_base, ["rate_limit"])?;
        let request = ApiRequest::new(Method::GET, url, token)?;
        let body = self.client.execute(request).await?;
        let rate: RateLimitResponse = serde_json::from_value(body)?;
        Ok(rate.resources.core)
    }

    /// Permissions of the token on the target from `GET /repos/{owner}/{repo}`.
    /// A 404 means the repository does not exist or is hidden from the token.
    pub async fn check_repo_access(
        &self,
        target: &RepositoryTarget,
        token: &SecretString,
    ) -> Outcome<RepoAccess> {
        let url = endpoint(
            self.api_base,
            ["repos", target.owner.as_str(), target.repo.as_str()],
        )?;
        let request = ApiRequest::new(Method::GET, url, token)?;

        match self.client.execute(request).await {
            Ok(body) => {
                let repo: RepoResponse = serde_json::from_value(body)?;
                Ok(repo.into())
            }
            Err(StoreError::ApiError { status: 404, .. }) => {
                Ok(RepoAccess::missing())
            }
            Err(err) => Err(err),
        }
    }

    /// Full policy applied before a create, update or delete.
    pub async fn ensure_writable(
        &self,
        target: &RepositoryTarget,
        token: &SecretString,
    ) -> Outcome<()> {
        let rate = self.check_health(token).await?;

        if rate.remaining < MIN_RATE_LIMIT_REMAINING {
            let wait = (rate.reset_epoch_secs - self.client.now_epoch_secs())
                .max(0) as u64;
            return Err(StoreError::rate_limited(
                format!(
                    "only {}/{} API requests remaining",
                    rate.remaining, rate.limit
                ),
                wait,
            ));
        }

        if rate.is_low(LOW_RATE_LIMIT_DIVISOR) {
            warn!(
                "low on GitHub API requests: {}/{} remaining",
                rate.remaining, rate.limit
            );
        }

        let access = self.check_repo_access(target, token).await?;

        if !access.exists {
            return Err(StoreError::repo_access_denied(format!(
                "repository {}/{} not found or not visible to this token",
                target.owner, target.repo
            )));
        }

        if !access.can_write {
            return Err(StoreError::repo_access_denied(format!(
                "token lacks push permission on {}/{}",
                target.owner, target.repo
            )));
        }

        debug!(
            "preflight passed for {}/{}: {}/{} requests remaining",
            target.owner, target.repo, rate.remaining, rate.limit
        );

        Ok(())
    }
}
