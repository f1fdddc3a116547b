//! Read-only diagnostics for the configured repository.
//!
//! Runs the health probe, the repository access probe and a listing, prints
//! each as a probe report and adds tips for anything that needs fixing.
use chrono::DateTime;
use log::*;
use serde_json::{Value, json};

use crate::{
    error::{FailureKind, Outcome, StoreError},
    store::{
        files::FileStore,
        preflight::MIN_RATE_LIMIT_REMAINING,
        types::{RateLimitState, RepoAccess, probe_report},
    },
};

/// Diagnostics report and whether every probe passed.
pub struct CheckReport {
    pub report: Value,
    pub passed: bool,
}

pub async fn run(store: &FileStore) -> CheckReport {
    let health = store.check_health().await;
    let access = store.check_repo_access().await;
    let listing = store.list_files().await.map(|files| {
        json!({
            "count": files.len(),
            "files": files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
        })
    });

    let tips = tips(&health, &access, &listing);

    let passed = tips.is_empty();

    if passed {
        info!("all checks passed");
    } else {
        warn!("{} check(s) need attention", tips.len());
    }

    CheckReport {
        report: json!({
            "health": probe_report(&health),
            "repository": probe_report(&access),
            "listing": probe_report(&listing),
            "tips": tips,
        }),
        passed,
    }
}

fn tips(
    health: &Outcome<RateLimitState>,
    access: &Outcome<RepoAccess>,
    listing: &Outcome<Value>,
) -> Vec<String> {
    let mut tips = vec![];

    match health {
        Ok(rate) if rate.remaining < MIN_RATE_LIMIT_REMAINING => {
            tips.push(format!(
                "only {}/{} API requests left; writes resume after {}",
                rate.remaining,
                rate.limit,
                reset_time(rate.reset_epoch_secs)
            ));
        }
        Ok(_) => {}
        Err(err) => push_unique(&mut tips, failure_tip(err)),
    }

    match access {
        Ok(access) if !access.exists => tips.push(
            "repository not found: check the owner and repository spelling, \
             and that the token can see private repositories"
                .into(),
        ),
        Ok(access) if !access.can_write => tips.push(
            "token can read but not push: grant it write access to the \
             repository contents"
                .into(),
        ),
        Ok(_) => {}
        Err(err) => push_unique(&mut tips, failure_tip(err)),
    }

    if let Err(err) = listing {
        let tip = match err {
            StoreError::ApiError { status: 404, .. } => {
                "listing failed: check that the configured branch exists".into()
            }
            other => failure_tip(other),
        };
        push_unique(&mut tips, tip);
    }

    tips
}

/// Probes failing for the same reason share one tip.
fn push_unique(tips: &mut Vec<String>, tip: String) {
    if !tips.contains(&tip) {
        tips.push(tip);
    }
}

fn failure_tip(err: &StoreError) -> String {
    match err.kind() {
        FailureKind::ConfigMissing => format!(
            "{}: set GITHUB_USERNAME, GITHUB_REPO and GITHUB_TOKEN in the \
             settings file or pass them on the command line",
            err.message()
        ),
        FailureKind::RateLimitExceeded => format!(
            "rate limit exhausted: retry in {}s",
            err.retry_after().unwrap_or_default()
        ),
        FailureKind::Timeout | FailureKind::ConnectionError => format!(
            "GitHub API unreachable ({}): check network access and --api-url",
            err.message()
        ),
        FailureKind::ApiError if err.status_code() == Some(401) => {
            "token rejected: create a new token with the repo scope".into()
        }
        _ => err.message().to_string(),
    }
}

fn reset_time(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| epoch_secs.to_string())
}
