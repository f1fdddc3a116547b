//! Resilient GitHub-backed store for markdown files.
//!
//! Callers go through [`files::FileStore`]; mutations pass the
//! [`preflight::Preflight`] checks first and every request is sent by the
//! retrying [`client::ApiClient`].
use reqwest::Url;

use crate::error::{Outcome, StoreError};

/// Retrying, rate-limit aware API client.
pub mod client;

/// Time source used for backoff and rate limit waits.
pub mod clock;

/// List, read, write and delete operations.
pub mod files;

/// Health and permission checks run before mutations.
pub mod preflight;

/// HTTP seam and its reqwest implementation.
pub mod transport;

/// Data model and GitHub payloads.
pub mod types;


/// Append percent-encoded path `segments` to the API base URL.
pub(crate) fn endpoint<I, S>(base: &Url, segments: I) -> Outcome<Url>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| {
            StoreError::unexpected(format!("invalid API base URL: {base}"))
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
