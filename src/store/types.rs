//! Data model returned by the store and the GitHub payloads it is built from.
use serde::{Deserialize, Serialize};

use crate::error::Outcome;

/// A markdown file in the target branch. `sha` is the optimistic
/// concurrency token and changes on every successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub path: String,
    pub sha: String,
}

/// Decoded contents of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub path: String,
    pub content: String,
    pub sha: String,
}

/// Core API quota as reported by GitHub at the time of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub remaining: u64,
    pub limit: u64,
    #[serde(rename = "reset")]
    pub reset_epoch_secs: i64,
}

impl RateLimitState {
    /// True when at most `1/divisor` of the window's quota is left.
    pub fn is_low(&self, divisor: u64) -> bool {
        divisor > 0 && self.remaining.saturating_mul(divisor) <= self.limit
    }
}

/// What the configured token may do with the target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoAccess {
    pub exists: bool,
    pub can_read: bool,
    pub can_write: bool,
    pub can_admin: bool,
    pub default_branch: String,
}

impl RepoAccess {
    pub fn missing() -> Self {
        Self {
            exists: false,
            can_read: false,
            can_write: false,
            can_admin: false,
            default_branch: String::new(),
        }
    }
}

/// Entry of a directory listing from the contents endpoint.
#[derive(Debug, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ContentEntry {
    pub fn is_markdown_file(&self) -> bool {
        self.kind == "file" && self.name.ends_with(".md")
    }
}

/// Single file payload from the contents endpoint.
#[derive(Debug, Deserialize)]
pub struct ContentFile {
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

/// Body sent to create, update or delete a file.
#[derive(Debug, Serialize)]
pub struct ContentChange {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WrittenContent {
    pub name: String,
    pub path: String,
    pub sha: String,
}

/// Response to a create/update. `content` is null for deletions.
#[derive(Debug, Deserialize)]
pub struct ContentChangeResponse {
    pub content: Option<WrittenContent>,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitState,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepoPermissions {
    pub pull: bool,
    pub push: bool,
    pub admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct RepoResponse {
    #[serde(default)]
    pub permissions: Option<RepoPermissions>,
    #[serde(default)]
    pub default_branch: String,
}

impl From<RepoResponse> for RepoAccess {
    fn from(repo: RepoResponse) -> Self {
        let permissions = repo.permissions.unwrap_or_default();
        Self {
            exists: true,
            can_read: permissions.pull,
            can_write: permissions.push,
            can_admin: permissions.admin,
            default_branch: repo.default_branch,
        }
    }
}

/// Render a probe outcome as `{"status": "ok", ...}` or
/// `{"status": "error", ...}` so callers can show diagnostics without
/// attempting a write.
pub fn probe_report<T: Serialize>(outcome: &Outcome<T>) -> serde_json::Value {
    let (status, detail) = match outcome {
        Ok(payload) => ("ok", serde_json::to_value(payload)),
        Err(err) => ("error", serde_json::to_value(err)),
    };

    let mut report = serde_json::Map::new();
    report.insert("status".into(), status.into());

    match detail {
        Ok(serde_json::Value::Object(fields)) => report.extend(fields),
        Ok(serde_json::Value::Null) => {}
        Ok(other) => {
            report.insert("data".into(), other);
        }
        Err(err) => {
            report.insert("status".into(), "error".into());
            report.insert("message".into(), err.to_string().into());
        }
    }

    serde_json::Value::Object(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn only_markdown_files_are_listed() {
        let entry = |name: &str, kind: &str| ContentEntry {
            name: name.into(),
            path: name.into(),
            sha: "abc".into(),
            kind: kind.into(),
        };
        assert!(entry("post.md", "file").is_markdown_file());
        assert!(!entry("notes.txt", "file").is_markdown_file());
        assert!(!entry("drafts.md", "dir").is_markdown_file());
    }

    #[test]
    fn low_budget_is_last_tenth_of_window() {
        let state = |remaining| RateLimitState {
            remaining,
            limit: 5000,
            reset_epoch_secs: 0,
        };
        assert!(state(500).is_low(10));
        assert!(state(12).is_low(10));
        assert!(!state(501).is_low(10));
        assert!(!state(12).is_low(0));
    }

    #[test]
    fn repo_without_permissions_block_grants_nothing() {
        let repo: RepoResponse =
            serde_json::from_str(r#"{"default_branch": "main"}"#).unwrap();
        let access = RepoAccess::from(repo);
        assert!(access.exists);
        assert!(!access.can_read);
        assert!(!access.can_write);
        assert_eq!(access.default_branch, "main");
    }

    #[test]
    fn change_body_omits_unset_fields() {
        let body = ContentChange {
            message: "docs: update a.md".into(),
            content: Some("aGk=".into()),
            branch: "main".into(),
            sha: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());
        assert_eq!(json["content"], "aGk=");
    }

    #[test]
    fn probe_report_flattens_payload() {
        let ok: Outcome<RateLimitState> = Ok(RateLimitState {
            remaining: 4999,
            limit: 5000,
            reset_epoch_secs: 1_700_000_000,
        });
        assert_eq!(
            probe_report(&ok),
            serde_json::json!({
                "status": "ok",
                "remaining": 4999,
                "limit": 5000,
                "reset": 1_700_000_000,
            })
        );

        let failed: Outcome<RateLimitState> =
            Err(StoreError::config_missing("GitHub token not configured"));
        let report = probe_report(&failed);
        assert_eq!(report["status"], "error");
        assert_eq!(report["error"], "config_missing");
        assert_eq!(report["message"], "GitHub token not configured");
    }
}
