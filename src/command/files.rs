//! list, read, write and delete subcommands.
use log::*;
use serde_json::{Value, json};
use std::path::Path;
use tokio::{fs, io::AsyncReadExt};

use crate::{
    error::{Outcome, StoreError},
    store::files::FileStore,
};

pub async fn list(store: &FileStore) -> Outcome<Value> {
    let files = store.list_files().await?;
    Ok(json!(files))
}

pub async fn read(store: &FileStore, path: &str) -> Outcome<Value> {
    let file = store.read_file(path).await?;
    Ok(json!({
        "content": file.content,
        "path": file.path,
        "sha": file.sha,
    }))
}

pub async fn write(
    store: &FileStore,
    path: &str,
    content: &str,
    sha: Option<&str>,
) -> Outcome<Value> {
    let record = store.write_file(path, content, sha).await?;
    Ok(json!(record))
}

pub async fn delete(
    store: &FileStore,
    path: &str,
    sha: Option<&str>,
) -> Outcome<Value> {
    store.delete_file(path, sha).await?;
    Ok(json!({"status": "ok"}))
}

/// Content to upload, from `file` when given, otherwise stdin.
pub async fn load_content(file: Option<&Path>) -> Outcome<String> {
    match file {
        Some(file) => {
            debug!("reading upload content from {}", file.display());
            fs::read_to_string(file).await.map_err(|err| {
                StoreError::unexpected(format!(
                    "failed to read {}: {err}",
                    file.display()
                ))
            })
        }
        None => {
            debug!("reading upload content from stdin");
            let mut content = String::new();
            tokio::io::stdin()
                .read_to_string(&mut content)
                .await
                .map_err(|err| {
                    StoreError::unexpected(format!("failed to read stdin: {err}"))
                })?;
            Ok(content)
        }
    }
}
