//! Store construction and JSON output shared by every subcommand.
use serde::Serialize;
use std::{io::Write, sync::Arc};

use crate::{
    cli::Args,
    error::{Outcome, StoreError},
    result::Result,
    store::files::FileStore,
};

/// Store backed by the settings file plus command line overrides.
pub fn build_store(args: &Args) -> Outcome<FileStore> {
    FileStore::new(
        Arc::new(args.config_provider()),
        args.retry_options(),
        &args.api_url,
    )
}

/// Print a successful payload, or the structured failure object followed by
/// an error so the process exits non-zero.
pub fn emit<T: Serialize>(out: &mut impl Write, outcome: Outcome<T>) -> Result<()> {
    match outcome {
        Ok(payload) => print_json(out, &payload),
        Err(err) => fail(out, err),
    }
}

pub fn fail(out: &mut impl Write, err: StoreError) -> Result<()> {
    log::debug!("operation failed: {:?}", err.kind());
    print_json(out, &err)?;
    Err(err.into())
}

pub fn print_json<T: Serialize>(out: &mut impl Write, payload: &T) -> Result<()> {
    let json = serde_json::to_value(payload)?;
    writeln!(out, "{json}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::FileRecord;
    use serde_json::{Value, json};

    fn printed(buf: Vec<u8>) -> Value {
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn emits_payload_on_success() {
        let mut buf = vec![];
        let record = FileRecord {
            name: "a.md".into(),
            path: "a.md".into(),
            sha: "abc".into(),
        };

        emit(&mut buf, Ok(record)).unwrap();

        assert_eq!(
            printed(buf),
            json!({"name": "a.md", "path": "a.md", "sha": "abc"})
        );
    }

    #[test]
    fn emits_failure_object_and_errors() {
        let mut buf = vec![];

        let result = emit::<()>(
            &mut buf,
            Err(StoreError::rate_limited("API rate limit exceeded", 60)),
        );

        assert!(result.is_err());
        let output = printed(buf);
        assert_eq!(output["error"], "rate_limit_exceeded");
        assert_eq!(output["retry_after"], 60);
    }
}
