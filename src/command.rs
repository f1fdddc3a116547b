//! Subcommand execution.
//!
//! Every subcommand builds a fresh [`FileStore`](crate::store::files::FileStore)
//! from the CLI arguments, runs one store operation and prints its JSON
//! result to stdout. Failures are printed as the structured failure object
//! and turned into an error so the process exits non-zero.
use color_eyre::eyre::eyre;
use std::io;

use crate::{
    cli::{Args, Command},
    result::Result,
};

/// `check` diagnostics.
pub mod check;

/// Store construction and JSON output.
pub mod common;

/// File subcommands.
pub mod files;

/// Run the subcommand selected in `args`.
pub async fn execute(args: &Args) -> Result<()> {
    let mut stdout = io::stdout();

    let store = match common::build_store(args) {
        Ok(store) => store,
        Err(err) => return common::fail(&mut stdout, err),
    };

    match &args.command {
        Command::List => common::emit(&mut stdout, files::list(&store).await),
        Command::Read { path } => {
            common::emit(&mut stdout, files::read(&store, path).await)
        }
        Command::Write { path, file, sha } => {
            let content = match files::load_content(file.as_deref()).await {
                Ok(content) => content,
                Err(err) => return common::fail(&mut stdout, err),
            };
            common::emit(
                &mut stdout,
                files::write(&store, path, &content, sha.as_deref()).await,
            )
        }
        Command::Delete { path, sha } => common::emit(
            &mut stdout,
            files::delete(&store, path, sha.as_deref()).await,
        ),
        Command::Check => {
            let check = check::run(&store).await;
            common::print_json(&mut stdout, &check.report)?;
            if check.passed {
                Ok(())
            } else {
                Err(eyre!("one or more checks failed"))
            }
        }
    }
}
