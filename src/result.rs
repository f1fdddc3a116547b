//! Result type for the application plumbing around the store.
//!
//! Store operations report through [`crate::error::Outcome`]; everything
//! else (CLI, logger setup, config file parsing) uses the `color-eyre`
//! result defined here so errors carry context as they propagate.
//!
//! ```rust,ignore
//! use color_eyre::eyre::Context;
//! use crate::result::Result;
//!
//! fn read_settings(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .wrap_err("Failed to read configuration file")
//! }
//! ```

use color_eyre::eyre::Result as EyreResult;

/// Standard result type for non-store code.
pub type Result<T> = EyreResult<T>;
