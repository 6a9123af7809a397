//! Definitions included by most files in this crate.
//!
//! This forms the dialect of Rust we use throughout: `anyhow` errors with
//! context, `tracing` for structured logging, and `url` for storage URIs.

pub(crate) use anyhow::{format_err, Context as _, Error, Result};
pub(crate) use tracing::{debug, error, info, instrument, trace, warn};
pub(crate) use url::Url;
