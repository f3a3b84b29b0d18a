//! Collector configuration.
//!
//! The configuration is a JSON document loaded once at start-up. Besides
//! paths and intervals it carries the per-mount filtering policies, which are
//! turned into a read-only [`MountTable`] with a guaranteed `all` fallback.
mod error;
mod policy;
mod settings;
mod table;

pub use error::{Error, Result};
pub use policy::{DEFAULT_MIN_AGE, MountPolicy, PerOpFilter, WILDCARD};
pub use settings::{CONFIG_ENV, Config, PolicyConfig};
pub use table::MountTable;
