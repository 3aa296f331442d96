//! Quill core library — domain types, settings persistence, errors.
//!
//! Public API surface:
//! - [`types`] — trigger/divergence/outcome data model
//! - [`error`] — [`ConfigError`]
//! - [`config`] — load / save / init for `~/.quill/config.yaml`

pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::ConfigError;
pub use types::{
    CommandResult, DivergenceState, IndicatorState, RemoteComparison, Severity, SyncOutcome,
    TriggerSource,
};
