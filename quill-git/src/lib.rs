//! # quill-git
//!
//! Command Gateway: async `git` subprocess execution plus one thin wrapper
//! per subcommand the sync engine drives. The version-control tool is a
//! black box — only exit codes and literal stdout are inspected upstream.

pub mod error;
pub mod gateway;
pub mod ops;

pub use error::GitError;
pub use gateway::{Gateway, GitGateway};
