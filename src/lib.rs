//! # pr-notes
//!
//! Builds a labeled changelog from the commits of a pull request and merges
//! it into the pull request's description.
//!
//! Commit messages may reference other pull requests (`#123`); the labels
//! attached to the referenced pull request decide which changelog section
//! the commit lands in. Commits with no reference, an unresolvable
//! reference, or no recognized label land in an "Improvements" section.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod changelog;
pub mod cli;
pub mod config;
pub mod github;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of pr-notes.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
