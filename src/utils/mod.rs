//! Utility functions and helpers

pub mod settings;

pub use settings::{env_var, first_env_var, Settings};
