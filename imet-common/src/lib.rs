//! Shared types for the IMET intake service
//!
//! Holds the workspace-wide error type and TOML configuration loading so the
//! service crate and any future tooling agree on both.

pub mod config;
pub mod error;

pub use error::{Error, Result};
