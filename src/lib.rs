//! Library interface for rpm-get
//!
//! The binary is a thin clap front end over these modules; they are exposed
//! for integration tests.

pub mod commands;
pub mod config;
pub mod context;
pub mod dnf;
pub mod download;
pub mod error;
pub mod extract;
pub mod http;
pub mod manifest;
pub mod output;
pub mod platform;
pub mod release;
pub mod repo;
pub mod resolver;
pub mod state;
pub mod store;

pub use config::Config;
pub use context::Context;
pub use error::{Result, RpmGetError};
