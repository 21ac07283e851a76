//! # pts-cli
//!
//! The `pointscale` binary: settings resolution and server bootstrap.
//!
//! ```bash
//! pointscale serve --port 3000 --database-url sqlite://pointscale.db
//! pointscale migrate --config pointscale.toml
//! ```

pub mod cli;
pub mod config;
pub mod serve;

pub use config::{FileConfig, Overrides, Settings};
