//! # UserAPI Config
//!
//! Configuration management for the UserAPI service.
//! Supports layered configuration from TOML files, a `.env` file and
//! `USERAPI_`-prefixed environment variables.

mod app_config;
mod backend;
mod loader;
mod validation;

pub use app_config::*;
pub use backend::*;
pub use loader::*;
pub use validation::*;
