//! # Campus Config
//!
//! Configuration management for the Campus API.
//! Supports layered configuration from files, a `.env` file and
//! environment variables, with validation and runtime reload.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
