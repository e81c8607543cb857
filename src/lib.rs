//! Backup Keeper - Library
//!
//! PostgreSQL backup, restore, and maintenance orchestrator.

#[macro_use]
mod macros;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
