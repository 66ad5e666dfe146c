//! immom CLI library
//!
//! Command implementations live here so integration tests can drive them
//! without spawning the binary. The entry point is in main.rs.

pub mod changes;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
