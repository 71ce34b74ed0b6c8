//! Operator commands for the `evse-claims` binary.

pub mod commands;
pub mod config;

pub use config::Config;
