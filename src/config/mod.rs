//! # Configuration Module
//!
//! This module provides the restore configuration and the string parsers the CLI uses to fill it.

pub mod config;

pub use config::{DEFAULT_USER_AGENT, RestoreConfig, parse_duration, parse_header};
