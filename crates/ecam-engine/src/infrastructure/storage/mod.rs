//! Storage infrastructure: engine configuration persistence.
//!
//! The `config` sub-module reads and writes the TOML file that tunes the
//! engine (timeouts, retry limits, BLE packet size and log level) and falls
//! back to built-in defaults when no file exists.

pub mod config;
