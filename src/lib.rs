// ABOUTME: Library root for cutover - exposes workflows and types for the binary and tests.
// ABOUTME: The main binary is in main.rs.

pub mod compose;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod hooks;
pub mod output;
pub mod runtime;
pub mod types;
