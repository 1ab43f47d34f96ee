//! Command-line host for intentgate
//!
//! This crate provides:
//! - A terminal approval prompter
//! - The JSON-lines protocol behind `intentgate serve`
//! - Logging setup for the binary
//! - Gate construction from command-line options

pub mod approval;
mod error;
pub mod logging;
pub mod protocol;
pub mod setup;

pub use approval::TerminalApprover;
pub use error::CliError;
pub use protocol::{handle_pre_tool, serve, Request, Response};
pub use setup::gate_builder;
