// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # gcpbill command-line plumbing
//!
//! Shared by the `gcpbill`, `gcpbill-setup` and `gcpbill-check` binaries:
//!
//! - [`context`]: logging, settings and authentication
//! - [`output`]: table, CSV and JSON rendering
//! - [`commands`]: the bodies of each action flag

pub mod commands;
pub mod context;
pub mod output;

pub use context::{AppContext, setup_logging};

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// Authentication or unrecoverable configuration failure.
    Error = 1,
}

impl ExitCode {
    /// Exits the process with this code.
    pub fn exit(self) -> ! {
        std::process::exit(self as i32)
    }
}
