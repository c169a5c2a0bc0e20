//! # ptd-cli — Portable Tournament Data Command-Line Interface
//!
//! ## Subcommands
//!
//! - `keygen`: Generate an Ed25519 key pair file
//! - `sign` / `verify`: Sign or verify a single envelope JSON document
//! - `pack`: Build a package from NDJSON entity files
//! - `verify-package`: Open a package, check every file hash and
//!   optionally the manifest signature
//! - `inspect`: Print a package manifest
//!
//! ## Exit Codes
//!
//! | code | meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | success                                         |
//! | 1    | operational error (bad input, I/O, bad key)     |
//! | 2    | verification failure (signature or integrity)   |
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to the library crates; no integrity logic here.
//! - Command output goes to stdout, logs to stderr.

pub mod keygen;
pub mod keys;
pub mod package;
pub mod signing;

/// Exit code for a document or package that failed verification.
pub const EXIT_VERIFY_FAILED: u8 = 2;
