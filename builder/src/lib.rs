//! libnode builder library.
//!
//! This crate builds Node.js as a static library for one target, assembles
//! the libraries and generated Rust bindings into a result directory, and
//! packages that directory as a zip archive. It backs the `libnode-builder`
//! CLI and can be driven programmatically through a [`exec::CommandExecutor`]
//! so tests never spawn real toolchains.
//!
//! # Modules
//!
//! - [`archive`] - Archive naming, zip packaging, and checksum sidecars
//! - [`assembler`] - Result directory assembly from build output
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `LIBNODE_*` environment settings
//! - [`error`] - Error types shared by every stage
//! - [`exec`] - External command abstraction
//! - [`invoker`] - Platform build command sequences
//! - [`output`] - User-facing text and JSON output
//! - [`pipeline`] - Stage orchestration
//! - [`scan`] - Directory scanning and artifact classification
//! - [`target`] - Target resolution
//! - [`verify`] - Consumer test-suite runs

pub mod archive;
pub mod assembler;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod invoker;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod target;
pub mod verify;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
