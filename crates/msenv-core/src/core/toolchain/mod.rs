//! Base toolchain materialization and the embedded-shell command runner.

pub mod installer;
pub mod shell;
