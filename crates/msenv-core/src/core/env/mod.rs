//! Per-project environment directories: toolchain copy, runtime venv, and
//! the activation layer on top.

pub mod activation;
pub mod builder;
pub mod layout;
pub mod status;
pub mod venv_cfg;
