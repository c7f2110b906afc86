pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod env;
pub(crate) mod error;
pub(crate) mod fs;
pub(crate) mod runtime;
pub(crate) mod store;
pub(crate) mod toolchain;
pub(crate) mod tooling;

#[cfg(test)]
pub(crate) mod testing;
