#![deny(clippy::all)]

//! Provisioning of isolated MSYS2-based development environments.
//!
//! The pieces compose leaf-first: the release cache fetches and extracts the
//! base toolchain once per host, the embedded shell runs bootstrap and venv
//! commands, and the environment builder copies the toolchain, layers a Python
//! venv on top, and installs the activation scripts.

mod core;

pub use crate::core::commands::{cache_path, env_status, provision, ProvisionRequest, StatusRequest};
pub use crate::core::config::context::CommandContext;
pub use crate::core::config::{
    FetchTool, ProvisionConfig, Release, DEFAULT_ENV_NAME,
};
pub use crate::core::env::activation::{
    install_activation, patch_self_reference, quoted_script_path, ActivationAsset,
    ActivationReport, ACTIVATION_ASSETS, SELF_REFERENCE,
};
pub use crate::core::env::builder::{ensure_environment, reinstall_activation, BuildReport};
pub use crate::core::env::layout::EnvLayout;
pub use crate::core::env::status::{inspect, EnvStatus};
pub use crate::core::error::ProvisionError;
pub use crate::core::runtime::effects::{
    Effects, Fetcher, Installer, SharedEffects, ShellRunner, SystemEffects,
};
pub use crate::core::runtime::process::{run_command_streaming, RunOutput};
pub use crate::core::store::cache::{cached_toolchain, ensure_release_cached, CacheLocation};
pub use crate::core::toolchain::installer::extract_release;
pub use crate::core::toolchain::shell::{bootstrap_host, run_in_shell};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
