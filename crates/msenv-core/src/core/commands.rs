use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::core::config::context::CommandContext;
use crate::core::env::builder::{ensure_environment, reinstall_activation};
use crate::core::env::layout::EnvLayout;
use crate::core::env::status::inspect;
use crate::core::store::cache::{ensure_release_cached, is_release_cached};
use crate::core::toolchain::shell::bootstrap_host;
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub name: Option<String>,
    /// Cache the base toolchain and install host packages first.
    pub init: bool,
    /// Recreate only the activation layer of an existing environment.
    pub force: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StatusRequest {
    pub name: Option<String>,
}

/// Runs the provisioning state machine for one environment directory.
///
/// # Errors
/// Propagates any failing step; nothing is retried.
pub fn provision(ctx: &CommandContext, request: &ProvisionRequest) -> Result<ExecutionOutcome> {
    let config = ctx.config();
    let layout = EnvLayout::resolve(ctx.cwd(), ctx.env_name(request.name.as_deref()))?;
    let root = layout.root().display().to_string();

    let mut bootstrapped = false;
    if request.init {
        let tree = ensure_release_cached(config, ctx.effects())?;
        bootstrap_host(ctx.effects(), &tree)?;
        bootstrapped = true;
        info!(release = config.release.id, "host bootstrap complete");
    }

    if request.force {
        let activation = reinstall_activation(&layout)?;
        return Ok(ExecutionOutcome::success(
            format!("reinstalled activation layer in {root}"),
            json!({
                "env": root,
                "bootstrapped": bootstrapped,
                "activation": activation,
            }),
        ));
    }

    let build = ensure_environment(config, ctx.effects(), &layout)?;
    let message = if build.changed() {
        format!("environment ready at {root}")
    } else {
        format!("environment already up to date at {root}")
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "env": root,
            "bootstrapped": bootstrapped,
            "build": build,
            "activate": layout.activate_script().display().to_string(),
        }),
    ))
}

/// Reports provisioning signals without mutating anything.
///
/// # Errors
/// Returns an error if a present file cannot be read.
pub fn env_status(ctx: &CommandContext, request: &StatusRequest) -> Result<ExecutionOutcome> {
    let config = ctx.config();
    let layout = EnvLayout::resolve(ctx.cwd(), ctx.env_name(request.name.as_deref()))?;
    let status = inspect(&layout)?;
    let cached = is_release_cached(config);
    let details = json!({
        "release": config.release.id,
        "release_cached": cached,
        "env": status,
        "next_step": status.next_step(),
    });
    let root = layout.root().display();
    let outcome = match status.next_step() {
        None => ExecutionOutcome::success(format!("environment complete at {root}"), details),
        Some(step) if !status.toolchain_copied && !cached => ExecutionOutcome::user_error(
            format!("no environment at {root}; next step: {step}"),
            json!({
                "hint": "run `msenv --init` to cache the base toolchain and build the environment",
                "release": config.release.id,
                "release_cached": cached,
                "env": status,
                "next_step": step,
            }),
        ),
        Some(step) => ExecutionOutcome::user_error(
            format!("environment at {root} is incomplete; next step: {step}"),
            details,
        ),
    };
    Ok(outcome)
}

/// Prints where the shared toolchain cache lives.
///
/// # Errors
/// Never fails today; kept fallible like the other handlers.
pub fn cache_path(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let config = ctx.config();
    Ok(ExecutionOutcome::success(
        config.cache.path.display().to_string(),
        json!({
            "path": config.cache.path,
            "source": config.cache.source,
            "release": config.release.id,
            "release_dir": config.release_dir(),
            "release_cached": is_release_cached(config),
            "archive": config.archive_path(),
            "url": config.release.url(),
            "fetch_tool": config.fetch_tool.describe(),
        }),
    ))
}
