use msenv_core::{
    cache_path, env_status, provision, CommandContext, ExecutionOutcome, ProvisionRequest,
    StatusRequest,
};
use serde_json::json;

use crate::cli::{CacheCommand, CommandGroupCli, MsenvCli};

pub fn dispatch_command(ctx: &CommandContext, cli: &MsenvCli) -> ExecutionOutcome {
    match &cli.command {
        None => {
            let request = ProvisionRequest {
                name: cli.provision.name.clone(),
                init: cli.provision.init,
                force: cli.provision.force,
            };
            core_call(|| provision(ctx, &request))
        }
        Some(_) if cli.provision.init || cli.provision.force => ExecutionOutcome::user_error(
            "--init and --force only apply when provisioning",
            json!({ "hint": "run `msenv --init` or `msenv --force` without a subcommand" }),
        ),
        Some(CommandGroupCli::Status(args)) => {
            let request = StatusRequest {
                name: args.name.clone().or_else(|| cli.provision.name.clone()),
            };
            core_call(|| env_status(ctx, &request))
        }
        Some(CommandGroupCli::Cache(CacheCommand::Path)) => core_call(|| cache_path(ctx)),
    }
}

fn core_call<F>(action: F) -> ExecutionOutcome
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            ExecutionOutcome::from_error(&err)
        }
    }
}
