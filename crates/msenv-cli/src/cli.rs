use clap::{ArgAction, Args, Parser, Subcommand};

pub const MSENV_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nOptions:\n{options}\n\nCommands:\n{subcommands}\n";

pub const MSENV_BEFORE_HELP: &str = concat!(
    "msenv ",
    env!("CARGO_PKG_VERSION"),
    " – isolated MSYS2 + Python environments per project\n\n",
    "  msenv --init        Download the base toolchain once, install host packages, build ./.venv\n",
    "  msenv               Build (or resume) ./.venv from the cached toolchain\n",
    "  msenv --force       Reinstall only the activation scripts of an existing environment\n",
    "  msenv status        Show which provisioning steps are done\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    disable_help_subcommand = true,
    before_help = MSENV_BEFORE_HELP,
    help_template = MSENV_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct MsenvCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(flatten)]
    pub provision: ProvisionArgs,
    #[command(subcommand)]
    pub command: Option<CommandGroupCli>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProvisionArgs {
    #[arg(
        long,
        help = "Cache the base toolchain and install host packages before building"
    )]
    pub init: bool,
    #[arg(
        long,
        value_name = "DIR",
        help = "Environment directory name (default .venv or MSENV_DEFAULT_ENV)"
    )]
    pub name: Option<String>,
    #[arg(
        long,
        help = "Reinstall only the activation layer of an existing environment"
    )]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Report which provisioning steps an environment has completed.",
        override_usage = "msenv status [--name DIR]"
    )]
    Status(StatusArgs),
    #[command(subcommand, about = "Inspect the shared base toolchain cache.")]
    Cache(CacheCommand),
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, value_name = "DIR", help = "Environment directory name")]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum CacheCommand {
    #[command(about = "Print the cache root and the pinned release location.")]
    Path,
}
