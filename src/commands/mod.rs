use clap::Args;
use std::path::PathBuf;

use bedrock_deploy::config::{DeployConfig, StageContext};
use bedrock_deploy::log_status;
use bedrock_deploy::transport::SshTransport;

pub type CmdResult<T> = bedrock_deploy::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn load_config(&self) -> bedrock_deploy::Result<DeployConfig> {
        bedrock_deploy::config::load(self.config.as_deref())
    }
}

/// Stage selection shared by every command that talks to a host.
#[derive(Args, Debug, Default, Clone)]
pub struct StageArgs {
    /// Stage name from deploy.json (defaults to "defaultStage")
    #[arg(long, short = 's')]
    pub stage: Option<String>,

    /// Release to operate on (defaults to the current release)
    #[arg(long)]
    pub release_path: Option<String>,

    /// Previous release, used for copying .env and resetting caches
    #[arg(long)]
    pub previous_release: Option<String>,
}

/// Load config, resolve the stage and open a transport to it.
///
/// On chroot hosts without an explicit `currentPath`, the current release is
/// read from the `current` symlink before anything else runs.
pub(crate) fn open_stage(
    global: &GlobalArgs,
    args: &StageArgs,
) -> bedrock_deploy::Result<(StageContext, SshTransport)> {
    let config = global.load_config()?;
    let mut ctx = config.resolve_stage(args.stage.as_deref())?;
    let transport = SshTransport::for_stage(&ctx)?;

    if ctx.stage.chroot_path_prefix.is_some() && ctx.stage.current_path.is_none() {
        let current = bedrock_deploy::shared::resolve_current_path(&transport, &ctx)?;
        log_status!("stage", "Current release on '{}' is {}", ctx.name, current);
        ctx.current_path = current.clone();
        ctx.release_path = current;
    }

    let ctx = ctx
        .with_release_path(args.release_path.clone())
        .with_previous_release(args.previous_release.clone());

    Ok((ctx, transport))
}

pub mod backup;
pub mod config;
pub mod db;
pub mod env;
pub mod files;
pub mod recipe;
pub mod shared;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (bedrock_deploy::Result<serde_json::Value>, i32) {
    crate::tty::status("bedrock-deploy is working...");

    match command {
        crate::Commands::Db(args) => dispatch!(args, global, db),
        crate::Commands::Files(args) => dispatch!(args, global, files),
        crate::Commands::Backup(args) => dispatch!(args, global, backup),
        crate::Commands::Env(args) => dispatch!(args, global, env),
        crate::Commands::Shared(args) => dispatch!(args, global, shared),
        crate::Commands::Recipe(args) => dispatch!(args, global, recipe),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
