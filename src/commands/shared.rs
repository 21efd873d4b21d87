use clap::{Args, Subcommand};
use serde::Serialize;

use bedrock_deploy::shared::{self, SharedLinkReport};

use super::{open_stage, CmdResult, GlobalArgs, StageArgs};

#[derive(Args)]
pub struct SharedArgs {
    #[command(subcommand)]
    command: SharedCommand,
}

#[derive(Subcommand)]
enum SharedCommand {
    /// Move shared dirs/files out of the release and symlink them back
    Link {
        #[command(flatten)]
        stage: StageArgs,
    },
    /// Validate sharedDirs and print the commands `link` would run
    Check {
        #[command(flatten)]
        stage: StageArgs,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCheckOutput {
    pub stage: String,
    pub release_path: String,
    pub commands: Vec<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum SharedOutput {
    Link(SharedLinkReport),
    Check(SharedCheckOutput),
}

pub fn run(args: SharedArgs, global: &GlobalArgs) -> CmdResult<SharedOutput> {
    match args.command {
        SharedCommand::Link { stage } => {
            let (ctx, transport) = open_stage(global, &stage)?;
            let report = shared::link(&transport, &ctx)?;
            Ok((SharedOutput::Link(report), 0))
        }
        SharedCommand::Check { stage } => {
            // No host access: chroot current paths are not resolved here
            let ctx = global
                .load_config()?
                .resolve_stage(stage.stage.as_deref())?
                .with_release_path(stage.release_path);
            let commands = shared::link_commands(&ctx)?;
            Ok((
                SharedOutput::Check(SharedCheckOutput {
                    stage: ctx.name,
                    release_path: ctx.release_path,
                    commands,
                }),
                0,
            ))
        }
    }
}
