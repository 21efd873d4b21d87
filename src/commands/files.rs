use clap::{Args, Subcommand};

use bedrock_deploy::db_sync::SyncDirection;
use bedrock_deploy::files::{self, FilesReport};

use super::{open_stage, CmdResult, GlobalArgs, StageArgs};

#[derive(Args)]
pub struct FilesArgs {
    #[command(subcommand)]
    command: FilesCommand,
}

#[derive(Subcommand)]
enum FilesCommand {
    /// Download sync dirs from the stage, zipping local copies first
    Pull {
        #[command(flatten)]
        stage: StageArgs,
        /// Skip the zip backup of the local dirs
        #[arg(long)]
        no_backup: bool,
    },
    /// Upload sync dirs to the stage, zipping remote copies first
    Push {
        #[command(flatten)]
        stage: StageArgs,
        /// Skip the zip backup of the remote dirs
        #[arg(long)]
        no_backup: bool,
    },
}

pub fn run(args: FilesArgs, global: &GlobalArgs) -> CmdResult<FilesReport> {
    let (direction, stage, no_backup) = match args.command {
        FilesCommand::Pull { stage, no_backup } => (SyncDirection::Pull, stage, no_backup),
        FilesCommand::Push { stage, no_backup } => (SyncDirection::Push, stage, no_backup),
    };

    let (ctx, transport) = open_stage(global, &stage)?;
    let report = files::sync(&transport, &ctx, direction, !no_backup)?;
    Ok((report, 0))
}
