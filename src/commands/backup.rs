use clap::{Args, Subcommand};
use serde::Serialize;

use bedrock_deploy::db_sync::Side;
use bedrock_deploy::files::{self, BackupEntry};

use super::{open_stage, CmdResult, GlobalArgs, StageArgs};

#[derive(Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    command: BackupCommand,
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Zip the local sync dirs
    Local {
        #[command(flatten)]
        stage: StageArgs,
    },
    /// Zip the sync dirs on the stage
    Remote {
        #[command(flatten)]
        stage: StageArgs,
    },
}

#[derive(Serialize)]
pub struct BackupOutput {
    pub side: Side,
    pub stage: String,
    pub backups: Vec<BackupEntry>,
}

pub fn run(args: BackupArgs, global: &GlobalArgs) -> CmdResult<BackupOutput> {
    let (side, stage) = match args.command {
        BackupCommand::Local { stage } => (Side::Local, stage),
        BackupCommand::Remote { stage } => (Side::Remote, stage),
    };

    let (ctx, transport) = open_stage(global, &stage)?;
    let backups = files::backup(&transport, &ctx, side)?;

    Ok((
        BackupOutput {
            side,
            stage: ctx.name,
            backups,
        },
        0,
    ))
}
