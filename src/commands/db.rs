use clap::{Args, Subcommand};

use bedrock_deploy::db_sync::{self, DbSyncReport, SyncDirection};

use super::{open_stage, CmdResult, GlobalArgs, StageArgs};

/// Exit code when the database was copied but its URLs were left untouched.
pub const EXIT_URLS_NOT_UPDATED: i32 = 3;

#[derive(Args)]
pub struct DbArgs {
    #[command(subcommand)]
    command: DbCommand,
}

#[derive(Subcommand)]
enum DbCommand {
    /// Replace the local database with the stage database
    Pull {
        #[command(flatten)]
        stage: StageArgs,
    },
    /// Replace the stage database with the local database
    Push {
        #[command(flatten)]
        stage: StageArgs,
    },
}

pub fn run(args: DbArgs, global: &GlobalArgs) -> CmdResult<DbSyncReport> {
    let (direction, stage) = match args.command {
        DbCommand::Pull { stage } => (SyncDirection::Pull, stage),
        DbCommand::Push { stage } => (SyncDirection::Push, stage),
    };

    let (ctx, transport) = open_stage(global, &stage)?;
    let report = db_sync::sync(&transport, &ctx, direction)?;

    let exit_code = if report.reconciled() {
        0
    } else {
        EXIT_URLS_NOT_UPDATED
    };
    Ok((report, exit_code))
}
