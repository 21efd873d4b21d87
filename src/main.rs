use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{backup, config, db, env, files, recipe, shared};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "bedrock-deploy")]
#[command(version = VERSION)]
#[command(about = "Database and file sync for WordPress Bedrock sites")]
struct Cli {
    /// Path to deploy.json (defaults to ./deploy.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull or push the WordPress database
    Db(db::DbArgs),
    /// Pull or push sync directories
    Files(files::FilesArgs),
    /// Zip sync directories on one side
    Backup(backup::BackupArgs),
    /// Read or create Bedrock .env files
    Env(env::EnvArgs),
    /// Link shared dirs and files into a release
    Shared(shared::SharedArgs),
    /// List or run named recipes
    Recipe(recipe::RecipeArgs),
    /// Inspect deploy.json
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
