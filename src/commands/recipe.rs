use clap::{Args, Subcommand};
use serde::Serialize;

use bedrock_deploy::recipe::{self, RecipeInfo, RecipeReport};

use super::{open_stage, CmdResult, GlobalArgs, StageArgs};

#[derive(Args)]
pub struct RecipeArgs {
    #[command(subcommand)]
    command: RecipeCommand,
}

#[derive(Subcommand)]
enum RecipeCommand {
    /// List available recipes
    List,
    /// Run a recipe against a stage
    Run {
        /// Recipe name, e.g. sage:upload_assets
        name: String,
        #[command(flatten)]
        stage: StageArgs,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum RecipeOutput {
    List { recipes: Vec<RecipeInfo> },
    Run(RecipeReport),
}

pub fn run(args: RecipeArgs, global: &GlobalArgs) -> CmdResult<RecipeOutput> {
    match args.command {
        RecipeCommand::List => Ok((
            RecipeOutput::List {
                recipes: recipe::list(),
            },
            0,
        )),
        RecipeCommand::Run { name, stage } => {
            // Fail on an unknown name before connecting anywhere
            recipe::find(&name)?;
            let (ctx, transport) = open_stage(global, &stage)?;
            let report = recipe::run(&transport, &ctx, &name)?;
            Ok((RecipeOutput::Run(report), 0))
        }
    }
}
