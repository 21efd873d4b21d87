use clap::{Args, Subcommand};
use serde::Serialize;

use bedrock_deploy::config::DeployConfig;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the resolved settings for a stage
    Show {
        /// Stage name (defaults to "defaultStage")
        #[arg(long, short = 's')]
        stage: Option<String>,
    },
    /// Check deploy.json without contacting any host
    Validate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub name: String,
    pub host: String,
    pub user: String,
    pub port: u16,
    pub local_root: String,
    pub local_site: String,
    pub deploy_path: String,
    pub current_path: String,
    pub sync_dirs: Vec<bedrock_deploy::config::SyncDir>,
    pub shared_dirs: Vec<String>,
    pub shared_files: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOutput {
    pub config_path: Option<String>,
    pub stages: Vec<String>,
    pub valid: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ConfigOutput {
    Show(StageView),
    Validate(ValidateOutput),
}

pub fn run(args: ConfigArgs, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let config = global.load_config()?;
    match args.command {
        ConfigCommand::Show { stage } => Ok((ConfigOutput::Show(show(&config, stage)?), 0)),
        ConfigCommand::Validate => Ok((
            ConfigOutput::Validate(ValidateOutput {
                config_path: config.source_path.as_ref().map(|p| p.display().to_string()),
                stages: config.stage_names(),
                valid: true,
            }),
            0,
        )),
    }
}

fn show(config: &DeployConfig, stage: Option<String>) -> bedrock_deploy::Result<StageView> {
    let ctx = config.resolve_stage(stage.as_deref())?;
    Ok(StageView {
        sync_dirs: ctx.sync_dirs()?,
        local_root: ctx.local_root_str(),
        local_site: config.local_site.kind().to_string(),
        host: ctx.stage.host.clone(),
        user: ctx.stage.user.clone(),
        port: ctx.stage.port,
        name: ctx.name,
        deploy_path: ctx.deploy_path,
        current_path: ctx.current_path,
        shared_dirs: config.shared_dirs.clone(),
        shared_files: config.shared_files.clone(),
    })
}
