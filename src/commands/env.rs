use clap::{Args, Subcommand};
use serde::Serialize;

use bedrock_deploy::db_sync::Side;
use bedrock_deploy::env_file;
use bedrock_deploy::env_generate::{self, EnvEnsureReport, EnvSettings};
use bedrock_deploy::url::url_to_domain;

use super::{open_stage, CmdResult, GlobalArgs, StageArgs};

#[derive(Args)]
pub struct EnvArgs {
    #[command(subcommand)]
    command: EnvCommand,
}

#[derive(Subcommand)]
enum EnvCommand {
    /// Show WP_HOME and its bare domain
    Url {
        #[command(subcommand)]
        side: UrlSide,
    },
    /// Make sure the release has a .env, copying or generating it
    Ensure(EnsureArgs),
}

#[derive(Subcommand)]
enum UrlSide {
    /// Read <localRoot>/.env
    Local,
    /// Read <currentPath>/.env on the stage
    Remote {
        #[command(flatten)]
        stage: StageArgs,
    },
}

#[derive(Args)]
struct EnsureArgs {
    #[command(flatten)]
    stage: StageArgs,
    /// Database name, required when no previous .env exists
    #[arg(long)]
    db_name: Option<String>,
    #[arg(long)]
    db_user: Option<String>,
    #[arg(long, default_value = "")]
    db_password: String,
    #[arg(long, default_value = env_generate::DEFAULT_DB_HOST)]
    db_host: String,
    #[arg(long, default_value = "staging", value_parser = env_generate::WP_ENVS)]
    wp_env: String,
    #[arg(long, default_value = "http", value_parser = env_generate::PROTOCOLS)]
    protocol: String,
    /// Site domain without protocol, e.g. example.com
    #[arg(long)]
    domain: Option<String>,
}

impl EnsureArgs {
    fn settings(&self) -> Option<EnvSettings> {
        Some(EnvSettings {
            db_name: self.db_name.clone()?,
            db_user: self.db_user.clone()?,
            db_password: self.db_password.clone(),
            db_host: self.db_host.clone(),
            wp_env: self.wp_env.clone(),
            protocol: self.protocol.clone(),
            domain: self.domain.clone()?,
        })
    }
}

#[derive(Serialize)]
pub struct UrlOutput {
    pub side: Side,
    pub home: String,
    pub domain: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum EnvOutput {
    Url(UrlOutput),
    Ensure(EnvEnsureReport),
}

pub fn run(args: EnvArgs, global: &GlobalArgs) -> CmdResult<EnvOutput> {
    match args.command {
        EnvCommand::Url { side } => url(side, global),
        EnvCommand::Ensure(args) => ensure(args, global),
    }
}

fn url(side: UrlSide, global: &GlobalArgs) -> CmdResult<EnvOutput> {
    let (side, home) = match side {
        UrlSide::Local => {
            let config = global.load_config()?;
            (Side::Local, env_file::read_local_home(&config.resolved_local_root())?)
        }
        UrlSide::Remote { stage } => {
            let (ctx, transport) = open_stage(global, &stage)?;
            let home = env_file::read_remote_home(&transport, &ctx.current_path, &ctx.local_root)?;
            (Side::Remote, home)
        }
    };

    Ok((
        EnvOutput::Url(UrlOutput {
            side,
            domain: url_to_domain(&home),
            home,
        }),
        0,
    ))
}

fn ensure(args: EnsureArgs, global: &GlobalArgs) -> CmdResult<EnvOutput> {
    let (ctx, transport) = open_stage(global, &args.stage)?;
    let settings = args.settings();
    let report = env_generate::ensure(&transport, &ctx, settings.as_ref())?;
    Ok((EnvOutput::Ensure(report), 0))
}
