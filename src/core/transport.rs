//! Command execution and file transfer seams.
//!
//! Every operation that touches a host goes through [`CommandRunner`] and
//! [`FileTransfer`]. [`SshTransport`] is the real implementation; tests drive
//! the same operations with a recording fake.

use crate::config::StageContext;
use crate::error::{CommandFailedDetails, CommandTarget, Error, Result, TransferFailedDetails};
use crate::shell;
use crate::ssh::{execute_local_command, CommandOutput, SshClient};
use std::path::Path;
use std::process::Command;

pub trait CommandRunner {
    fn run_local(&self, command: &str) -> Result<CommandOutput>;
    fn run_remote(&self, command: &str) -> Result<CommandOutput>;

    /// Label used in error details for remote commands, e.g. `deploy@example.com`.
    fn remote_label(&self) -> Option<String> {
        None
    }

    /// Run locally and turn a non-zero exit into [`ErrorCode::CommandFailed`](crate::ErrorCode).
    fn local(&self, command: &str) -> Result<CommandOutput> {
        let output = self.run_local(command)?;
        ensure_success(output, command, CommandTarget::Local, None)
    }

    /// Run on the stage host and turn a non-zero exit into an error.
    fn remote(&self, command: &str) -> Result<CommandOutput> {
        let output = self.run_remote(command)?;
        ensure_success(output, command, CommandTarget::Remote, self.remote_label())
    }
}

pub trait FileTransfer {
    fn upload(&self, local: &str, remote: &str) -> Result<()>;
    fn download(&self, remote: &str, local: &str) -> Result<()>;
}

/// Anything that can both run commands and move files.
pub trait Transport: CommandRunner + FileTransfer {}

impl<T: CommandRunner + FileTransfer + ?Sized> Transport for T {}

fn ensure_success(
    output: CommandOutput,
    command: &str,
    target: CommandTarget,
    host: Option<String>,
) -> Result<CommandOutput> {
    if output.success {
        return Ok(output);
    }

    Err(Error::command_failed(CommandFailedDetails {
        command: command.to_string(),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        target,
        host,
    }))
}

/// `ssh` for commands, `rsync` over ssh for files.
pub struct SshTransport {
    client: SshClient,
}

impl SshTransport {
    pub fn new(client: SshClient) -> Self {
        Self { client }
    }

    pub fn for_stage(ctx: &StageContext) -> Result<Self> {
        Ok(Self::new(SshClient::from_stage(&ctx.stage, &ctx.name)?))
    }

    /// Value for rsync's `-e`, carrying the same identity and port as `ssh`.
    fn rsync_shell(&self) -> String {
        let args = self.client.connection_args();
        if args.is_empty() {
            return "ssh".to_string();
        }
        format!("ssh {}", shell::quote_args(&args))
    }

    fn remote_target(&self, path: &str) -> String {
        if self.client.is_local {
            path.to_string()
        } else {
            format!("{}:{}", self.client.destination(), path)
        }
    }

    fn rsync(&self, flags: &str, source: &str, destination: &str) -> Result<()> {
        let mut cmd = Command::new("rsync");
        cmd.arg(flags);
        if !self.client.is_local {
            cmd.arg("-e").arg(self.rsync_shell());
        }
        cmd.arg(source).arg(destination);

        let output = cmd.output().map_err(|e| {
            Error::internal_io(e.to_string(), Some("Failed to execute rsync".to_string()))
                .with_hint("Install rsync locally and on the stage host")
        })?;

        if output.status.success() {
            return Ok(());
        }

        Err(Error::transfer_failed(TransferFailedDetails {
            source: source.to_string(),
            destination: destination.to_string(),
            method: "rsync".to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }))
    }
}

impl CommandRunner for SshTransport {
    fn run_local(&self, command: &str) -> Result<CommandOutput> {
        Ok(execute_local_command(command))
    }

    fn run_remote(&self, command: &str) -> Result<CommandOutput> {
        Ok(self.client.execute(command))
    }

    fn remote_label(&self) -> Option<String> {
        Some(self.client.destination())
    }
}

impl FileTransfer for SshTransport {
    fn upload(&self, local: &str, remote: &str) -> Result<()> {
        if !Path::new(local.trim_end_matches('/')).exists() {
            return Err(Error::validation_invalid_argument(
                "source",
                format!("Local path does not exist: {}", local),
                None,
            ));
        }

        log_status!("transfer", "Uploading {} -> {}", local, self.remote_target(remote));
        self.rsync("-az", local, &self.remote_target(remote))
    }

    fn download(&self, remote: &str, local: &str) -> Result<()> {
        if let Some(parent) = Path::new(local.trim_end_matches('/')).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::internal_io(
                        e.to_string(),
                        Some(format!("create {}", parent.display())),
                    )
                })?;
            }
        }

        log_status!("transfer", "Downloading {} -> {}", self.remote_target(remote), local);
        // -L copies symlink targets: .env in a release is usually a shared link
        self.rsync("-azL", &self.remote_target(remote), local)
    }
}
