use crate::config::Stage;
use crate::error::{Error, Result};
use std::process::Command;

pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the stage host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }
}

impl SshClient {
    pub fn from_stage(stage: &Stage, stage_name: &str) -> Result<Self> {
        let identity_file = match &stage.identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !std::path::Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(
                        stage_name.to_string(),
                        expanded,
                    ));
                }
                Some(expanded)
            }
            _ => None,
        };

        let is_local = is_local_host(&stage.host);
        if is_local {
            log_status!("ssh", "Stage '{}' is localhost, using local execution", stage_name);
        }

        Ok(Self {
            host: stage.host.clone(),
            user: stage.user.clone(),
            port: stage.port,
            identity_file,
            is_local,
        })
    }

    /// `user@host`, as used by ssh and rsync.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Connection options shared by ssh invocations and rsync's `-e`.
    pub fn connection_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Timeout and keepalive options prevent hangs on stalled
        // connections or unexpected prompts.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.connection_args();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    /// Run a command once. Failures are returned as-is, never re-run.
    pub fn execute(&self, command: &str) -> CommandOutput {
        if self.is_local {
            return execute_local_command(command);
        }

        let args = self.build_ssh_args(command);

        match Command::new("ssh").args(&args).output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput::failed(-1, format!("SSH error: {}", e)),
        }
    }
}

pub fn execute_local_command(command: &str) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    match cmd.output() {
        Ok(out) => CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        },
        Err(e) => CommandOutput::failed(-1, format!("Command error: {}", e)),
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(host: &str, port: u16) -> Stage {
        Stage {
            host: host.to_string(),
            user: "deploy".to_string(),
            port,
            identity_file: None,
            deploy_path: "/var/www".to_string(),
            current_path: None,
            chroot_path_prefix: None,
        }
    }

    #[test]
    fn localhost_is_local() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("::1"));
        assert!(!is_local_host("example.com"));
    }

    #[test]
    fn ssh_args_include_port_and_destination() {
        let client = SshClient::from_stage(&stage("example.com", 2222), "staging").unwrap();
        let args = client.build_ssh_args("ls");
        assert_eq!(&args[..2], &["-p".to_string(), "2222".to_string()]);
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert_eq!(args[args.len() - 2], "deploy@example.com");
        assert_eq!(args[args.len() - 1], "ls");
    }

    #[test]
    fn default_port_is_omitted() {
        let client = SshClient::from_stage(&stage("example.com", 22), "staging").unwrap();
        assert!(!client.connection_args().contains(&"-p".to_string()));
    }

    #[test]
    fn missing_identity_file_is_rejected() {
        let mut s = stage("example.com", 22);
        s.identity_file = Some("/nonexistent/id_ed25519".to_string());
        let err = SshClient::from_stage(&s, "staging").err().unwrap();
        assert_eq!(err.code.as_str(), "ssh.identity_file_not_found");
    }

    #[cfg(not(windows))]
    #[test]
    fn local_host_executes_locally() {
        let client = SshClient::from_stage(&stage("127.0.0.1", 22), "local").unwrap();
        let out = client.execute("echo ok");
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "ok");
    }

    #[cfg(not(windows))]
    #[test]
    fn local_command_reports_exit_code() {
        let out = execute_local_command("exit 3");
        assert!(!out.success);
        assert_eq!(out.exit_code, 3);
    }

    #[cfg(not(windows))]
    #[test]
    fn failing_command_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let client = SshClient::from_stage(&stage("127.0.0.1", 22), "local").unwrap();
        let command = format!(
            "cd '{}' && echo run >> count; echo 'ERROR 2002: Connection refused' >&2; exit 255",
            dir.path().display()
        );

        let out = client.execute(&command);

        assert!(!out.success);
        assert_eq!(out.exit_code, 255);
        let runs = std::fs::read_to_string(dir.path().join("count")).unwrap();
        assert_eq!(runs.lines().count(), 1);
    }
}
