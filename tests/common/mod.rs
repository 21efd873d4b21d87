#![allow(dead_code)]

use bedrock_deploy::config::{self, StageContext};
use bedrock_deploy::error::TransferFailedDetails;
use bedrock_deploy::ssh::CommandOutput;
use bedrock_deploy::transport::{CommandRunner, FileTransfer};
use bedrock_deploy::{Error, Result};
use std::cell::RefCell;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Local(String),
    Remote(String),
    Upload(String, String),
    Download(String, String),
}

/// Records every call and plays a stage host with a given remote `.env`.
#[derive(Default)]
pub struct RecordingTransport {
    pub calls: RefCell<Vec<Call>>,
    pub remote_env: Option<String>,
    /// Commands containing this text exit with status 1.
    pub fail_on: Option<String>,
}

impl RecordingTransport {
    pub fn with_remote_env(content: &str) -> Self {
        Self {
            remote_env: Some(content.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn respond(&self, command: &str) -> CommandOutput {
        match &self.fail_on {
            Some(needle) if command.contains(needle.as_str()) => {
                CommandOutput::failed(1, "Error: simulated failure")
            }
            _ => CommandOutput::ok(""),
        }
    }
}

impl CommandRunner for RecordingTransport {
    fn run_local(&self, command: &str) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(Call::Local(command.to_string()));
        Ok(self.respond(command))
    }

    fn run_remote(&self, command: &str) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(Call::Remote(command.to_string()));
        Ok(self.respond(command))
    }

    fn remote_label(&self) -> Option<String> {
        Some("deploy@example.com".to_string())
    }
}

impl FileTransfer for RecordingTransport {
    fn upload(&self, local: &str, remote: &str) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::Upload(local.to_string(), remote.to_string()));
        Ok(())
    }

    fn download(&self, remote: &str, local: &str) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::Download(remote.to_string(), local.to_string()));

        let content = if remote.ends_with("/.env") {
            match &self.remote_env {
                Some(content) => content.clone(),
                None => {
                    return Err(Error::transfer_failed(TransferFailedDetails {
                        source: remote.to_string(),
                        destination: local.to_string(),
                        method: "rsync".to_string(),
                        exit_code: 23,
                        stderr: "No such file or directory".to_string(),
                    }))
                }
            }
        } else {
            "-- MySQL dump".to_string()
        };

        if let Some(parent) = Path::new(local).parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(local, content).unwrap();
        Ok(())
    }
}

/// A single "staging" stage whose local root is `root`.
pub fn stage(root: &Path, extra: &str) -> StageContext {
    let json = format!(
        r#"{{
            "localRoot": "{}",
            "localSite": {{ "type": "direct" }},
            "stages": {{
                "staging": {{ "host": "example.com", "user": "deploy", "deployPath": "/var/www/app" }}
            }}
            {}
        }}"#,
        root.display(),
        extra
    );
    let config = config::from_json(&json, "test").unwrap();
    config.validate().unwrap();
    config.resolve_stage(None).unwrap()
}

pub fn write_local_env(root: &Path, content: &str) {
    std::fs::write(root.join(".env"), content).unwrap();
}
