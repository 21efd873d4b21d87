use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,
    ConfigSharedDirsOverlap,

    ValidationInvalidArgument,

    StageNotFound,

    SshIdentityFileNotFound,

    CommandFailed,
    TransferFailed,

    EnvReadFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigSharedDirsOverlap => "config.shared_dirs_overlap",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::StageNotFound => "stage.not_found",

            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",

            ErrorCode::CommandFailed => "command.failed",
            ErrorCode::TransferFailed => "transfer.failed",

            ErrorCode::EnvReadFailed => "env.read_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDirsOverlapDetails {
    pub first: String,
    pub second: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageNotFoundDetails {
    pub stage: String,
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshIdentityFileNotFoundDetails {
    pub stage: String,
    pub identity_file: String,
}

/// Where a failed command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandTarget {
    Local,
    Remote,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub target: CommandTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFailedDetails {
    pub source: String,
    pub destination: String,
    pub method: String,
    pub exit_code: i32,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvReadFailedDetails {
    pub path: String,
    pub key: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn stage_not_found(stage: impl Into<String>, available: Vec<String>) -> Self {
        let stage = stage.into();
        let hint = if available.is_empty() {
            "Add a stage under \"stages\" in deploy.json".to_string()
        } else {
            format!("Available stages: {}", available.join(", "))
        };

        Self::new(
            ErrorCode::StageNotFound,
            format!("Stage '{}' not found", stage),
            to_details(StageNotFoundDetails { stage, available }),
        )
        .with_hint(hint)
    }

    pub fn ssh_identity_file_not_found(
        stage: impl Into<String>,
        identity_file: impl Into<String>,
    ) -> Self {
        let details = to_details(SshIdentityFileNotFoundDetails {
            stage: stage.into(),
            identity_file: identity_file.into(),
        });

        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            "SSH identity file not found",
            details,
        )
    }

    pub fn command_failed(details: CommandFailedDetails) -> Self {
        let message = match details.target {
            CommandTarget::Local => "Local command failed",
            CommandTarget::Remote => "Remote command failed",
        };

        Self::new(ErrorCode::CommandFailed, message, to_details(details))
    }

    pub fn transfer_failed(details: TransferFailedDetails) -> Self {
        let retryable = details.exit_code == 255;
        let mut err = Self::new(
            ErrorCode::TransferFailed,
            format!("Transfer {} -> {} failed", details.source, details.destination),
            to_details(details),
        );
        err.retryable = Some(retryable);
        err
    }

    pub fn env_read_failed(
        path: impl Into<String>,
        key: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let details = to_details(EnvReadFailedDetails {
            path: path.into(),
            key: key.clone(),
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::EnvReadFailed,
            format!("{} variable not found in .env file", key),
            details,
        )
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let details = to_details(ConfigMissingKeyDetails {
            key: key.into(),
            path,
        });

        Self::new(
            ErrorCode::ConfigMissingKey,
            "Missing required configuration key",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn shared_dirs_overlap(first: impl Into<String>, second: impl Into<String>) -> Self {
        let first = first.into();
        let second = second.into();
        let message = format!("Can not share same dirs `{}` and `{}`", first, second);

        Self::new(
            ErrorCode::ConfigSharedDirsOverlap,
            message,
            to_details(SharedDirsOverlapDetails { first, second }),
        )
        .with_hint("Remove the nested entry from \"sharedDirs\" in deploy.json")
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_message_depends_on_target() {
        let local = Error::command_failed(CommandFailedDetails {
            command: "wp db reset --yes".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "Error: no db".to_string(),
            target: CommandTarget::Local,
            host: None,
        });
        assert_eq!(local.message, "Local command failed");
        assert_eq!(local.details["target"], "local");
        assert_eq!(local.details["exitCode"], 1);

        let remote = Error::command_failed(CommandFailedDetails {
            command: "rm x".to_string(),
            exit_code: 2,
            stdout: String::new(),
            stderr: String::new(),
            target: CommandTarget::Remote,
            host: Some("example.com".to_string()),
        });
        assert_eq!(remote.message, "Remote command failed");
        assert_eq!(remote.details["host"], "example.com");
    }

    #[test]
    fn transfer_failed_is_retryable_on_connection_exit() {
        let err = Error::transfer_failed(TransferFailedDetails {
            source: "a".to_string(),
            destination: "b".to_string(),
            method: "rsync".to_string(),
            exit_code: 255,
            stderr: "Connection refused".to_string(),
        });
        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.code.as_str(), "transfer.failed");
    }

    #[test]
    fn shared_dirs_overlap_names_both_dirs() {
        let err = Error::shared_dirs_overlap("web/app", "web/app/uploads");
        assert!(err.message.contains("`web/app`"));
        assert!(err.message.contains("`web/app/uploads`"));
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn stage_not_found_lists_available() {
        let err = Error::stage_not_found("prod", vec!["staging".to_string()]);
        assert_eq!(err.details["available"][0], "staging");
        assert!(err.hints[0].message.contains("staging"));
    }
}
