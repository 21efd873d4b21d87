//! Make sure a release has a Bedrock `.env`.
//!
//! The file is copied from the previous release when one exists there.
//! Otherwise it is generated from the given settings with fresh salts.

use crate::config::StageContext;
use crate::env_file::ENV_FILE;
use crate::error::{Error, Result};
use crate::shell;
use crate::transport::CommandRunner;
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_DB_HOST: &str = "127.0.0.1";
pub const WP_ENVS: [&str; 3] = ["development", "staging", "production"];
pub const PROTOCOLS: [&str; 2] = ["http", "https"];

const SALT_LENGTH: usize = 64;
const SALT_CHARS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_ []{}<>~+=,.;:/?|";
const SALT_KEYS: [&str; 8] = [
    "AUTH_KEY",
    "SECURE_AUTH_KEY",
    "LOGGED_IN_KEY",
    "NONCE_KEY",
    "AUTH_SALT",
    "SECURE_AUTH_SALT",
    "LOGGED_IN_SALT",
    "NONCE_SALT",
];
const HEREDOC_MARKER: &str = "BEDROCK_ENV";

#[derive(Debug, Clone)]
pub struct EnvSettings {
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub wp_env: String,
    pub protocol: String,
    pub domain: String,
}

impl EnvSettings {
    pub fn validate(&self) -> Result<()> {
        if !WP_ENVS.contains(&self.wp_env.as_str()) {
            return Err(Error::validation_invalid_argument(
                "wp-env",
                format!("Unknown environment '{}'", self.wp_env),
                Some(WP_ENVS.iter().map(|s| s.to_string()).collect()),
            ));
        }
        if !PROTOCOLS.contains(&self.protocol.as_str()) {
            return Err(Error::validation_invalid_argument(
                "protocol",
                format!("Unknown protocol '{}'", self.protocol),
                Some(PROTOCOLS.iter().map(|s| s.to_string()).collect()),
            ));
        }
        for (field, value) in [
            ("db-name", &self.db_name),
            ("db-user", &self.db_user),
            ("db-host", &self.db_host),
            ("domain", &self.domain),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation_invalid_argument(
                    field,
                    "Value must not be empty",
                    None,
                ));
            }
        }
        for (field, value) in [
            ("db-name", &self.db_name),
            ("db-user", &self.db_user),
            ("db-password", &self.db_password),
            ("db-host", &self.db_host),
            ("domain", &self.domain),
        ] {
            if value.contains('\'') || value.contains('\n') {
                return Err(Error::validation_invalid_argument(
                    field,
                    "Single quotes and line breaks can not be stored in .env values",
                    None,
                ));
            }
        }
        Ok(())
    }

    pub fn home(&self) -> String {
        format!("{}://{}", self.protocol, self.domain.trim_end_matches('/'))
    }
}

/// 64 characters from the WordPress password alphabet.
pub fn generate_salt() -> String {
    // Largest multiple of the alphabet size below 256, so every char is equally likely
    let limit = 256 - 256 % SALT_CHARS.len();
    let mut salt = String::with_capacity(SALT_LENGTH);

    while salt.len() < SALT_LENGTH {
        let bytes = Uuid::new_v4().into_bytes();
        for (index, byte) in bytes.iter().enumerate() {
            // version and variant bits
            if index == 6 || index == 8 {
                continue;
            }
            let value = *byte as usize;
            if value < limit && salt.len() < SALT_LENGTH {
                salt.push(SALT_CHARS[value % SALT_CHARS.len()] as char);
            }
        }
    }

    salt
}

pub fn render_env(settings: &EnvSettings, mut salt: impl FnMut() -> String) -> String {
    let home = settings.home();
    let mut content = format!(
        "DB_NAME='{}'\nDB_USER='{}'\nDB_PASSWORD='{}'\nDB_HOST='{}'\nWP_ENV='{}'\n\
         WP_HOME='{home}'\nWP_SITEURL='{home}/wp'\nDOMAIN_CURRENT_SITE='{}'\nPROTOCOL='{}'\n\n",
        settings.db_name,
        settings.db_user,
        settings.db_password,
        settings.db_host,
        settings.wp_env,
        settings.domain.trim_end_matches('/'),
        settings.protocol,
    );
    for key in SALT_KEYS {
        content.push_str(&format!("{}='{}'\n", key, salt()));
    }
    content
}

/// Write `content` to `path` on the host without any shell expansion.
pub fn write_command(path: &str, content: &str) -> String {
    format!(
        "cat > {} <<'{marker}'\n{}{marker}",
        shell::quote_path(path),
        content,
        marker = HEREDOC_MARKER
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvAction {
    Copied,
    Generated,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvEnsureReport {
    pub release_path: String,
    pub action: EnvAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied_from: Option<String>,
}

pub fn ensure(
    runner: &(impl CommandRunner + ?Sized),
    ctx: &StageContext,
    settings: Option<&EnvSettings>,
) -> Result<EnvEnsureReport> {
    let target = format!("{}/{}", ctx.release_path, ENV_FILE);

    if let Some(previous) = &ctx.previous_release {
        let source = format!("{}/{}", previous.trim_end_matches('/'), ENV_FILE);
        let probe = runner.remote(&format!(
            "if [ -f {} ]; then echo true; fi",
            shell::quote_path(&source)
        ))?;
        if probe.stdout.trim() == "true" {
            log_status!("env", "Copying {} to {}", source, ctx.release_path);
            runner.remote(&format!(
                "cp {} {}",
                shell::quote_path(&source),
                shell::quote_path(&ctx.release_path)
            ))?;
            return Ok(EnvEnsureReport {
                release_path: ctx.release_path.clone(),
                action: EnvAction::Copied,
                copied_from: Some(source),
            });
        }
    }

    let settings = settings.ok_or_else(|| {
        Error::validation_invalid_argument(
            "db-name",
            "No .env in a previous release; database settings are required to generate one",
            None,
        )
        .with_hint("Pass --db-name, --db-user, --db-password and --domain")
    })?;
    settings.validate()?;

    log_status!("env", "Generating {}", target);
    runner.remote(&write_command(&target, &render_env(settings, generate_salt)))?;

    Ok(EnvEnsureReport {
        release_path: ctx.release_path.clone(),
        action: EnvAction::Generated,
        copied_from: None,
    })
}
