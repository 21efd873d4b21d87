//! Upload and download of `syncDirs`, with zip backups of the receiving side.
//!
//! Files deleted on one side are never deleted on the other. A `local` or
//! `remote` entry ending in `/` transfers the directory contents only.

use crate::artifact::{self, FILES_BACKUP_PREFIX};
use crate::config::{StageContext, SyncDir};
use crate::db_sync::{Side, SyncDirection};
use crate::error::Result;
use crate::shell;
use crate::transport::Transport;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub dir: String,
    pub archive: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesReport {
    pub direction: SyncDirection,
    pub stage: String,
    pub backups: Vec<BackupEntry>,
    pub transferred: Vec<SyncDir>,
}

/// `zip` command backing up `dir` next to itself, skipping earlier backups.
pub fn backup_command(dir: &str, archive: &str) -> String {
    let exclude = format!("-x \"{}*.zip\"", FILES_BACKUP_PREFIX);
    if dir.ends_with('/') {
        format!(
            "cd {} && zip -r {} . {}",
            shell::quote_path(dir),
            shell::quote_arg(archive),
            exclude
        )
    } else {
        let trimmed = dir.trim_end_matches('/');
        let (parent, name) = match trimmed.rfind('/') {
            Some(0) => ("/", &trimmed[1..]),
            Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
            None => (".", trimmed),
        };
        format!(
            "cd {} && zip -r {} {} {}",
            shell::quote_path(parent),
            shell::quote_arg(archive),
            shell::quote_arg(name),
            exclude
        )
    }
}

/// Zip every sync dir on `side`.
pub fn backup(
    transport: &(impl Transport + ?Sized),
    ctx: &StageContext,
    side: Side,
) -> Result<Vec<BackupEntry>> {
    let mut backups = Vec::new();

    for dir in ctx.sync_dirs()? {
        let path = match side {
            Side::Local => dir.local,
            Side::Remote => dir.remote,
        };
        let archive = artifact::files_backup_name();
        log_status!("files", "Backing up {} files in {} to {}", side.label(), path, archive);

        let command = backup_command(&path, &archive);
        match side {
            Side::Local => transport.local(&command)?,
            Side::Remote => transport.remote(&command)?,
        };
        backups.push(BackupEntry { dir: path, archive });
    }

    Ok(backups)
}

/// Push uploads local to remote, pull downloads remote to local.
pub fn sync(
    transport: &(impl Transport + ?Sized),
    ctx: &StageContext,
    direction: SyncDirection,
    with_backup: bool,
) -> Result<FilesReport> {
    let dirs = ctx.sync_dirs()?;

    let backups = if with_backup {
        backup(transport, ctx, direction.destination())?
    } else {
        Vec::new()
    };

    for dir in &dirs {
        match direction {
            SyncDirection::Push => {
                log_status!("files", "Uploading {} -> {}", dir.local, dir.remote);
                transport.upload(&dir.local, &dir.remote)?;
            }
            SyncDirection::Pull => {
                log_status!("files", "Downloading {} -> {}", dir.remote, dir.local);
                transport.download(&dir.remote, &dir.local)?;
            }
        }
    }

    Ok(FilesReport {
        direction,
        stage: ctx.name.clone(),
        backups,
        transferred: dirs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_zips_contents() {
        assert_eq!(
            backup_command("/srv/shared/uploads/", "_backup_1.zip"),
            "cd '/srv/shared/uploads/' && zip -r _backup_1.zip . -x \"_backup_*.zip\""
        );
    }

    #[test]
    fn plain_dir_zips_from_parent() {
        assert_eq!(
            backup_command("/srv/shared/uploads", "_backup_1.zip"),
            "cd '/srv/shared' && zip -r _backup_1.zip uploads -x \"_backup_*.zip\""
        );
        assert_eq!(
            backup_command("uploads", "_backup_1.zip"),
            "cd '.' && zip -r _backup_1.zip uploads -x \"_backup_*.zip\""
        );
    }
}
