//! Names for database dumps and file backups.

use chrono::{DateTime, Local};
use uuid::Uuid;

pub const EXPORT_PREFIX: &str = "_db_export_";
pub const BACKUP_PREFIX: &str = "_db_backup_";
pub const FILES_BACKUP_PREFIX: &str = "_backup_";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

fn stamp(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn dump_name(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}{}_{}.sql", prefix, stamp(now), suffix())
}

/// `_db_export_YYYY-MM-DD_HH-MM-SS_<8 hex>.sql`
pub fn export_name() -> String {
    dump_name(EXPORT_PREFIX, Local::now())
}

/// `_db_backup_YYYY-MM-DD_HH-MM-SS_<8 hex>.sql`
pub fn backup_name() -> String {
    dump_name(BACKUP_PREFIX, Local::now())
}

/// `_backup_YYYY-MM-DD_HH-MM-SS.zip`, excluded from later backups by `_backup_*.zip`.
pub fn files_backup_name() -> String {
    format!("{}{}.zip", FILES_BACKUP_PREFIX, stamp(Local::now()))
}
