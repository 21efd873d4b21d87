//! Database pull/push between the local site and a stage.
//!
//! One routine serves both directions: the direction only decides which side
//! exports and which side receives. Steps run strictly in order and any failed
//! command aborts the run without rollback. A missing or unreadable `WP_HOME`
//! skips URL reconciliation but still cleans up the transferred dump.

use crate::artifact;
use crate::config::StageContext;
use crate::env_file;
use crate::error::{ErrorCode, Result};
use crate::shell;
use crate::transport::Transport;
use crate::url::url_to_domain;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Stage database replaces the local one.
    Pull,
    /// Local database replaces the stage one.
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Local,
    Remote,
}

impl SyncDirection {
    pub fn source(self) -> Side {
        match self {
            SyncDirection::Pull => Side::Remote,
            SyncDirection::Push => Side::Local,
        }
    }

    pub fn destination(self) -> Side {
        match self {
            SyncDirection::Pull => Side::Local,
            SyncDirection::Push => Side::Remote,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncDirection::Pull => "pull",
            SyncDirection::Push => "push",
        }
    }
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Local => "local",
            Side::Remote => "server",
        }
    }
}

/// Base URLs from both `.env` files and their bare domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainPair {
    pub local_url: String,
    pub remote_url: String,
    pub local_domain: String,
    pub remote_domain: String,
}

impl DomainPair {
    pub fn new(local_url: impl Into<String>, remote_url: impl Into<String>) -> Self {
        let local_url = local_url.into();
        let remote_url = remote_url.into();
        Self {
            local_domain: url_to_domain(&local_url),
            remote_domain: url_to_domain(&remote_url),
            local_url,
            remote_url,
        }
    }

    pub fn url(&self, side: Side) -> &str {
        match side {
            Side::Local => &self.local_url,
            Side::Remote => &self.remote_url,
        }
    }

    pub fn domain(&self, side: Side) -> &str {
        match side {
            Side::Local => &self.local_domain,
            Side::Remote => &self.remote_domain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Export,
    Transfer,
    CleanupSource,
    Backup,
    Reset,
    Import,
    ReplaceUrl,
    ReplaceDomain,
    CleanupDestination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStep {
    pub step: StepKind,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UrlReconciliation {
    Completed,
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSyncReport {
    pub direction: SyncDirection,
    pub stage: String,
    pub export_file: String,
    /// Where the destination database was saved before reset.
    pub backup_file: String,
    pub steps: Vec<SyncStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<DomainPair>,
    pub url_reconciliation: UrlReconciliation,
}

impl DbSyncReport {
    pub fn reconciled(&self) -> bool {
        self.url_reconciliation == UrlReconciliation::Completed
    }
}

/// Issues `wp` and file commands on either side of a stage.
struct Sides<'a, T: Transport + ?Sized> {
    transport: &'a T,
    ctx: &'a StageContext,
}

impl<'a, T: Transport + ?Sized> Sides<'a, T> {
    fn wp(&self, side: Side, args: &str) -> Result<()> {
        match side {
            Side::Local => {
                let site = &self.ctx.config.local_site;
                self.transport
                    .local(&site.wp_command(&self.ctx.local_root, args))?;
            }
            Side::Remote => {
                self.transport.remote(&format!(
                    "cd {} && wp {}",
                    shell::quote_path(&self.ctx.current_path),
                    args
                ))?;
            }
        }
        Ok(())
    }

    /// Dump path as `wp` on `side` sees it.
    fn wp_path(&self, side: Side, name: &str) -> String {
        match side {
            Side::Local => name.to_string(),
            Side::Remote => self.remote_path(name),
        }
    }

    /// Dump path for transfers and removal.
    fn file_path(&self, side: Side, name: &str) -> String {
        match side {
            Side::Local => self
                .ctx
                .config
                .local_site
                .host_dir(&self.ctx.local_root)
                .join(name)
                .display()
                .to_string(),
            Side::Remote => self.remote_path(name),
        }
    }

    fn remote_path(&self, name: &str) -> String {
        format!("{}/{}", self.ctx.deploy_path, name)
    }

    fn remove(&self, side: Side, name: &str) -> Result<()> {
        let command = format!("rm -f {}", shell::quote_path(&self.file_path(side, name)));
        match side {
            Side::Local => self.transport.local(&command)?,
            Side::Remote => self.transport.remote(&command)?,
        };
        Ok(())
    }

    fn transfer(&self, direction: SyncDirection, name: &str) -> Result<()> {
        let local = self.file_path(Side::Local, name);
        let remote = self.file_path(Side::Remote, name);
        match direction {
            SyncDirection::Pull => self.transport.download(&remote, &local),
            SyncDirection::Push => self.transport.upload(&local, &remote),
        }
    }

    fn search_replace(&self, side: Side, old: &str, new: &str, url: &str) -> Result<()> {
        let options = &self.ctx.config.search_replace;
        let mut args = format!(
            "search-replace {} {}",
            shell::quote_arg(old),
            shell::quote_arg(new)
        );
        if options.skip_themes {
            args.push_str(" --skip-themes");
        }
        args.push(' ');
        args.push_str(&shell::flag_with_value("url", url));
        if options.network {
            args.push_str(" --network");
        }
        self.wp(side, &args)
    }
}

/// Read `WP_HOME` locally, then from the stage.
pub fn read_domains(
    transport: &(impl Transport + ?Sized),
    ctx: &StageContext,
) -> Result<DomainPair> {
    log_status!("db", "Reading local WP_HOME");
    let local_url = env_file::read_local_home(&ctx.local_root)?;
    log_status!("db", "Reading server WP_HOME from {}/.env", ctx.current_path);
    let remote_url = env_file::read_remote_home(transport, &ctx.current_path, &ctx.local_root)?;
    Ok(DomainPair::new(local_url, remote_url))
}

/// Replace the destination database with the source one.
pub fn sync(
    transport: &(impl Transport + ?Sized),
    ctx: &StageContext,
    direction: SyncDirection,
) -> Result<DbSyncReport> {
    let source = direction.source();
    let destination = direction.destination();
    let sides = Sides { transport, ctx };
    let mut steps = Vec::with_capacity(9);
    let mut record = |step, side| steps.push(SyncStep { step, side });

    let export_name = artifact::export_name();
    log_status!(
        "db",
        "Exporting {} DB to {}",
        source.label(),
        sides.file_path(source, &export_name)
    );
    let export_arg = shell::quote_path(&sides.wp_path(source, &export_name));
    sides.wp(source, &format!("db export {}", export_arg))?;
    record(StepKind::Export, source);

    log_status!(
        "db",
        "Transferring {} -> {}",
        sides.file_path(source, &export_name),
        sides.file_path(destination, &export_name)
    );
    sides.transfer(direction, &export_name)?;
    record(StepKind::Transfer, destination);

    log_status!("db", "Cleaning up {} on {}", export_name, source.label());
    sides.remove(source, &export_name)?;
    record(StepKind::CleanupSource, source);

    let backup_name = artifact::backup_name();
    let backup_file = sides.file_path(destination, &backup_name);
    log_status!("db", "Backing up {} DB to {}", destination.label(), backup_file);
    let backup_arg = shell::quote_path(&sides.wp_path(destination, &backup_name));
    sides.wp(destination, &format!("db export {}", backup_arg))?;
    record(StepKind::Backup, destination);

    let restore_hint = format!(
        "The {} database was saved to {} before reset; restore it with `wp db import`",
        destination.label(),
        backup_file
    );

    log_status!("db", "Resetting {} DB", destination.label());
    sides
        .wp(destination, "db reset --yes")
        .map_err(|e| e.with_hint(restore_hint.clone()))?;
    record(StepKind::Reset, destination);

    log_status!("db", "Importing {}", sides.file_path(destination, &export_name));
    let import_arg = shell::quote_path(&sides.wp_path(destination, &export_name));
    sides
        .wp(destination, &format!("db import {}", import_arg))
        .map_err(|e| e.with_hint(restore_hint.clone()))?;
    record(StepKind::Import, destination);

    let (domains, url_reconciliation) = match read_domains(transport, ctx) {
        Ok(domains) => {
            let old_domain = domains.domain(source);
            log_status!("db", "Updating URLs in the {} DB", destination.label());
            sides.search_replace(
                destination,
                domains.url(source),
                domains.url(destination),
                old_domain,
            )?;
            record(StepKind::ReplaceUrl, destination);

            // Multisite stores bare domains as well
            sides.search_replace(
                destination,
                old_domain,
                domains.domain(destination),
                old_domain,
            )?;
            record(StepKind::ReplaceDomain, destination);

            (Some(domains), UrlReconciliation::Completed)
        }
        Err(e) if e.code == ErrorCode::EnvReadFailed => {
            let problem = e.details["problem"].as_str().unwrap_or_default();
            let path = e.details["path"].as_str().unwrap_or_default();
            let reason = format!("{} ({}: {})", e.message, path, problem);
            log_status!("db", "Skipping URL update: {}", reason);
            (None, UrlReconciliation::Skipped { reason })
        }
        Err(e) => return Err(e),
    };

    log_status!(
        "db",
        "Cleaning up {} on {}",
        sides.file_path(destination, &export_name),
        destination.label()
    );
    sides.remove(destination, &export_name)?;
    record(StepKind::CleanupDestination, destination);

    Ok(DbSyncReport {
        direction,
        stage: ctx.name.clone(),
        export_file: export_name,
        backup_file,
        steps,
        domains,
        url_reconciliation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_swap_roles() {
        assert_eq!(SyncDirection::Pull.source(), Side::Remote);
        assert_eq!(SyncDirection::Pull.destination(), Side::Local);
        assert_eq!(SyncDirection::Push.source(), Side::Local);
        assert_eq!(SyncDirection::Push.destination(), Side::Remote);
    }

    #[test]
    fn domain_pair_normalizes_urls() {
        let pair = DomainPair::new("http://example.test/", "https://example.com");
        assert_eq!(pair.domain(Side::Local), "example.test");
        assert_eq!(pair.domain(Side::Remote), "example.com");
        assert_eq!(pair.url(Side::Local), "http://example.test/");
    }

    #[test]
    fn report_serializes_skip_reason() {
        let report = DbSyncReport {
            direction: SyncDirection::Push,
            stage: "staging".to_string(),
            export_file: "_db_export_x.sql".to_string(),
            backup_file: "/var/www/_db_backup_x.sql".to_string(),
            steps: vec![SyncStep {
                step: StepKind::CleanupSource,
                side: Side::Local,
            }],
            domains: None,
            url_reconciliation: UrlReconciliation::Skipped {
                reason: "no WP_HOME".to_string(),
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["direction"], "push");
        assert_eq!(json["steps"][0]["step"], "cleanup_source");
        assert_eq!(json["urlReconciliation"]["status"], "skipped");
        assert_eq!(json["urlReconciliation"]["reason"], "no WP_HOME");
        assert!(json.get("domains").is_none());
        assert!(!report.reconciled());
    }
}
