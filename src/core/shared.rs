//! Shared dirs/files between releases, with fixes for chrooted shared hosting.
//!
//! On Plesk-style hosts SSH sees a chrooted tree while the web server sees the
//! same files below a longer prefix. Symlink targets therefore carry the
//! stage's `chrootPathPrefix`, and paths are resolved without `readlink` or
//! `dirname`, which such hosts lack.

use crate::config::StageContext;
use crate::error::{Error, Result};
use crate::shell;
use crate::transport::CommandRunner;
use serde::Serialize;

const SYMLINK: &str = "ln -nfs";

/// Reject entries where one shared dir contains another.
pub fn validate_shared_dirs(dirs: &[String]) -> Result<()> {
    for a in dirs {
        for b in dirs {
            if a == b {
                continue;
            }
            let a_norm = format!("{}/", a.trim_end_matches('/'));
            let b_norm = format!("{}/", b.trim_end_matches('/'));
            if a_norm.starts_with(&b_norm) {
                return Err(Error::shared_dirs_overlap(a.clone(), b.clone()));
            }
        }
    }
    Ok(())
}

/// Parent of a relative path the way PHP's `dirname` would return it.
fn parent_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/",
        Some(idx) => &trimmed[..idx],
        None => ".",
    }
}

fn join(base: &str, rel: &str) -> String {
    match rel {
        "." | "" => base.to_string(),
        _ => format!("{}/{}", base.trim_end_matches('/'), rel.trim_matches('/')),
    }
}

/// Shell commands that move shared dirs/files out of the release and link them back.
pub fn link_commands(ctx: &StageContext) -> Result<Vec<String>> {
    let config = &ctx.config;
    validate_shared_dirs(&config.shared_dirs)?;

    let shared = format!("{}/shared", ctx.deploy_path);
    let release = ctx.release_path.as_str();
    let prefix = ctx.chroot_prefix();
    let q = |p: &str| shell::quote_path(p);

    let mut commands = Vec::new();

    for dir in &config.shared_dirs {
        let dir = dir.trim_matches('/');
        let shared_dir = join(&shared, dir);
        let release_dir = join(release, dir);

        commands.push(format!(
            "if [ ! -d {sd} ]; then mkdir -p {sd}; if [ -d {rd} ]; then cp -rv {rd} {sp}; fi; fi",
            sd = q(&shared_dir),
            rd = q(&release_dir),
            sp = q(&join(&shared, parent_of(dir))),
        ));
        commands.push(format!("rm -rf {}", q(&release_dir)));
        commands.push(format!("mkdir -p {}", q(parent_of(&release_dir))));
        commands.push(format!(
            "{} {} {}",
            SYMLINK,
            q(&format!("{}{}", prefix, shared_dir)),
            q(&release_dir)
        ));
    }

    for file in &config.shared_files {
        let file = file.trim_start_matches('/');
        let dirname = parent_of(file);
        let shared_file = join(&shared, file);
        let release_file = join(release, file);

        commands.push(format!("mkdir -p {}", q(&join(&shared, dirname))));
        commands.push(format!(
            "if [ ! -f {sf} ] && [ -f {rf} ]; then cp -rv {rf} {sf}; fi",
            sf = q(&shared_file),
            rf = q(&release_file),
        ));
        commands.push(format!(
            "if [ -f {rf} ]; then rm -rf {rf}; fi",
            rf = q(&release_file)
        ));
        commands.push(format!(
            "if [ ! -d {rd} ]; then mkdir -p {rd}; fi",
            rd = q(&join(release, dirname))
        ));
        commands.push(format!("touch {}", q(&shared_file)));
        commands.push(format!(
            "{} {} {}",
            SYMLINK,
            q(&format!("{}{}", prefix, shared_file)),
            q(&release_file)
        ));
    }

    Ok(commands)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLinkReport {
    pub release_path: String,
    pub shared_dirs: Vec<String>,
    pub shared_files: Vec<String>,
    pub commands_run: usize,
}

pub fn link(runner: &(impl CommandRunner + ?Sized), ctx: &StageContext) -> Result<SharedLinkReport> {
    let commands = link_commands(ctx)?;

    log_status!(
        "shared",
        "Linking {} dirs and {} files into {}",
        ctx.config.shared_dirs.len(),
        ctx.config.shared_files.len(),
        ctx.release_path
    );
    for command in &commands {
        runner.remote(command)?;
    }

    Ok(SharedLinkReport {
        release_path: ctx.release_path.clone(),
        shared_dirs: ctx.config.shared_dirs.clone(),
        shared_files: ctx.config.shared_files.clone(),
        commands_run: commands.len(),
    })
}

/// Turn `ls -l` symlink output into an absolute SSH-side path.
pub fn parse_link_target(ls_output: &str, deploy_path: &str, chroot_prefix: &str) -> String {
    let mut link = ls_output.trim();
    if !chroot_prefix.is_empty() {
        if let Some(stripped) = link.strip_prefix(chroot_prefix) {
            link = stripped;
        }
    }

    if link.starts_with('/') {
        link.to_string()
    } else {
        format!("{}/{}", deploy_path.trim_end_matches('/'), link)
    }
}

/// Where `<deployPath>/current` points, read without `readlink`.
pub fn resolve_current_path(
    runner: &(impl CommandRunner + ?Sized),
    ctx: &StageContext,
) -> Result<String> {
    let output = runner.remote(&format!(
        "ls -l {} | sed -e 's/.* -> //'",
        shell::quote_path(&format!("{}/current", ctx.deploy_path))
    ))?;

    let target = output.stdout.trim();
    if target.is_empty() {
        return Err(Error::config_invalid_value(
            "currentPath",
            None,
            format!("{}/current is not a symlink on the stage host", ctx.deploy_path),
        ));
    }

    Ok(parse_link_target(target, &ctx.deploy_path, ctx.chroot_prefix()))
}

/// Touch the previous release's index file so PHP-FPM drops its cache.
///
/// Returns the touched path, or `None` when there is nothing to touch.
pub fn reset_cache(
    runner: &(impl CommandRunner + ?Sized),
    ctx: &StageContext,
) -> Result<Option<String>> {
    let (Some(previous), Some(index)) = (&ctx.previous_release, &ctx.config.chroot_index_file)
    else {
        return Ok(None);
    };

    let path = join(previous, index);
    log_status!("shared", "Touching {} to reset FPM cache", path);
    runner.remote(&format!(
        "if [ -f {p} ]; then touch {p}; fi",
        p = shell::quote_path(&path)
    ))?;
    Ok(Some(path))
}
