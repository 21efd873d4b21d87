//! `deploy.json` loading, validation and per-stage resolution.
//!
//! The config file is the only source of paths and hosts. Nothing is kept in
//! process-wide state: callers load a [`DeployConfig`], pick a stage with
//! [`DeployConfig::resolve_stage`] and pass the resulting [`StageContext`]
//! into the operations that need it.

use crate::error::{Error, Result};
use crate::local_site::LocalSite;
use crate::shared;
use crate::shell;
use crate::template::{self, TemplateVars};
use crate::utils::io;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "deploy.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    /// Absolute path to the site root on the local machine.
    /// Defaults to the directory holding the config file.
    #[serde(default)]
    pub local_root: Option<String>,
    #[serde(default)]
    pub local_site: LocalSite,
    #[serde(default)]
    pub default_stage: Option<String>,
    #[serde(default)]
    pub stages: BTreeMap<String, Stage>,
    /// Directories mirrored by `files push` / `files pull`.
    #[serde(default)]
    pub sync_dirs: Vec<SyncDir>,
    #[serde(default)]
    pub shared_dirs: Vec<String>,
    #[serde(default)]
    pub shared_files: Vec<String>,
    /// Theme path relative to the release root.
    #[serde(default)]
    pub theme_path: Option<String>,
    #[serde(default)]
    pub sage: SageConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub search_replace: SearchReplaceConfig,
    /// Index file touched after deploys on chroot hosts, relative to the release root.
    #[serde(default)]
    pub chroot_index_file: Option<String>,

    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub host: String,
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<String>,
    pub deploy_path: String,
    /// Overrides `<deployPath>/current`.
    #[serde(default)]
    pub current_path: Option<String>,
    /// Prefix the web server sees in front of chrooted SSH paths (Plesk shared hosting).
    #[serde(default)]
    pub chroot_path_prefix: Option<String>,
}

fn default_port() -> u16 {
    22
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncDir {
    /// Local path, absolute or relative to `localRoot`. A trailing `/` syncs contents only.
    pub local: String,
    /// Remote path. May use `{{deploy_path}}` and friends.
    pub remote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SageConfig {
    #[serde(default = "default_sage_dist_path")]
    pub dist_path: String,
    #[serde(default = "default_sage_build_command")]
    pub build_command: String,
}

fn default_sage_dist_path() -> String {
    "/public".to_string()
}

fn default_sage_build_command() -> String {
    "build".to_string()
}

impl Default for SageConfig {
    fn default() -> Self {
        Self {
            dist_path: default_sage_dist_path(),
            build_command: default_sage_build_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerConfig {
    #[serde(default = "default_composer_bin")]
    pub bin: String,
    #[serde(default = "default_composer_action")]
    pub action: String,
    #[serde(default = "default_composer_options")]
    pub options: String,
}

fn default_composer_bin() -> String {
    "composer".to_string()
}

fn default_composer_action() -> String {
    "install".to_string()
}

fn default_composer_options() -> String {
    "--verbose --prefer-dist --no-progress --no-interaction --no-dev --optimize-autoloader"
        .to_string()
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            bin: default_composer_bin(),
            action: default_composer_action(),
            options: default_composer_options(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReplaceConfig {
    /// Pass `--network` so multisite tables are included.
    #[serde(default = "default_true")]
    pub network: bool,
    #[serde(default = "default_true")]
    pub skip_themes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SearchReplaceConfig {
    fn default() -> Self {
        Self {
            network: true,
            skip_themes: true,
        }
    }
}

/// Load and validate a config file. `None` means `./deploy.json`.
pub fn load(path: Option<&Path>) -> Result<DeployConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };

    if !path.exists() {
        return Err(Error::config_missing_key(
            "deploy.json",
            Some(path.display().to_string()),
        )
        .with_hint("Create deploy.json in the site root or pass --config <path>"));
    }

    let content = io::read_file(&path, &format!("read {}", path.display()))?;
    let mut config = from_json(&content, &path.display().to_string())?;

    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(|e| Error::internal_io(e.to_string(), Some("resolve cwd".to_string())))?
            .join(path)
    };
    config.source_path = Some(absolute);
    config.validate()?;

    Ok(config)
}

/// Parse config JSON without touching the filesystem.
pub fn from_json(content: &str, origin: &str) -> Result<DeployConfig> {
    serde_json::from_str(content).map_err(|e| Error::config_invalid_json(origin, e))
}

impl DeployConfig {
    /// Run every check that can be done without contacting a host.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(Error::config_missing_key("stages", self.origin()));
        }

        for (name, stage) in &self.stages {
            for (field, value) in [
                ("host", &stage.host),
                ("user", &stage.user),
                ("deployPath", &stage.deploy_path),
            ] {
                if value.trim().is_empty() {
                    return Err(Error::config_missing_key(
                        format!("stages.{}.{}", name, field),
                        self.origin(),
                    ));
                }
            }
        }

        if let Some(default) = &self.default_stage {
            if !self.stages.contains_key(default) {
                return Err(Error::stage_not_found(default.clone(), self.stage_names()));
            }
        }

        for (index, dir) in self.sync_dirs.iter().enumerate() {
            if dir.local.trim().is_empty() || dir.remote.trim().is_empty() {
                return Err(Error::config_invalid_value(
                    format!("syncDirs[{}]", index),
                    None,
                    "Both \"local\" and \"remote\" must be set",
                ));
            }
        }

        self.local_site.validate()?;
        shared::validate_shared_dirs(&self.shared_dirs)?;

        Ok(())
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.keys().cloned().collect()
    }

    fn origin(&self) -> Option<String> {
        self.source_path.as_ref().map(|p| p.display().to_string())
    }

    /// Directory the config file lives in, or the working directory.
    fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn resolved_local_root(&self) -> PathBuf {
        match &self.local_root {
            Some(root) if !root.trim().is_empty() => {
                let expanded = PathBuf::from(shellexpand::tilde(root).to_string());
                if expanded.is_absolute() {
                    expanded
                } else {
                    self.base_dir().join(expanded)
                }
            }
            _ => self.base_dir(),
        }
    }

    /// Pick a stage: explicit name, then `defaultStage`, then the only stage.
    pub fn resolve_stage(&self, name: Option<&str>) -> Result<StageContext> {
        let stage_name = match name.or(self.default_stage.as_deref()) {
            Some(n) => n.to_string(),
            None if self.stages.len() == 1 => self.stage_names().remove(0),
            None => {
                return Err(Error::validation_invalid_argument(
                    "stage",
                    "Several stages are configured; pass --stage or set \"defaultStage\"",
                    Some(self.stage_names()),
                ))
            }
        };

        let stage = self
            .stages
            .get(&stage_name)
            .cloned()
            .ok_or_else(|| Error::stage_not_found(stage_name.clone(), self.stage_names()))?;

        let deploy_path = stage.deploy_path.trim_end_matches('/').to_string();
        let current_path = stage
            .current_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| format!("{}/current", deploy_path));

        Ok(StageContext {
            name: stage_name,
            local_root: self.resolved_local_root(),
            release_path: current_path.clone(),
            previous_release: None,
            deploy_path,
            current_path,
            stage,
            config: self.clone(),
        })
    }
}

/// A stage resolved against the config: the paths every operation works with.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub name: String,
    pub stage: Stage,
    pub local_root: PathBuf,
    pub deploy_path: String,
    pub current_path: String,
    /// Release being prepared. Defaults to the current release.
    pub release_path: String,
    pub previous_release: Option<String>,
    pub config: DeployConfig,
}

impl StageContext {
    pub fn with_release_path(mut self, release_path: Option<String>) -> Self {
        if let Some(path) = release_path.filter(|p| !p.trim().is_empty()) {
            self.release_path = path.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_previous_release(mut self, previous: Option<String>) -> Self {
        self.previous_release = previous.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn chroot_prefix(&self) -> &str {
        self.stage
            .chroot_path_prefix
            .as_deref()
            .map(|p| p.trim_end_matches('/'))
            .unwrap_or("")
    }

    pub fn local_root_str(&self) -> String {
        self.local_root.display().to_string()
    }

    /// Resolve a path from the config against the local root.
    pub fn local_path(&self, path: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(path).to_string());
        if expanded.is_absolute() {
            expanded
        } else {
            self.local_root.join(expanded)
        }
    }

    pub fn template_vars(&self) -> HashMap<String, String> {
        let config = &self.config;
        let mut vars = HashMap::with_capacity(16);
        vars.insert(TemplateVars::DEPLOY_PATH.to_string(), self.deploy_path.clone());
        vars.insert(TemplateVars::CURRENT_PATH.to_string(), self.current_path.clone());
        vars.insert(TemplateVars::RELEASE_PATH.to_string(), self.release_path.clone());
        vars.insert(TemplateVars::LOCAL_ROOT.to_string(), self.local_root_str());
        vars.insert(
            TemplateVars::CHROOT_PATH_PREFIX.to_string(),
            self.chroot_prefix().to_string(),
        );
        vars.insert(TemplateVars::SAGE_DIST_PATH.to_string(), config.sage.dist_path.clone());
        vars.insert(
            TemplateVars::SAGE_BUILD_COMMAND.to_string(),
            config.sage.build_command.clone(),
        );
        vars.insert(TemplateVars::COMPOSER_BIN.to_string(), config.composer.bin.clone());
        vars.insert(
            TemplateVars::COMPOSER_ACTION.to_string(),
            config.composer.action.clone(),
        );
        vars.insert(
            TemplateVars::COMPOSER_OPTIONS.to_string(),
            config.composer.options.clone(),
        );
        if let Some(theme) = &config.theme_path {
            vars.insert(
                TemplateVars::THEME_PATH.to_string(),
                theme.trim_matches('/').to_string(),
            );
        }
        if let Some(index) = &config.chroot_index_file {
            vars.insert(TemplateVars::CHROOT_INDEX_FILE.to_string(), index.clone());
        }
        if let Some(previous) = &self.previous_release {
            vars.insert(TemplateVars::PREVIOUS_RELEASE.to_string(), previous.clone());
        }
        vars
    }

    /// Render `{{var}}` placeholders, failing on any that stay unresolved.
    pub fn render(&self, text: &str) -> Result<String> {
        self.render_with(text, &self.template_vars())
    }

    /// Render a shell command template whose path placeholders sit inside
    /// single quotes. Path values get embedded `'` escaped; command fragments
    /// such as `{{bin/composer}}` are left as written.
    pub fn render_command(&self, text: &str) -> Result<String> {
        let mut vars = self.template_vars();
        for key in TemplateVars::PATHS {
            if let Some(value) = vars.get_mut(*key) {
                *value = shell::escape_single_quote_content(value);
            }
        }
        self.render_with(text, &vars)
    }

    fn render_with(&self, text: &str, vars: &HashMap<String, String>) -> Result<String> {
        let rendered = template::render_map(text, vars);
        let leftovers = template::unresolved(&rendered);
        if let Some(name) = leftovers.first() {
            return Err(Error::config_missing_key(name.clone(), self.config.origin())
                .with_hint(format!("'{}' is used in '{}' but has no value", name, text)));
        }
        Ok(rendered)
    }

    /// `syncDirs` with remote placeholders rendered and local paths resolved.
    pub fn sync_dirs(&self) -> Result<Vec<SyncDir>> {
        self.config
            .sync_dirs
            .iter()
            .map(|dir| {
                let local = self.local_path(&dir.local).display().to_string();
                // PathBuf drops the trailing slash that means "contents only"
                let local = if dir.local.ends_with('/') && !local.ends_with('/') {
                    format!("{}/", local)
                } else {
                    local
                };
                Ok(SyncDir {
                    local,
                    remote: self.render(&dir.remote)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "localRoot": "/home/dev/site",
        "localSite": { "type": "vagrant", "vagrantDir": "/home/dev/trellis", "vagrantRoot": "/srv/www/example.com/current" },
        "defaultStage": "staging",
        "stages": {
            "staging": { "host": "example.com", "user": "deploy", "deployPath": "/var/www/staging/" },
            "production": { "host": "example.com", "user": "deploy", "port": 2222, "deployPath": "/var/www/prod", "currentPath": "/var/www/prod/live" }
        },
        "syncDirs": [ { "local": "web/app/uploads/", "remote": "{{deploy_path}}/shared/web/app/uploads/" } ],
        "sharedDirs": ["web/app/uploads"],
        "themePath": "web/app/themes/sage/"
    }"#;

    fn sample() -> DeployConfig {
        let config = from_json(SAMPLE, "test").unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn defaults_are_applied() {
        let config = sample();
        assert_eq!(config.stages["staging"].port, 22);
        assert_eq!(config.sage.dist_path, "/public");
        assert_eq!(config.composer.action, "install");
        assert!(config.search_replace.network);
    }

    #[test]
    fn resolve_stage_uses_default_and_derives_current_path() {
        let ctx = sample().resolve_stage(None).unwrap();
        assert_eq!(ctx.name, "staging");
        assert_eq!(ctx.deploy_path, "/var/www/staging");
        assert_eq!(ctx.current_path, "/var/www/staging/current");
        assert_eq!(ctx.release_path, ctx.current_path);
    }

    #[test]
    fn resolve_stage_honors_explicit_current_path() {
        let ctx = sample().resolve_stage(Some("production")).unwrap();
        assert_eq!(ctx.current_path, "/var/www/prod/live");
        assert_eq!(ctx.stage.port, 2222);
    }

    #[test]
    fn resolve_unknown_stage_fails() {
        let err = sample().resolve_stage(Some("qa")).unwrap_err();
        assert_eq!(err.code.as_str(), "stage.not_found");
    }

    #[test]
    fn ambiguous_stage_requires_flag() {
        let mut config = sample();
        config.default_stage = None;
        let err = config.resolve_stage(None).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn missing_stages_is_a_config_error() {
        let config = from_json(r#"{ "localRoot": "/tmp" }"#, "test").unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
    }

    #[test]
    fn empty_host_is_rejected() {
        let config = from_json(
            r#"{ "stages": { "s": { "host": "", "user": "u", "deployPath": "/d" } } }"#,
            "test",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.details["key"], "stages.s.host");
    }

    #[test]
    fn overlapping_shared_dirs_fail_validation() {
        let mut config = sample();
        config.shared_dirs = vec!["web/app".to_string(), "web/app/uploads".to_string()];
        let err = config.validate().unwrap_err();
        assert_eq!(err.code.as_str(), "config.shared_dirs_overlap");
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = from_json("{ nope", "deploy.json").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
    }

    #[test]
    fn sync_dirs_render_and_keep_trailing_slash() {
        let ctx = sample().resolve_stage(None).unwrap();
        let dirs = ctx.sync_dirs().unwrap();
        assert_eq!(dirs[0].local, "/home/dev/site/web/app/uploads/");
        assert_eq!(dirs[0].remote, "/var/www/staging/shared/web/app/uploads/");
    }

    #[test]
    fn render_fails_on_unknown_placeholder() {
        let ctx = sample().resolve_stage(None).unwrap();
        let err = ctx.render("cd {{nope}}").unwrap_err();
        assert_eq!(err.details["key"], "nope");
    }

    #[test]
    fn template_vars_trim_theme_path() {
        let ctx = sample().resolve_stage(None).unwrap();
        assert_eq!(
            ctx.render("{{release_path}}/{{theme_path}}").unwrap(),
            "/var/www/staging/current/web/app/themes/sage"
        );
    }

    #[test]
    fn render_command_escapes_quotes_in_paths_only() {
        let mut config = sample();
        config.composer.options = "--no-dev --prefer-dist".to_string();
        let ctx = config
            .resolve_stage(None)
            .unwrap()
            .with_release_path(Some("/var/www/it's here".to_string()));
        let template = "cd '{{release_path}}' && {{bin/composer}} install {{composer_options}}";
        assert_eq!(
            ctx.render_command(template).unwrap(),
            "cd '/var/www/it'\\''s here' && composer install --no-dev --prefer-dist"
        );
    }

    #[test]
    fn relative_local_root_resolves_against_config_dir() {
        let mut config = sample();
        config.local_root = Some("site".to_string());
        config.source_path = Some(PathBuf::from("/projects/acme/deploy.json"));
        assert_eq!(
            config.resolved_local_root(),
            PathBuf::from("/projects/acme/site")
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load(Some(Path::new("/nonexistent/deploy.json"))).unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn load_reads_file_and_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.json");
        std::fs::write(
            &path,
            r#"{ "stages": { "live": { "host": "h", "user": "u", "deployPath": "/d" } } }"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.resolved_local_root(), dir.path().to_path_buf());
        let ctx = config.resolve_stage(None).unwrap();
        assert_eq!(ctx.name, "live");
    }
}
