//! How WP-CLI is reached on the developer machine.
//!
//! A Bedrock site runs locally inside a Vagrant box (Trellis), inside a
//! docker-compose service, or directly on the host. Each variant knows how to
//! wrap a `wp` invocation and which host directory maps to WP-CLI's working
//! directory, so dump files can be referenced by bare name.

use crate::error::{Error, Result};
use crate::shell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LocalSite {
    /// `vagrant ssh` into the box and run `wp` in `vagrant_root`,
    /// which mirrors the local root.
    #[serde(rename_all = "camelCase")]
    Vagrant {
        vagrant_dir: String,
        vagrant_root: String,
    },
    /// `docker-compose run --rm <service> wp ... --allow-root` from the local root.
    #[serde(rename_all = "camelCase")]
    Docker {
        #[serde(default = "default_docker_service")]
        service: String,
        /// Local-root-relative directory mounted as the container's working directory.
        #[serde(default = "default_docker_workdir")]
        workdir: String,
    },
    /// `wp` is on the host PATH.
    #[default]
    Direct,
}

fn default_docker_service() -> String {
    "wordpress".to_string()
}

fn default_docker_workdir() -> String {
    "web".to_string()
}

impl LocalSite {
    pub fn validate(&self) -> Result<()> {
        match self {
            LocalSite::Vagrant {
                vagrant_dir,
                vagrant_root,
            } => {
                if vagrant_dir.trim().is_empty() {
                    return Err(Error::config_missing_key("localSite.vagrantDir", None));
                }
                if vagrant_root.trim().is_empty() {
                    return Err(Error::config_missing_key("localSite.vagrantRoot", None));
                }
                Ok(())
            }
            LocalSite::Docker { service, .. } => {
                if service.trim().is_empty() {
                    return Err(Error::config_invalid_value(
                        "localSite.service",
                        Some(service.clone()),
                        "Service name must not be empty",
                    ));
                }
                Ok(())
            }
            LocalSite::Direct => Ok(()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LocalSite::Vagrant { .. } => "vagrant",
            LocalSite::Docker { .. } => "docker",
            LocalSite::Direct => "direct",
        }
    }

    /// Host directory that WP-CLI sees as its working directory.
    pub fn host_dir(&self, local_root: &Path) -> PathBuf {
        match self {
            LocalSite::Docker { workdir, .. } if !workdir.trim_matches('/').is_empty() => {
                local_root.join(workdir.trim_matches('/'))
            }
            _ => local_root.to_path_buf(),
        }
    }

    /// Wrap already-quoted `wp` arguments into a command runnable on the host.
    pub fn wp_command(&self, local_root: &Path, wp_args: &str) -> String {
        let root = shell::quote_path(&local_root.display().to_string());
        match self {
            LocalSite::Vagrant {
                vagrant_dir,
                vagrant_root,
            } => {
                let inner = format!("cd {}; wp {}", shell::quote_path(vagrant_root), wp_args);
                format!(
                    "cd {} && vagrant ssh -- -t {}",
                    shell::quote_path(&resolve_against(local_root, vagrant_dir)),
                    shell::escape_command_for_shell(&inner)
                )
            }
            LocalSite::Docker { service, .. } => format!(
                "cd {} && docker-compose run --rm {} wp {} --allow-root",
                root,
                shell::quote_arg(service),
                wp_args
            ),
            LocalSite::Direct => format!("cd {} && wp {}", root, wp_args),
        }
    }
}

fn resolve_against(base: &Path, path: &str) -> String {
    let expanded = PathBuf::from(shellexpand::tilde(path).to_string());
    if expanded.is_absolute() {
        expanded.display().to_string()
    } else {
        base.join(expanded).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/home/dev/site")
    }

    #[test]
    fn deserializes_tagged_variants() {
        let vagrant: LocalSite = serde_json::from_str(
            r#"{ "type": "vagrant", "vagrantDir": "../trellis", "vagrantRoot": "/srv/www/a/current" }"#,
        )
        .unwrap();
        assert_eq!(vagrant.kind(), "vagrant");

        let docker: LocalSite = serde_json::from_str(r#"{ "type": "docker" }"#).unwrap();
        assert_eq!(
            docker,
            LocalSite::Docker {
                service: "wordpress".to_string(),
                workdir: "web".to_string()
            }
        );

        let direct: LocalSite = serde_json::from_str(r#"{ "type": "direct" }"#).unwrap();
        assert_eq!(direct, LocalSite::Direct);
    }

    #[test]
    fn vagrant_command_nests_wp_call() {
        let site = LocalSite::Vagrant {
            vagrant_dir: "../trellis".to_string(),
            vagrant_root: "/srv/www/a/current".to_string(),
        };
        let cmd = site.wp_command(&root(), "db reset --yes");
        assert_eq!(
            cmd,
            "cd '/home/dev/site/../trellis' && vagrant ssh -- -t 'cd '\\''/srv/www/a/current'\\''; wp db reset --yes'"
        );
        assert_eq!(site.host_dir(&root()), root());
    }

    #[test]
    fn docker_command_allows_root_and_maps_workdir() {
        let site = LocalSite::Docker {
            service: "wordpress".to_string(),
            workdir: "web/".to_string(),
        };
        assert_eq!(
            site.wp_command(&root(), "db import dump.sql"),
            "cd '/home/dev/site' && docker-compose run --rm wordpress wp db import dump.sql --allow-root"
        );
        assert_eq!(site.host_dir(&root()), PathBuf::from("/home/dev/site/web"));
    }

    #[test]
    fn direct_command_runs_in_local_root() {
        assert_eq!(
            LocalSite::Direct.wp_command(&root(), "db export x.sql"),
            "cd '/home/dev/site' && wp db export x.sql"
        );
    }

    #[test]
    fn empty_vagrant_dir_is_rejected() {
        let site = LocalSite::Vagrant {
            vagrant_dir: " ".to_string(),
            vagrant_root: "/srv".to_string(),
        };
        assert_eq!(
            site.validate().unwrap_err().code.as_str(),
            "config.missing_key"
        );
    }
}
