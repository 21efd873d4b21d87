//! String template rendering utilities.

use std::collections::HashMap;

pub struct TemplateVars;

impl TemplateVars {
    pub const DEPLOY_PATH: &'static str = "deploy_path";
    pub const CURRENT_PATH: &'static str = "current_path";
    pub const RELEASE_PATH: &'static str = "release_path";
    pub const PREVIOUS_RELEASE: &'static str = "previous_release";
    pub const LOCAL_ROOT: &'static str = "local_root";
    pub const THEME_PATH: &'static str = "theme_path";
    pub const CHROOT_PATH_PREFIX: &'static str = "chroot_path_prefix";
    pub const CHROOT_INDEX_FILE: &'static str = "chroot_index_file";
    pub const SAGE_DIST_PATH: &'static str = "sage/dist_path";
    pub const SAGE_BUILD_COMMAND: &'static str = "sage/build_command";
    pub const COMPOSER_BIN: &'static str = "bin/composer";
    pub const COMPOSER_ACTION: &'static str = "composer_action";
    pub const COMPOSER_OPTIONS: &'static str = "composer_options";

    /// Variables holding filesystem paths, as opposed to command fragments.
    pub const PATHS: &'static [&'static str] = &[
        Self::DEPLOY_PATH,
        Self::CURRENT_PATH,
        Self::RELEASE_PATH,
        Self::PREVIOUS_RELEASE,
        Self::LOCAL_ROOT,
        Self::THEME_PATH,
        Self::CHROOT_PATH_PREFIX,
        Self::CHROOT_INDEX_FILE,
        Self::SAGE_DIST_PATH,
    ];
}

pub fn render_map(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// Names of `{{...}}` placeholders left in a rendered string.
pub fn unresolved(rendered: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = rendered;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        names.push(after[..end].to_string());
        rest = &after[end + 2..];
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_map_handles_slash_keys() {
        let mut vars = HashMap::new();
        vars.insert("bin/composer".to_string(), "composer2".to_string());
        assert_eq!(render_map("{{bin/composer}} install", &vars), "composer2 install");
    }

    #[test]
    fn unresolved_lists_leftovers() {
        assert_eq!(
            unresolved("cd {{a}} && {{b/c}} run"),
            vec!["a".to_string(), "b/c".to_string()]
        );
        assert!(unresolved("plain").is_empty());
    }
}
