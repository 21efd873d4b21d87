//! Named one-shot tasks for Bedrock, Sage and Trellis sites.
//!
//! A recipe is either a list of steps or a composite of other recipes, run in
//! order. Step commands are `{{var}}` templates rendered against the stage;
//! path placeholders are always written inside single quotes.

use crate::config::StageContext;
use crate::error::{Error, Result};
use crate::shared;
use crate::transport::Transport;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Shell command on the stage host.
    Remote(&'static str),
    /// Shell command on this machine.
    Local(&'static str),
    Upload {
        local: &'static str,
        remote: &'static str,
    },
    /// Touch the previous release's index file.
    ResetCache,
}

#[derive(Debug, Clone, Copy)]
pub enum Body {
    Steps(&'static [Step]),
    Composite(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Recipe {
    pub name: &'static str,
    pub description: &'static str,
    pub body: Body,
}

pub const RECIPES: &[Recipe] = &[
    Recipe {
        name: "activate:plugins",
        description: "Activate all plugins",
        body: Body::Steps(&[Step::Remote(
            "cd '{{release_path}}' && wp plugin activate --all",
        )]),
    },
    Recipe {
        name: "bedrock:vendors",
        description: "Install Bedrock vendors with Composer",
        body: Body::Steps(&[Step::Remote(
            "cd '{{release_path}}' && {{bin/composer}} {{composer_action}} {{composer_options}}",
        )]),
    },
    Recipe {
        name: "sage:vendors",
        description: "Install theme vendors with Composer on the stage",
        body: Body::Steps(&[Step::Remote(
            "cd '{{release_path}}/{{theme_path}}' && {{bin/composer}} {{composer_action}} {{composer_options}}",
        )]),
    },
    Recipe {
        name: "sage:compile",
        description: "Compile theme assets locally for production",
        body: Body::Steps(&[Step::Local(
            "cd '{{local_root}}/{{theme_path}}' && yarn run {{sage/build_command}}",
        )]),
    },
    Recipe {
        name: "sage:clear_assets",
        description: "Remove the theme's dist folder on the stage",
        body: Body::Steps(&[Step::Remote(
            "rm -rf '{{release_path}}/{{theme_path}}{{sage/dist_path}}'",
        )]),
    },
    Recipe {
        name: "sage:upload_assets_only",
        description: "Upload local theme assets without removing old ones",
        body: Body::Steps(&[Step::Upload {
            local: "{{local_root}}/{{theme_path}}{{sage/dist_path}}",
            remote: "{{release_path}}/{{theme_path}}",
        }]),
    },
    Recipe {
        name: "sage:upload_assets",
        description: "Replace the stage's theme assets with local ones",
        body: Body::Composite(&["sage:clear_assets", "sage:upload_assets_only"]),
    },
    Recipe {
        name: "push:assets",
        description: "Build theme assets and upload them",
        body: Body::Composite(&["sage:compile", "sage:upload_assets"]),
    },
    Recipe {
        name: "trellis:remove",
        description: "Remove Trellis and move site/ up to the release root",
        body: Body::Steps(&[
            Step::Remote("mv '{{release_path}}'/site/* '{{release_path}}'"),
            Step::Remote("rm -rf '{{release_path}}/site'"),
            Step::Remote("rm -rf '{{release_path}}/trellis'"),
        ]),
    },
    Recipe {
        name: "reset:cache",
        description: "Touch the previous release's index file to reset the FPM cache",
        body: Body::Steps(&[Step::ResetCache]),
    },
];

pub fn find(name: &str) -> Result<&'static Recipe> {
    RECIPES.iter().find(|r| r.name == name).ok_or_else(|| {
        Error::validation_invalid_argument(
            "recipe",
            format!("Unknown recipe '{}'", name),
            Some(RECIPES.iter().map(|r| r.name.to_string()).collect()),
        )
        .with_hint("Run `bedrock-deploy recipe list` to see available recipes")
    })
}

/// Leaf steps of a recipe in run order, each with the recipe it came from.
pub fn expand(name: &str) -> Result<Vec<(&'static str, Step)>> {
    let recipe = find(name)?;
    let mut steps = Vec::new();
    match recipe.body {
        Body::Steps(list) => steps.extend(list.iter().map(|s| (recipe.name, *s))),
        Body::Composite(parts) => {
            for part in parts {
                steps.extend(expand(part)?);
            }
        }
    }
    Ok(steps)
}

#[derive(Debug, Serialize)]
pub struct RecipeInfo {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<&'static str>,
}

pub fn list() -> Vec<RecipeInfo> {
    RECIPES
        .iter()
        .map(|r| RecipeInfo {
            name: r.name,
            description: r.description,
            runs: match r.body {
                Body::Composite(parts) => parts.to_vec(),
                Body::Steps(_) => Vec::new(),
            },
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ExecutedStep {
    pub recipe: &'static str,
    pub target: &'static str,
    pub command: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeReport {
    pub name: String,
    pub stage: String,
    pub release_path: String,
    pub steps: Vec<ExecutedStep>,
}

pub fn run(
    transport: &(impl Transport + ?Sized),
    ctx: &StageContext,
    name: &str,
) -> Result<RecipeReport> {
    let steps = expand(name)?;

    // Render everything first so a missing variable fails before any command runs
    let mut rendered = Vec::with_capacity(steps.len());
    for (recipe, step) in &steps {
        let (target, command) = match step {
            Step::Remote(template) => ("remote", ctx.render_command(template)?),
            Step::Local(template) => ("local", ctx.render_command(template)?),
            Step::Upload { local, remote } => (
                "upload",
                format!("{} -> {}", ctx.render(local)?, ctx.render(remote)?),
            ),
            Step::ResetCache => ("remote", String::new()),
        };
        rendered.push((*recipe, *step, target, command));
    }

    let mut executed = Vec::new();
    for (recipe, step, target, command) in rendered {
        log_status!("recipe", "[{}] {}", recipe, command);
        let command = match step {
            Step::Remote(_) => {
                transport.remote(&command)?;
                command
            }
            Step::Local(_) => {
                transport.local(&command)?;
                command
            }
            Step::Upload { local, remote } => {
                transport.upload(&ctx.render(local)?, &ctx.render(remote)?)?;
                command
            }
            Step::ResetCache => match shared::reset_cache(transport, ctx)? {
                Some(path) => format!("touch {}", path),
                None => {
                    log_status!("recipe", "No previous release or index file, nothing to touch");
                    continue;
                }
            },
        };
        executed.push(ExecutedStep {
            recipe,
            target,
            command,
        });
    }

    Ok(RecipeReport {
        name: name.to_string(),
        stage: ctx.name.clone(),
        release_path: ctx.release_path.clone(),
        steps: executed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composites_expand_depth_first() {
        let names: Vec<_> = expand("push:assets")
            .unwrap()
            .into_iter()
            .map(|(recipe, _)| recipe)
            .collect();
        assert_eq!(
            names,
            vec!["sage:compile", "sage:clear_assets", "sage:upload_assets_only"]
        );
    }

    #[test]
    fn every_composite_part_exists() {
        for recipe in RECIPES {
            expand(recipe.name).unwrap();
        }
    }

    #[test]
    fn unknown_recipe_lists_alternatives() {
        let err = find("deploy:everything").unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert!(err.details["tried"].as_array().unwrap().len() >= 10);
    }

    #[test]
    fn shell_steps_quote_every_path_placeholder() {
        for recipe in RECIPES {
            let Body::Steps(steps) = recipe.body else {
                continue;
            };
            for step in steps {
                let (Step::Remote(template) | Step::Local(template)) = step else {
                    continue;
                };
                for word in template.split_whitespace() {
                    if word.contains("{{release_path}}") || word.contains("{{local_root}}") {
                        assert!(word.starts_with('\''), "{}: {}", recipe.name, template);
                    }
                }
            }
        }
    }

    #[test]
    fn list_shows_composite_parts() {
        let info = list();
        let upload = info.iter().find(|r| r.name == "sage:upload_assets").unwrap();
        assert_eq!(upload.runs, vec!["sage:clear_assets", "sage:upload_assets_only"]);
    }
}
