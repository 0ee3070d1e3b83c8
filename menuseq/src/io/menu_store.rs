//! Menu files: `[[steps]]` and `[[inputs]]` tables loaded into one registry.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::ResolutionError;
use crate::menu::decl::is_valid_name;
use crate::menu::{InputDecl, MenuRegistry, StepContext};

/// On-disk shape of a menu file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenuFile {
    pub steps: Vec<StepContext>,
    pub inputs: Vec<InputDecl>,
}

/// Registry and step list assembled from one or more menu files.
pub struct LoadedMenu {
    pub registry: MenuRegistry,
    pub steps: Vec<StepContext>,
    pub sources: Vec<PathBuf>,
}

pub fn read_menu_file(path: &Path) -> Result<MenuFile> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

pub fn load_menu(path: &Path) -> Result<LoadedMenu> {
    load_menus(&[path.to_path_buf()])
}

/// Load and merge menu files.
///
/// Every file that declares steps must declare the same list. A name
/// produced in two files is an error naming both files.
pub fn load_menus(paths: &[PathBuf]) -> Result<LoadedMenu> {
    if paths.is_empty() {
        bail!("no menu files given");
    }

    let mut registry = MenuRegistry::new();
    let mut steps: Option<(Vec<StepContext>, &Path)> = None;
    let mut fixed_steps: Vec<(String, usize, String)> = Vec::new();

    for path in paths {
        let menu = read_menu_file(path)?;
        let origin = path.display().to_string();
        debug!(
            path = %origin,
            inputs = menu.inputs.len(),
            steps = menu.steps.len(),
            "loaded menu file"
        );

        if !menu.steps.is_empty() {
            check_steps(&menu.steps).with_context(|| format!("invalid steps in {origin}"))?;
            let (existing, first) =
                steps.get_or_insert_with(|| (menu.steps.clone(), path.as_path()));
            if *existing != menu.steps {
                bail!(
                    "steps in {origin} differ from steps in {}",
                    first.display()
                );
            }
        }

        for decl in &menu.inputs {
            let (spec, options) = decl
                .compile(&origin)
                .map_err(|msg| anyhow!("{origin}: {msg}"))?;
            let primary = decl.produces[0].clone();
            if let Some(step) = options.step_override.or(decl.step) {
                fixed_steps.push((primary, step, origin.clone()));
            }
            if let Err(err) = registry.add_with_options(spec, options) {
                return Err(duplicate_error(&registry, err, &origin));
            }
        }
    }

    let (steps, _) = steps.ok_or_else(|| anyhow!("no steps declared in any menu file"))?;
    for (input, step, origin) in fixed_steps {
        if step >= steps.len() {
            bail!(
                "{origin}: input '{input}' is fixed at step {step} but only {} steps are declared",
                steps.len()
            );
        }
    }

    Ok(LoadedMenu {
        registry,
        steps,
        sources: paths.to_vec(),
    })
}

fn check_steps(steps: &[StepContext]) -> Result<()> {
    let mut seen = IndexSet::new();
    for step in steps {
        if !is_valid_name(&step.name) {
            bail!("invalid step name '{}'", step.name);
        }
        if !seen.insert(step.name.as_str()) {
            bail!("step '{}' is declared twice", step.name);
        }
    }
    Ok(())
}

fn duplicate_error(registry: &MenuRegistry, err: ResolutionError, origin: &str) -> anyhow::Error {
    let ResolutionError::DuplicateProducer { names } = &err else {
        return anyhow!("{origin}: {err}");
    };
    let earlier: IndexSet<&str> = names
        .iter()
        .filter_map(|name| registry.get(name).ok())
        .filter_map(|spec| spec.origin())
        .collect();
    if earlier.is_empty() {
        anyhow!("{origin}: {err}")
    } else {
        let earlier: Vec<&str> = earlier.into_iter().collect();
        anyhow!("{origin}: {err} (already declared in {})", earlier.join(", "))
    }
}
