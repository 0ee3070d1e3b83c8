//! Validation for `menuseq validate`: load every menu file and the config,
//! then audit the merged registry.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::core::invariants::audit_registry;
use crate::io::config::load_config;
use crate::io::menu_store::load_menus;

/// High-level validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidateOutcome {
    Ok { inputs: usize, steps: usize },
    /// Files loaded, but the dependency graph has problems.
    Problems(Vec<String>),
}

/// Load `menus` and the config at `config_path` and audit the result.
///
/// Unreadable or malformed files are errors. Graph problems (unknown
/// dependencies, cycles, unschedulable inputs) are collected in the outcome.
pub fn validate_menus(menus: &[PathBuf], config_path: &Path) -> Result<ValidateOutcome> {
    let menu = load_menus(menus).context("load menu")?;
    let config = load_config(config_path).context("load config")?;

    let problems = audit_registry(&menu.registry, &config);
    info!(
        inputs = menu.registry.len(),
        problems = problems.len(),
        "audited menu"
    );
    if !problems.is_empty() {
        return Ok(ValidateOutcome::Problems(problems));
    }
    Ok(ValidateOutcome::Ok {
        inputs: menu.registry.len(),
        steps: menu.steps.len(),
    })
}
