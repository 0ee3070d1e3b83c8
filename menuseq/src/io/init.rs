//! Initialization helpers for `.menuseq/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

const SAMPLE_MENU: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/menus/jetmet.toml"));

const RECO_TEMPLATE: &str = "\
# Reconstruction options used by `menuseq plan` and `menuseq validate`.
#
# reco_alg:      a4 | a10 | a10r | a10t | a10sd
# constituent:   tc | pf
# cluster_calib: em | lcw
# jet_calib:     default | nojcalib | jes | subjes | subjesIS | subjesgsc
#                | subjesgscIS | subresjesgsc | subresjesgscIS
# tracking:      notrk | ftf | roiftf
reco_alg = \"a4\"
constituent = \"tc\"
cluster_calib = \"em\"
jet_calib = \"default\"
tracking = \"notrk\"
";

const GITIGNORE: &str = "plans/\n";

/// All canonical paths within `.menuseq/` for a project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub project_dir: PathBuf,
    pub menu_path: PathBuf,
    pub config_path: PathBuf,
    pub plans_dir: PathBuf,
    pub gitignore_path: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let project_dir = root.join(".menuseq");
        Self {
            root: root.clone(),
            menu_path: project_dir.join("menu.toml"),
            config_path: project_dir.join("reco.toml"),
            plans_dir: project_dir.join("plans"),
            gitignore_path: project_dir.join(".gitignore"),
            project_dir,
        }
    }
}

/// Options for `init_project`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing sample files.
    pub force: bool,
}

/// Create `.menuseq/` with a sample menu and reconstruction config.
///
/// Fails if `.menuseq/` already exists unless `options.force` is set.
pub fn init_project(root: &Path, options: &InitOptions) -> Result<ProjectPaths> {
    let paths = ProjectPaths::new(root);
    if paths.project_dir.exists() && !paths.project_dir.is_dir() {
        return Err(anyhow!("init: .menuseq exists but is not a directory"));
    }
    if paths.project_dir.exists() && !options.force {
        return Err(anyhow!(
            "init: .menuseq already exists (use --force to overwrite)"
        ));
    }

    create_dir(&paths.project_dir)?;
    write_file(&paths.gitignore_path, GITIGNORE)?;
    write_file(&paths.menu_path, SAMPLE_MENU)?;
    write_file(&paths.config_path, RECO_TEMPLATE)?;

    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}
