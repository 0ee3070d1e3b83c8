//! Test-only helpers: a minimal build domain and scratch project directories.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::core::cache::CanonicalKey;
use crate::core::types::{BuildContext, BuildDomain, Built, InputSpec};
use crate::io::init::{InitOptions, ProjectPaths, init_project};

/// Domain whose values are `"<name>@<step context>"` and whose actions are
/// the primary name of the built spec.
pub struct TestDomain;

impl BuildDomain for TestDomain {
    type Config = TestConfig;
    type StepContext = String;
    type Value = String;
    type Action = String;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestConfig {
    pub variant: u32,
}

impl CanonicalKey for TestConfig {
    fn canonical_key(&self) -> String {
        format!("variant={}", self.variant)
    }
}

/// Step contexts `roi0..roi{count-1}`.
pub fn rois(count: usize) -> Vec<String> {
    (0..count).map(|index| format!("roi{index}")).collect()
}

/// Scriptable `InputSpec` that counts its builds.
pub struct TestSpec {
    produces: Vec<String>,
    step: Option<usize>,
    deps: Vec<String>,
    conditional: Vec<(u32, Vec<String>)>,
    origin: Option<String>,
    extra: Vec<(String, String)>,
    builds: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl TestSpec {
    pub fn new(name: &str) -> Self {
        Self::producing(&[name])
    }

    pub fn producing(names: &[&str]) -> Self {
        Self {
            produces: names.iter().map(|name| name.to_string()).collect(),
            step: None,
            deps: Vec::new(),
            conditional: Vec::new(),
            origin: None,
            extra: Vec::new(),
            builds: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn at_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.deps.extend(deps.iter().map(|dep| dep.to_string()));
        self
    }

    /// Extra dependencies that only apply when `TestConfig::variant` matches.
    pub fn depends_when(mut self, variant: u32, deps: &[&str]) -> Self {
        self.conditional
            .push((variant, deps.iter().map(|dep| dep.to_string()).collect()));
        self
    }

    pub fn declared_in(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    /// Also return `name -> value` from `build`, whether or not this spec
    /// declares `name`.
    pub fn also_builds(mut self, name: &str, value: &str) -> Self {
        self.extra.push((name.to_string(), value.to_string()));
        self
    }

    /// Shared counter of `build` invocations.
    pub fn build_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.builds)
    }

    /// Names visible through `BuildContext::inputs` at the last build.
    pub fn seen_inputs(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.seen)
    }
}

impl InputSpec<TestDomain> for TestSpec {
    fn produces(&self) -> &[String] {
        &self.produces
    }

    fn step(&self) -> Option<usize> {
        self.step
    }

    fn dependencies(&self, config: &TestConfig) -> Vec<String> {
        let mut deps = self.deps.clone();
        for (variant, extra) in &self.conditional {
            if *variant == config.variant {
                deps.extend(extra.iter().cloned());
            }
        }
        deps
    }

    fn build(&self, ctx: &BuildContext<'_, TestDomain>) -> Built<TestDomain> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            *seen = ctx.inputs().keys().cloned().collect();
        }
        let built = self.produces.iter().fold(
            Built::new(ctx.input.to_string()),
            |built, name| {
                let value = format!("{name}@{}", ctx.step_context);
                built.with(name.clone(), value)
            },
        );
        self.extra
            .iter()
            .fold(built, |built, (name, value)| built.with(name.clone(), value.clone()))
    }

    fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

/// Scratch directory with an initialized `.menuseq/` project.
pub struct TestProject {
    temp: tempfile::TempDir,
    paths: ProjectPaths,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let paths = init_project(temp.path(), &InitOptions { force: false })?;
        Ok(Self { temp, paths })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Write `contents` to `relative` under the project root.
    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}
