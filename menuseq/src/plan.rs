//! Orchestration for `menuseq plan`: load menus and config, resolve the
//! requested inputs, and shape the result for printing or writing.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::cache::CacheStats;
use crate::core::error::ResolutionError;
use crate::core::invariants::check_step_order;
use crate::core::resolver::Resolution;
use crate::io::config::load_config;
use crate::io::menu_store::{LoadedMenu, load_menus};
use crate::menu::{BuildAction, MenuDomain, MenuResolver, RecoConfig, StepContext};

/// Per-step schedule for a set of requested inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub requested: Vec<String>,
    pub config: RecoConfig,
    pub steps: Vec<PlannedStep>,
    /// Every resolved name with its step and container key.
    pub inputs: IndexMap<String, PlannedInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub index: usize,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<String>,
    pub actions: Vec<BuildAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedInput {
    pub step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Structured planning outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Planned(Plan),
    /// The request could not be resolved against the menu.
    Unresolved(ResolutionError),
    /// Resolved, but some input was scheduled before a dependency.
    OutOfOrder(Vec<String>),
}

/// Resolves requests against one loaded menu, memoizing across calls.
pub struct Planner {
    resolver: MenuResolver,
    steps: Vec<StepContext>,
}

impl Planner {
    pub fn new(menu: LoadedMenu) -> Self {
        Self {
            resolver: MenuResolver::new(Arc::new(menu.registry)),
            steps: menu.steps,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.stats()
    }

    pub fn plan(&self, requested: &[String], config: &RecoConfig) -> PlanOutcome {
        let resolution = match self
            .resolver
            .resolve(requested, &self.steps, config, Vec::new)
        {
            Ok(resolution) => resolution,
            Err(err) => return PlanOutcome::Unresolved(err),
        };

        let problems = check_step_order(&*resolution, self.resolver.registry(), config);
        if !problems.is_empty() {
            return PlanOutcome::OutOfOrder(problems);
        }
        PlanOutcome::Planned(self.shape(requested, config, &resolution))
    }

    fn shape(
        &self,
        requested: &[String],
        config: &RecoConfig,
        resolution: &Resolution<MenuDomain, Vec<BuildAction>>,
    ) -> Plan {
        let steps = resolution
            .steps
            .iter()
            .zip(&self.steps)
            .enumerate()
            .map(|(index, (actions, context))| PlannedStep {
                index,
                name: context.name.clone(),
                roi: context.roi.clone(),
                actions: actions.clone(),
            })
            .collect();
        let inputs = resolution
            .input_steps
            .iter()
            .map(|(name, step)| {
                let planned = PlannedInput {
                    step: *step,
                    key: resolution.inputs.get(name).cloned(),
                };
                (name.clone(), planned)
            })
            .collect();
        Plan {
            requested: requested.to_vec(),
            config: config.clone(),
            steps,
            inputs,
        }
    }
}

/// Files and names for a single `menuseq plan` invocation.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub menus: Vec<PathBuf>,
    pub config_path: PathBuf,
    pub requested: Vec<String>,
}

/// Load menus and config from disk and plan the request.
///
/// Load failures are errors; resolution failures are reported in the outcome.
pub fn plan_from_files(request: &PlanRequest) -> Result<PlanOutcome> {
    let menu = load_menus(&request.menus).context("load menu")?;
    let config = load_config(&request.config_path).context("load config")?;
    info!(
        inputs = menu.registry.len(),
        steps = menu.steps.len(),
        requested = ?request.requested,
        "planning"
    );
    let planner = Planner::new(menu);
    Ok(planner.plan(&request.requested, &config))
}

/// Human-readable rendering, one block per step.
pub fn render_text(plan: &Plan) -> String {
    let mut out = String::new();
    for step in &plan.steps {
        let roi = step.roi.as_deref().unwrap_or("FS");
        let _ = writeln!(out, "step {} {} ({roi})", step.index, step.name);
        if step.actions.is_empty() {
            out.push_str("  (no actions)\n");
        }
        for action in &step.actions {
            let _ = write!(out, "  {} {}", action.algorithm, action.input);
            if !action.reads.is_empty() {
                let _ = write!(out, " [{}]", action.reads.join(", "));
            }
            let _ = writeln!(out, " -> {}", action.writes.join(", "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::menu_store::load_menu;
    use crate::menu::reco::{Constituent, Tracking};
    use crate::test_support::TestProject;

    fn sample_planner(project: &TestProject) -> Planner {
        Planner::new(load_menu(&project.paths().menu_path).expect("load menu"))
    }

    fn names(step: &PlannedStep) -> Vec<&str> {
        step.actions.iter().map(|action| action.input.as_str()).collect()
    }

    fn planned(outcome: PlanOutcome) -> Plan {
        match outcome {
            PlanOutcome::Planned(plan) => plan,
            other => panic!("expected plan, got {other:?}"),
        }
    }

    #[test]
    fn topo_jets_skip_tracking() {
        let project = TestProject::new().expect("project");
        let planner = sample_planner(&project);
        let plan = planned(planner.plan(&["Jets".to_string()], &RecoConfig::default()));

        assert_eq!(plan.steps.len(), 3);
        assert_eq!(names(&plan.steps[0]), vec!["Cells", "Clusters", "EventDensity"]);
        assert!(plan.steps[1].actions.is_empty());
        assert_eq!(names(&plan.steps[2]), vec!["Jets"]);
        assert_eq!(
            plan.inputs["Jets"].key.as_deref(),
            Some("HLT_AntiKt4EMTopoJets_subjesIS")
        );
        assert!(!plan.inputs.contains_key("Tracks"));
    }

    #[test]
    fn pflow_jets_pull_in_tracking_and_vertices() {
        let project = TestProject::new().expect("project");
        let planner = sample_planner(&project);
        let config = RecoConfig {
            constituent: Constituent::PFlow,
            tracking: Tracking::Ftf,
            ..RecoConfig::default()
        };
        let plan = planned(planner.plan(&["MET".to_string()], &config));

        assert_eq!(plan.steps.len(), 4);
        assert_eq!(names(&plan.steps[0]), vec!["Cells", "Clusters"]);
        assert_eq!(
            names(&plan.steps[1]),
            vec!["Tracks", "PFlow", "EventDensity", "Vertices"]
        );
        assert_eq!(names(&plan.steps[2]), vec!["Jets"]);
        assert_eq!(names(&plan.steps[3]), vec!["MET"]);
        assert_eq!(plan.inputs["PFlowNeutral"].step, 1);
        assert_eq!(
            plan.steps[3].actions[0].reads,
            vec!["HLT_AntiKt4EMPFlowJets_subresjesgscIS"]
        );
    }

    #[test]
    fn alias_requests_resolve_to_primary() {
        let project = TestProject::new().expect("project");
        let planner = sample_planner(&project);
        let plan = planned(planner.plan(&["HLTJets".to_string()], &RecoConfig::default()));
        assert!(plan.inputs.contains_key("Jets"));
        assert!(!plan.inputs.contains_key("HLTJets"));
    }

    #[test]
    fn unknown_request_is_unresolved() {
        let project = TestProject::new().expect("project");
        let planner = sample_planner(&project);
        let outcome = planner.plan(&["Taus".to_string()], &RecoConfig::default());
        assert_eq!(
            outcome,
            PlanOutcome::Unresolved(ResolutionError::unknown_input("Taus"))
        );
    }

    #[test]
    fn repeated_plans_hit_the_cache() {
        let project = TestProject::new().expect("project");
        let planner = sample_planner(&project);
        let request = vec!["Jets".to_string()];
        let first = planner.plan(&request, &RecoConfig::default());
        let second = planner.plan(&request, &RecoConfig::default());
        assert_eq!(first, second);
        let stats = planner.cache_stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn step_override_below_dependency_is_out_of_order() {
        let project = TestProject::new().expect("project");
        let menu = project
            .write(
                "menu.toml",
                r#"
[[steps]]
name = "calo"

[[steps]]
name = "jets"

[[inputs]]
produces = ["Cells"]
step = 1

[[inputs]]
produces = ["Clusters"]
depends_on = ["Cells"]
step_override = 0
"#,
            )
            .expect("write");
        let planner = Planner::new(load_menu(&menu).expect("load"));
        let outcome = planner.plan(&["Clusters".to_string()], &RecoConfig::default());
        assert_eq!(
            outcome,
            PlanOutcome::OutOfOrder(vec![
                "Clusters: scheduled at step 0 before dependency 'Cells' at step 1".to_string()
            ])
        );
    }

    #[test]
    fn renders_text_per_step() {
        let project = TestProject::new().expect("project");
        let planner = sample_planner(&project);
        let plan = planned(planner.plan(&["Clusters".to_string()], &RecoConfig::default()));
        assert_eq!(
            render_text(&plan),
            "step 0 calo (FS)\n\
             \x20 HLTCaloCellMaker Cells -> HLT_CaloCells_FS\n\
             \x20 TrigCaloClusterMaker Clusters [HLT_CaloCells_FS] -> HLT_TopoCaloClustersEM_FS\n"
        );
    }
}
