//! Plan output files.

use std::path::Path;

use anyhow::{Context, Result};

use super::config::write_atomic;
use crate::plan::Plan;

/// Serialize `plan` as pretty JSON with a trailing newline.
pub fn plan_to_json(plan: &Plan) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(plan).context("serialize plan json")?;
    buf.push('\n');
    Ok(buf)
}

/// Atomically write `plan` as JSON (temp file + rename).
pub fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    write_atomic(path, &plan_to_json(plan)?)
}

pub fn read_plan(path: &Path) -> Result<Plan> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::menu_store::load_menu;
    use crate::menu::RecoConfig;
    use crate::plan::{PlanOutcome, Planner};
    use crate::test_support::TestProject;

    #[test]
    fn written_plan_reads_back() {
        let project = TestProject::new().expect("project");
        let planner = Planner::new(load_menu(&project.paths().menu_path).expect("menu"));
        let PlanOutcome::Planned(plan) = planner.plan(&["Jets".to_string()], &RecoConfig::default())
        else {
            panic!("expected plan");
        };

        let path = project.paths().plans_dir.join("jets.json");
        write_plan(&path, &plan).expect("write");
        let raw = std::fs::read_to_string(&path).expect("read raw");
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\"jet_calib\": \"default\""));
        assert_eq!(read_plan(&path).expect("read"), plan);
    }
}
