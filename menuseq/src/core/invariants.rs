//! Whole-registry audits that go beyond what a single resolution checks.
//!
//! `build_steps` stops at the first problem on the path it walks. These
//! audits visit every registered spec for a given configuration and report
//! all problems at once, which is what `menuseq validate` prints.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::core::registry::InputRegistry;
use crate::core::resolver::Resolution;
use crate::core::types::BuildDomain;

/// Check every spec's declared dependencies for `config`:
/// - Every dependency is registered
/// - No spec depends on a name it produces itself
/// - A spec without a fixed step has at least one dependency
/// - No dependency cycles (each cycle reported once)
pub fn audit_registry<D: BuildDomain>(
    registry: &InputRegistry<D>,
    config: &D::Config,
) -> Vec<String> {
    let mut errors = Vec::new();

    for entry in registry.entries() {
        let name = entry.primary_name();
        let deps = entry.spec.dependencies(config);
        for dep in &deps {
            let canonical = registry.canonical_name(dep);
            if entry.spec.produces().iter().any(|own| own == canonical) {
                errors.push(format!("{name}: depends on its own output '{dep}'"));
            } else if !registry.contains(dep) {
                let origin = entry
                    .spec
                    .origin()
                    .map(|origin| format!(" (declared in {origin})"))
                    .unwrap_or_default();
                errors.push(format!("{name}: unknown dependency '{dep}'{origin}"));
            }
        }
        if entry.fixed_step().is_none() && deps.is_empty() {
            errors.push(format!("{name}: no step and no dependencies to infer one from"));
        }
    }

    errors.extend(find_cycles(registry, config));
    errors
}

fn find_cycles<D: BuildDomain>(registry: &InputRegistry<D>, config: &D::Config) -> Vec<String> {
    let mut finished = HashSet::new();
    let mut reported: HashSet<Vec<String>> = HashSet::new();
    let mut errors = Vec::new();
    for entry in registry.entries() {
        let mut path = IndexSet::new();
        walk(
            registry,
            config,
            entry.primary_name(),
            &mut path,
            &mut finished,
            &mut reported,
            &mut errors,
        );
    }
    errors
}

fn walk<D: BuildDomain>(
    registry: &InputRegistry<D>,
    config: &D::Config,
    name: &str,
    path: &mut IndexSet<String>,
    finished: &mut HashSet<String>,
    reported: &mut HashSet<Vec<String>>,
    errors: &mut Vec<String>,
) {
    let Some(entry) = registry.lookup(name) else {
        return;
    };
    let primary = entry.primary_name();
    if finished.contains(primary) {
        return;
    }
    if let Some(start) = path.get_index_of(primary) {
        let mut cycle: Vec<String> = path.iter().skip(start).cloned().collect();
        let mut members = cycle.clone();
        members.sort();
        if reported.insert(members) {
            cycle.push(primary.to_string());
            errors.push(format!("dependency cycle: {}", cycle.join(" -> ")));
        }
        return;
    }

    path.insert(primary.to_string());
    for dep in entry.spec.dependencies(config) {
        walk(registry, config, &dep, path, finished, reported, errors);
    }
    path.pop();
    finished.insert(primary.to_string());
}

/// Verify no resolved input was scheduled before one of its dependencies.
pub fn check_step_order<D: BuildDomain, A>(
    resolution: &Resolution<D, A>,
    registry: &InputRegistry<D>,
    config: &D::Config,
) -> Vec<String> {
    let mut errors = Vec::new();
    for entry in registry.entries() {
        let name = entry.primary_name();
        let Some(step) = resolution.step_of(name) else {
            continue;
        };
        for dep in entry.spec.dependencies(config) {
            match resolution.step_of(registry.canonical_name(&dep)) {
                Some(dep_step) if dep_step > step => errors.push(format!(
                    "{name}: scheduled at step {step} before dependency '{dep}' at step {dep_step}"
                )),
                Some(_) => {}
                None => errors.push(format!("{name}: dependency '{dep}' was never resolved")),
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::build_steps;
    use crate::test_support::{TestConfig, TestDomain, TestSpec, rois};

    #[test]
    fn audit_reports_every_problem() {
        let mut registry = InputRegistry::<TestDomain>::new();
        registry.add(TestSpec::new("Cells").at_step(0)).expect("cells");
        registry
            .add(
                TestSpec::new("Jets")
                    .depends_on(&["Clusters", "Trks"])
                    .declared_in("jet.toml"),
            )
            .expect("jets");
        registry
            .add(TestSpec::new("Clusters").depends_on(&["Jets"]))
            .expect("clusters");
        registry.add(TestSpec::new("Floating")).expect("floating");
        registry
            .add(TestSpec::producing(&["Met", "MetAux"]).depends_on(&["MetAux"]))
            .expect("met");

        let errors = audit_registry(&registry, &TestConfig::default());

        assert!(
            errors.contains(&"Jets: unknown dependency 'Trks' (declared in jet.toml)".to_string())
        );
        assert!(
            errors.contains(&"Floating: no step and no dependencies to infer one from".to_string())
        );
        assert!(errors.contains(&"Met: depends on its own output 'MetAux'".to_string()));
        let cycles: Vec<&String> = errors
            .iter()
            .filter(|err| err.starts_with("dependency cycle"))
            .collect();
        assert_eq!(cycles.len(), 2, "{errors:?}");
        assert!(cycles.iter().any(|err| err.contains("Jets -> Clusters -> Jets")));
    }

    #[test]
    fn audit_is_clean_for_valid_graph() {
        let mut registry = InputRegistry::<TestDomain>::new();
        registry.add(TestSpec::new("Cells").at_step(0)).expect("cells");
        registry
            .add(TestSpec::new("Clusters").depends_on(&["Cells"]))
            .expect("clusters");
        assert!(audit_registry(&registry, &TestConfig::default()).is_empty());
    }

    #[test]
    fn step_order_holds_after_resolution() {
        let mut registry = InputRegistry::<TestDomain>::new();
        registry.add(TestSpec::new("Cells").at_step(1)).expect("cells");
        registry
            .add(TestSpec::new("Clusters").at_step(0).depends_on(&["Cells"]))
            .expect("clusters");
        registry.add(TestSpec::new("Tracks").at_step(2)).expect("tracks");
        let config = TestConfig::default();

        let resolution: Resolution<TestDomain, Vec<String>> =
            build_steps(&registry, &["Clusters", "Tracks"], &rois(3), &config, Vec::new)
                .expect("resolve");

        let errors = check_step_order(&resolution, &registry, &config);
        assert_eq!(
            errors,
            vec!["Clusters: scheduled at step 0 before dependency 'Cells' at step 1"]
        );
    }
}
