//! End-to-end resolution scenarios through the public API.
//!
//! Registries are built from scripted specs (`test_support::TestSpec`) so the
//! scenarios exercise only registration, step assignment, and ordering.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use menuseq::core::{
    CachedResolver, InputOptions, InputRegistry, Resolution, ResolutionError, build_steps,
};
use menuseq::test_support::{TestConfig, TestDomain, TestSpec, rois};

type Steps = Resolution<TestDomain, Vec<String>>;

fn resolve(
    registry: &InputRegistry<TestDomain>,
    requested: &[&str],
    steps: usize,
) -> Result<Steps, ResolutionError> {
    build_steps(registry, requested, &rois(steps), &TestConfig::default(), Vec::new)
}

/// Cells and Clusters at step 0, Tracks fixed at step 2, Jets inferred.
///
/// ```text
/// step 0: Cells, Clusters
/// step 1: (empty)
/// step 2: Tracks, Jets
/// ```
#[test]
fn jets_scenario_schedules_dependencies_first() {
    let mut registry = InputRegistry::new();
    registry.add(TestSpec::new("Cells").at_step(0)).expect("cells");
    registry
        .add(TestSpec::new("Clusters").at_step(0).depends_on(&["Cells"]))
        .expect("clusters");
    registry.add(TestSpec::new("Tracks").at_step(2)).expect("tracks");
    registry
        .add(TestSpec::producing(&["Jets", "JetsAux"]).depends_on(&["Clusters", "Tracks"]))
        .expect("jets");

    let resolution = resolve(&registry, &["Jets"], 3).expect("resolve");

    assert_eq!(
        resolution.steps,
        vec![
            vec!["Cells".to_string(), "Clusters".to_string()],
            Vec::new(),
            vec!["Tracks".to_string(), "Jets".to_string()],
        ]
    );
    for name in ["Cells", "Clusters", "Tracks", "Jets", "JetsAux"] {
        assert!(resolution.inputs.contains_key(name), "missing {name}");
    }
    assert_eq!(resolution.inputs["Jets"], "Jets@roi2");
    assert_eq!(resolution.step_of("JetsAux"), Some(2));
}

#[test]
fn shared_dependency_is_built_once_across_requests() {
    let mut registry = InputRegistry::new();
    let cells = TestSpec::new("Cells").at_step(0);
    let builds = cells.build_count();
    registry.add(cells).expect("cells");
    registry
        .add(TestSpec::new("Clusters").depends_on(&["Cells"]))
        .expect("clusters");
    registry
        .add(TestSpec::new("Towers").depends_on(&["Cells"]))
        .expect("towers");

    let resolution = resolve(&registry, &["Clusters", "Towers", "Cells"], 1).expect("resolve");

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(resolution.steps, vec![vec!["Cells", "Clusters", "Towers"]]);
}

#[test]
fn cycle_aborts_without_partial_result() {
    let mut registry = InputRegistry::new();
    registry.add(TestSpec::new("Cells").at_step(0)).expect("cells");
    registry
        .add(TestSpec::new("A").depends_on(&["Cells", "B"]))
        .expect("a");
    registry.add(TestSpec::new("B").depends_on(&["A"])).expect("b");

    let err = resolve(&registry, &["A"], 1).unwrap_err();
    assert_eq!(err.to_string(), "circular dependency: A -> B -> A");
}

#[test]
fn duplicate_registration_is_all_or_nothing() {
    let mut registry = InputRegistry::<TestDomain>::new();
    registry.add(TestSpec::new("Cells").at_step(0)).expect("cells");

    let err = registry
        .add(TestSpec::producing(&["Towers", "Cells"]).at_step(0))
        .unwrap_err();
    assert_eq!(err, ResolutionError::duplicate_producer(vec!["Cells".to_string()]));
    assert!(!registry.contains("Towers"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn unknown_dependency_names_dependent_and_origin() {
    let mut registry = InputRegistry::new();
    registry
        .add(
            TestSpec::new("Jets")
                .depends_on(&["Clustrs"])
                .declared_in("menus/jets.toml"),
        )
        .expect("jets");

    let err = resolve(&registry, &["Jets"], 1).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown input 'Clustrs' (required by 'Jets', declared in menus/jets.toml)"
    );
}

#[test]
fn too_few_step_contexts_is_out_of_range() {
    let mut registry = InputRegistry::new();
    registry.add(TestSpec::new("Met").at_step(3)).expect("met");
    let err = resolve(&registry, &["Met"], 2).unwrap_err();
    assert_eq!(err, ResolutionError::step_out_of_range("Met", 3, 2));
}

#[test]
fn label_and_override_options() {
    let mut registry = InputRegistry::new();
    registry.add(TestSpec::new("Cells").at_step(0)).expect("cells");
    registry
        .add_with_options(
            TestSpec::new("Clusters").depends_on(&["Cells"]),
            InputOptions {
                step_override: Some(1),
                label: Some("TopoClusters".to_string()),
            },
        )
        .expect("clusters");

    let resolution = resolve(&registry, &["TopoClusters"], 2).expect("resolve");
    assert_eq!(resolution.step_of("Clusters"), Some(1));
    assert_eq!(resolution.steps, vec![vec!["Cells"], vec!["Clusters"]]);
}

#[test]
fn cached_resolver_keys_on_config() {
    let mut registry = InputRegistry::new();
    let jets = TestSpec::new("Jets").at_step(1).depends_when(1, &["Tracks"]);
    let builds = jets.build_count();
    registry.add(jets).expect("jets");
    registry.add(TestSpec::new("Tracks").at_step(0)).expect("tracks");
    let resolver: CachedResolver<TestDomain, Vec<String>> = CachedResolver::new(Arc::new(registry));

    let plain = resolver
        .resolve(&["Jets"], &rois(2), &TestConfig { variant: 0 }, Vec::new)
        .expect("plain");
    let tracked = resolver
        .resolve(&["Jets"], &rois(2), &TestConfig { variant: 1 }, Vec::new)
        .expect("tracked");
    let again = resolver
        .resolve(&["Jets"], &rois(2), &TestConfig { variant: 0 }, Vec::new)
        .expect("again");

    assert!(!plain.inputs.contains_key("Tracks"));
    assert!(tracked.inputs.contains_key("Tracks"));
    assert!(Arc::ptr_eq(&plain, &again));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}
