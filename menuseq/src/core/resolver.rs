//! Staged dependency resolution: requested inputs to per-step build actions.
//!
//! Each requested name is resolved depth-first. Dependencies are built
//! before their dependents, every spec is built at most once per call, and
//! each build action lands in the accumulator of the step it was assigned.
//!
//! Per name the states are `UNSEEN -> VISITING -> RESOLVED`. Re-entering a
//! name while it is VISITING is a cycle; RESOLVED is terminal.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::core::accumulator::Accumulator;
use crate::core::error::{ResolutionError, ResolutionResult};
use crate::core::registry::{InputRegistry, RegisteredInput};
use crate::core::types::{BuildContext, BuildDomain};

/// Result of a successful `build_steps` call.
pub struct Resolution<D: BuildDomain, A> {
    /// `steps[i]` holds the actions scheduled at step `i`; no gaps.
    pub steps: Vec<A>,
    /// Value of every name required to satisfy the request.
    pub inputs: IndexMap<String, D::Value>,
    /// Step at which each name was produced.
    pub input_steps: IndexMap<String, usize>,
}

impl<D: BuildDomain, A> Resolution<D, A> {
    pub fn step_of(&self, name: &str) -> Option<usize> {
        self.input_steps.get(name).copied()
    }
}

impl<D, A> Clone for Resolution<D, A>
where
    D: BuildDomain,
    A: Clone,
{
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            inputs: self.inputs.clone(),
            input_steps: self.input_steps.clone(),
        }
    }
}

impl<D, A> PartialEq for Resolution<D, A>
where
    D: BuildDomain,
    D::Value: PartialEq,
    A: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.steps == other.steps
            && self.inputs == other.inputs
            && self.input_steps == other.input_steps
    }
}

impl<D, A> fmt::Debug for Resolution<D, A>
where
    D: BuildDomain,
    D::Value: fmt::Debug,
    A: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("steps", &self.steps)
            .field("inputs", &self.inputs)
            .field("input_steps", &self.input_steps)
            .finish()
    }
}

/// Accumulator increments created by one recursive call, keyed by step.
type StepIncrements<A> = BTreeMap<usize, A>;

/// Resolve `requested` into per-step accumulators and the name → value map.
///
/// `accumulate` constructs an empty accumulator; it is also used to fill
/// steps that received no actions. An empty request yields no steps.
///
/// Any error aborts the whole call; no partial resolution is returned.
pub fn build_steps<D, A, F, S>(
    registry: &InputRegistry<D>,
    requested: &[S],
    step_contexts: &[D::StepContext],
    config: &D::Config,
    accumulate: F,
) -> ResolutionResult<Resolution<D, A>>
where
    D: BuildDomain,
    A: Accumulator<Action = D::Action>,
    F: Fn() -> A,
    S: AsRef<str>,
{
    let mut state = ResolutionState::new(registry, step_contexts, config, &accumulate);
    let mut merged: StepIncrements<A> = BTreeMap::new();
    for name in requested {
        let increments = state.resolve(name.as_ref(), None)?;
        merge_increments(&mut merged, increments);
    }

    let step_count = state
        .input_steps
        .values()
        .copied()
        .max()
        .map_or(0, |max| max + 1);
    let steps = (0..step_count)
        .map(|index| merged.remove(&index).unwrap_or_else(&accumulate))
        .collect();

    Ok(Resolution {
        steps,
        inputs: state.inputs,
        input_steps: state.input_steps,
    })
}

fn merge_increments<A: Accumulator>(target: &mut StepIncrements<A>, source: StepIncrements<A>) {
    for (step, increment) in source {
        match target.entry(step) {
            Entry::Vacant(slot) => {
                slot.insert(increment);
            }
            Entry::Occupied(mut slot) => slot.get_mut().merge(increment),
        }
    }
}

/// The spec whose dependency list is currently being walked.
#[derive(Clone, Copy)]
struct Dependent<'a> {
    name: &'a str,
    origin: Option<&'a str>,
}

/// Bookkeeping owned by a single `build_steps` call.
struct ResolutionState<'a, D: BuildDomain, F> {
    registry: &'a InputRegistry<D>,
    step_contexts: &'a [D::StepContext],
    config: &'a D::Config,
    accumulate: &'a F,
    inputs: IndexMap<String, D::Value>,
    input_steps: IndexMap<String, usize>,
    visiting: Vec<String>,
}

impl<'a, D, A, F> ResolutionState<'a, D, F>
where
    D: BuildDomain,
    A: Accumulator<Action = D::Action>,
    F: Fn() -> A,
{
    fn new(
        registry: &'a InputRegistry<D>,
        step_contexts: &'a [D::StepContext],
        config: &'a D::Config,
        accumulate: &'a F,
    ) -> Self {
        Self {
            registry,
            step_contexts,
            config,
            accumulate,
            inputs: IndexMap::new(),
            input_steps: IndexMap::new(),
            visiting: Vec::new(),
        }
    }

    fn resolve(
        &mut self,
        requested: &str,
        dependent: Option<Dependent<'_>>,
    ) -> ResolutionResult<StepIncrements<A>> {
        let registry = self.registry;
        let name = registry.canonical_name(requested);

        if self.input_steps.contains_key(name) {
            return Ok(BTreeMap::new());
        }

        let entry = registry.lookup(name).ok_or_else(|| ResolutionError::UnknownInput {
            name: name.to_string(),
            required_by: dependent.map(|d| d.name.to_string()),
            hint: dependent.and_then(|d| d.origin).map(str::to_string),
        })?;
        // The stack holds primary names so that reaching a spec through any
        // of its produced names or its alias is caught as the same node.
        let name = entry.primary_name();
        if self.visiting.iter().any(|visiting| visiting == name) {
            let mut path = self.visiting.clone();
            path.push(name.to_string());
            return Err(ResolutionError::circular(path));
        }
        let deps = entry.spec.dependencies(self.config);
        debug!(input = name, deps = ?deps, "resolving input");

        self.visiting.push(name.to_string());
        let walked = self.resolve_dependencies(name, entry, &deps);
        self.visiting.pop();
        let mut increments = walked?;

        let step = self.assign_step(name, entry, &deps)?;
        let Some(step_context) = self.step_contexts.get(step) else {
            return Err(ResolutionError::step_out_of_range(
                name,
                step,
                self.step_contexts.len(),
            ));
        };

        let built = entry.spec.build(&BuildContext {
            input: name,
            step,
            step_context,
            config: self.config,
            inputs: &self.inputs,
            registry,
        });
        increments
            .entry(step)
            .or_insert_with(self.accumulate)
            .append(built.action);

        // Every declared name is marked resolved so a spec that leaves one
        // out of its produced map is still never built twice.
        for produced in entry.spec.produces() {
            self.input_steps.insert(produced.clone(), step);
        }
        for (produced, value) in built.produced {
            if !entry.spec.produces().contains(&produced) {
                warn!(
                    input = name,
                    output = %produced,
                    "ignoring value for a name the input does not produce"
                );
                continue;
            }
            self.inputs.insert(produced, value);
        }
        debug!(input = name, step, "built input");

        Ok(increments)
    }

    fn resolve_dependencies(
        &mut self,
        name: &str,
        entry: &RegisteredInput<D>,
        deps: &[String],
    ) -> ResolutionResult<StepIncrements<A>> {
        let dependent = Dependent {
            name,
            origin: entry.spec.origin(),
        };
        let mut increments = BTreeMap::new();
        for dep in deps {
            let nested = self.resolve(dep, Some(dependent))?;
            merge_increments(&mut increments, nested);
        }
        Ok(increments)
    }

    fn assign_step(
        &self,
        name: &str,
        entry: &RegisteredInput<D>,
        deps: &[String],
    ) -> ResolutionResult<usize> {
        if let Some(step) = entry.fixed_step() {
            return Ok(step);
        }
        deps.iter()
            .filter_map(|dep| {
                self.input_steps
                    .get(self.registry.canonical_name(dep))
                    .copied()
            })
            .max()
            .ok_or_else(|| ResolutionError::missing_step(name))
    }
}
