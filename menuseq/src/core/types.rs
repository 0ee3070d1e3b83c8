//! Shared contracts between input specs, the registry, and the resolver.
//!
//! These types must not depend on external state or I/O. A spec's
//! `dependencies` and `build` are pure functions of their arguments so that a
//! resolution is deterministic across runs.

use indexmap::IndexMap;

use crate::core::registry::InputRegistry;

/// The opaque collaborator types threaded through a resolution.
///
/// The resolver never inspects any of these; it only moves them between
/// specs, the per-step accumulators, and the caller.
pub trait BuildDomain {
    /// Run configuration passed unchanged to every `dependencies` and `build`.
    type Config;
    /// Per-step contextual parameter (e.g. a region of interest or full scan).
    type StepContext;
    /// Value published for each produced name (e.g. a container key).
    type Value: Clone;
    /// Unit of scheduled work appended to a step's accumulator.
    type Action;
}

/// Explicit replacement for free-form keyword options on an input.
///
/// Recognized options:
/// - `step_override`: forces the step, taking precedence over the spec's own
///   fixed step and over inference from dependencies.
/// - `label`: registers an alias resolving to the spec's primary produced name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputOptions {
    pub step_override: Option<usize>,
    pub label: Option<String>,
}

/// A named, producible unit of configuration-time work.
pub trait InputSpec<D: BuildDomain>: Send + Sync {
    /// Names this spec publishes. Non-empty; the first entry is the primary name.
    fn produces(&self) -> &[String];

    /// Fixed step, if any. When `None` the step is inferred from dependencies.
    fn step(&self) -> Option<usize> {
        None
    }

    /// Names that must be resolved before this spec is built.
    ///
    /// Must be deterministic for a fixed `config` and must not contain any
    /// name from `produces`.
    fn dependencies(&self, config: &D::Config) -> Vec<String>;

    /// Produce the build action and the value of every produced name.
    fn build(&self, ctx: &BuildContext<'_, D>) -> Built<D>;

    /// Where this spec was declared, used to make lookup errors actionable.
    fn origin(&self) -> Option<&str> {
        None
    }
}

/// Output of a single `InputSpec::build` invocation.
pub struct Built<D: BuildDomain> {
    pub action: D::Action,
    pub produced: IndexMap<String, D::Value>,
}

impl<D: BuildDomain> Built<D> {
    pub fn new(action: D::Action) -> Self {
        Self {
            action,
            produced: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: D::Value) -> Self {
        self.produced.insert(name.into(), value);
        self
    }
}

/// Everything a spec may read while building.
pub struct BuildContext<'a, D: BuildDomain> {
    /// Primary name of the spec being built.
    pub input: &'a str,
    /// Step the spec was assigned to.
    pub step: usize,
    pub step_context: &'a D::StepContext,
    pub config: &'a D::Config,
    pub(crate) inputs: &'a IndexMap<String, D::Value>,
    pub(crate) registry: &'a InputRegistry<D>,
}

impl<'a, D: BuildDomain> BuildContext<'a, D> {
    /// Value of an already resolved input. Aliases are followed.
    pub fn input(&self, name: &str) -> Option<&'a D::Value> {
        self.inputs.get(self.registry.canonical_name(name))
    }

    /// All values resolved so far in this call, in resolution order.
    pub fn inputs(&self) -> &'a IndexMap<String, D::Value> {
        self.inputs
    }
}
