//! Catalogue of producible inputs.
//!
//! The registry is populated once while the menu is being declared and is
//! read-only afterwards. It is passed explicitly to every resolution; there
//! is no process-wide registry.

use indexmap::IndexMap;

use crate::core::error::{ResolutionError, ResolutionResult};
use crate::core::types::{BuildDomain, InputOptions, InputSpec};

pub(crate) struct RegisteredInput<D: BuildDomain> {
    pub(crate) spec: Box<dyn InputSpec<D>>,
    pub(crate) options: InputOptions,
}

impl<D: BuildDomain> RegisteredInput<D> {
    pub(crate) fn primary_name(&self) -> &str {
        self.spec.produces()[0].as_str()
    }

    /// Step forced by options or fixed by the spec, if any.
    pub(crate) fn fixed_step(&self) -> Option<usize> {
        self.options.step_override.or_else(|| self.spec.step())
    }
}

/// Maps every produced name (and alias) to the spec that owns it.
pub struct InputRegistry<D: BuildDomain> {
    entries: Vec<RegisteredInput<D>>,
    owners: IndexMap<String, usize>,
    aliases: IndexMap<String, String>,
}

impl<D: BuildDomain> Default for InputRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: BuildDomain> InputRegistry<D> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            owners: IndexMap::new(),
            aliases: IndexMap::new(),
        }
    }

    /// Register `spec` with default options.
    pub fn add<S>(&mut self, spec: S) -> ResolutionResult<()>
    where
        S: InputSpec<D> + 'static,
    {
        self.add_with_options(spec, InputOptions::default())
    }

    /// Register `spec`; either every name is added or none is.
    ///
    /// Fails with `DuplicateProducer` listing every name already claimed by
    /// another spec (or repeated within this one), or with `EmptyProduces`
    /// for a spec that produces no names.
    pub fn add_with_options<S>(&mut self, spec: S, options: InputOptions) -> ResolutionResult<()>
    where
        S: InputSpec<D> + 'static,
    {
        self.add_boxed(Box::new(spec), options)
    }

    pub fn add_boxed(
        &mut self,
        spec: Box<dyn InputSpec<D>>,
        options: InputOptions,
    ) -> ResolutionResult<()> {
        if spec.produces().is_empty() {
            return Err(ResolutionError::empty_produces(spec.origin()));
        }

        let mut claimed: Vec<&str> = spec.produces().iter().map(String::as_str).collect();
        if let Some(label) = options.label.as_deref() {
            claimed.push(label);
        }

        let mut offending = Vec::new();
        for (index, name) in claimed.iter().enumerate() {
            let repeated = claimed[..index].contains(name);
            if (repeated || self.contains(name)) && !offending.iter().any(|n: &String| n == name)
            {
                offending.push((*name).to_string());
            }
        }
        if !offending.is_empty() {
            return Err(ResolutionError::duplicate_producer(offending));
        }

        let index = self.entries.len();
        for name in spec.produces() {
            self.owners.insert(name.clone(), index);
        }
        if let Some(label) = &options.label {
            self.aliases.insert(label.clone(), spec.produces()[0].clone());
        }
        self.entries.push(RegisteredInput { spec, options });
        Ok(())
    }

    /// Owning spec for `name` (aliases resolve to their target).
    pub fn get(&self, name: &str) -> ResolutionResult<&dyn InputSpec<D>> {
        self.lookup(name)
            .map(|entry| entry.spec.as_ref())
            .ok_or_else(|| ResolutionError::unknown_input(name))
    }

    /// Options the spec owning `name` was registered with.
    pub fn options(&self, name: &str) -> Option<&InputOptions> {
        self.lookup(name).map(|entry| &entry.options)
    }

    /// Follow an alias to the primary name it stands for.
    pub fn canonical_name<'n>(&'n self, name: &'n str) -> &'n str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    /// True if `name` is a produced name or alias.
    pub fn contains(&self, name: &str) -> bool {
        self.owners.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Produced names in registration order (aliases excluded).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    /// Number of registered specs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&RegisteredInput<D>> {
        let canonical = self.canonical_name(name);
        self.owners
            .get(canonical)
            .and_then(|index| self.entries.get(*index))
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &RegisteredInput<D>> {
        self.entries.iter()
    }

    /// Absorb every spec of `other`, all-or-nothing.
    pub fn extend(&mut self, other: InputRegistry<D>) -> ResolutionResult<()> {
        let mut offending: Vec<String> = Vec::new();
        for name in other.owners.keys().chain(other.aliases.keys()) {
            if self.contains(name) {
                offending.push(name.clone());
            }
        }
        if !offending.is_empty() {
            return Err(ResolutionError::duplicate_producer(offending));
        }
        for entry in other.entries {
            self.add_boxed(entry.spec, entry.options)?;
        }
        for (alias, target) in other.aliases {
            self.aliases.entry(alias).or_insert(target);
        }
        Ok(())
    }

    /// Register an alias for an existing produced name after the fact.
    pub fn add_alias(&mut self, alias: impl Into<String>, target: &str) -> ResolutionResult<()> {
        let alias = alias.into();
        if self.contains(&alias) {
            return Err(ResolutionError::duplicate_producer(vec![alias]));
        }
        let primary = match self.lookup(target) {
            Some(entry) => entry.primary_name().to_string(),
            None => return Err(ResolutionError::unknown_input(target)),
        };
        self.aliases.insert(alias, primary);
        Ok(())
    }
}
