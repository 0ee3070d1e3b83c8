//! Error taxonomy for registration and resolution.
//!
//! Every variant is fatal: it always points at a bug in the declared specs,
//! never at a transient condition, so nothing here is retried.

use thiserror::Error;

/// Result type for registry and resolver operations.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Two specs claim the same output name (or alias).
    #[error("duplicate producer for {}", .names.join(", "))]
    DuplicateProducer { names: Vec<String> },

    /// A spec with an empty `produces` list.
    #[error("input declares no produced names{}", origin_detail(.origin.as_deref()))]
    EmptyProduces { origin: Option<String> },

    /// A requested or depended-on name has no registered producer.
    #[error("unknown input '{name}'{}", unknown_detail(.required_by.as_deref(), .hint.as_deref()))]
    UnknownInput {
        name: String,
        /// The input whose dependencies named `name`, if any.
        required_by: Option<String>,
        /// Declaration origin of `required_by`.
        hint: Option<String>,
    },

    /// A dependency cycle; `path` ends with the re-entered name.
    #[error("circular dependency: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    /// No fixed step and no dependencies to infer one from.
    #[error("cannot infer step for '{input}' with no dependencies")]
    MissingStep { input: String },

    #[error(
        "step {step} for '{input}' is out of range ({available} step contexts supplied)"
    )]
    StepOutOfRange {
        input: String,
        step: usize,
        available: usize,
    },
}

impl ResolutionError {
    pub fn duplicate_producer(names: Vec<String>) -> Self {
        Self::DuplicateProducer { names }
    }

    pub fn empty_produces(origin: Option<&str>) -> Self {
        Self::EmptyProduces {
            origin: origin.map(str::to_string),
        }
    }

    pub fn unknown_input(name: impl Into<String>) -> Self {
        Self::UnknownInput {
            name: name.into(),
            required_by: None,
            hint: None,
        }
    }

    pub fn circular(path: Vec<String>) -> Self {
        Self::CircularDependency { path }
    }

    pub fn missing_step(input: impl Into<String>) -> Self {
        Self::MissingStep {
            input: input.into(),
        }
    }

    pub fn step_out_of_range(input: impl Into<String>, step: usize, available: usize) -> Self {
        Self::StepOutOfRange {
            input: input.into(),
            step,
            available,
        }
    }
}

fn unknown_detail(required_by: Option<&str>, hint: Option<&str>) -> String {
    match (required_by, hint) {
        (Some(dependent), Some(origin)) => {
            format!(" (required by '{dependent}', declared in {origin})")
        }
        (Some(dependent), None) => format!(" (required by '{dependent}')"),
        (None, _) => String::new(),
    }
}

fn origin_detail(origin: Option<&str>) -> String {
    origin.map_or_else(String::new, |origin| format!(" (declared in {origin})"))
}
