//! Deterministic, pure scheduling logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! registries and return deterministic outputs suitable for tests. The
//! collaborator types (configuration, step contexts, values, actions) are
//! generic; see `menu` for the concrete trigger-menu domain.

pub mod accumulator;
pub mod cache;
pub mod error;
pub mod invariants;
pub mod registry;
pub mod resolver;
pub mod types;

pub use accumulator::Accumulator;
pub use cache::{CacheStats, CachedResolver, CanonicalKey};
pub use error::{ResolutionError, ResolutionResult};
pub use registry::InputRegistry;
pub use resolver::{Resolution, build_steps};
pub use types::{BuildContext, BuildDomain, Built, InputOptions, InputSpec};
