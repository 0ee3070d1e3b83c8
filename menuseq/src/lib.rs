//! Staged, dependency-resolving build scheduler for trigger-menu
//! reconstruction sequences.
//!
//! Named inputs declare what they produce, what they depend on, and
//! optionally a fixed step. Resolving a request walks the dependency graph,
//! builds every required input once, and schedules each build action in the
//! step it was assigned, never before its dependencies.
//!
//! - **[`core`]**: Pure, deterministic resolution (registry, resolver,
//!   memoization, audits). Generic over the collaborator types.
//! - **[`menu`]**: The trigger-menu domain: reconstruction options, menu
//!   declarations, build actions.
//! - **[`io`]**: Filesystem access (menu and config files, plan output).
//!
//! Orchestration modules ([`plan`], [`validate`]) coordinate core logic with
//! I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod menu;
pub mod plan;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
