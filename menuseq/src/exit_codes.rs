//! Stable exit codes for menuseq CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid arguments, unreadable or malformed menu/config files, or other errors.
pub const INVALID: i32 = 1;
/// Menu loaded but a request could not be resolved or the audit found problems.
pub const UNRESOLVED: i32 = 2;
