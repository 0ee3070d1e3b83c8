//! I/O helpers for menuseq commands.

pub mod config;
pub mod init;
pub mod menu_store;
pub mod plan_store;
