//! Trigger-menu domain: reconstruction options, menu declarations and the
//! build actions scheduled into each step.

pub mod decl;
pub mod reco;

use serde::{Deserialize, Serialize};

use crate::core::cache::{CachedResolver, CanonicalKey, json_key};
use crate::core::registry::InputRegistry;
use crate::core::types::BuildDomain;

pub use decl::{DeclaredInput, InputDecl, KeyTemplate};
pub use reco::{Condition, ConditionExpr, JetCalibration, RecoConfig};

/// Collaborator types for menu resolution.
pub struct MenuDomain;

impl BuildDomain for MenuDomain {
    type Config = RecoConfig;
    type StepContext = StepContext;
    /// Container key of a produced collection.
    type Value = String;
    type Action = BuildAction;
}

pub type MenuRegistry = InputRegistry<MenuDomain>;
pub type MenuResolver = CachedResolver<MenuDomain, Vec<BuildAction>>;

/// One step of a chain. `roi == None` means full scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepContext {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<String>,
}

impl CanonicalKey for StepContext {
    fn canonical_key(&self) -> String {
        json_key(self)
    }
}

/// A single scheduled algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAction {
    pub algorithm: String,
    /// Primary name of the input this action builds.
    pub input: String,
    pub step: usize,
    pub step_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<String>,
    pub reads: Vec<String>,
    pub writes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_context_keys_distinguish_full_scan() {
        let fs = StepContext {
            name: "jets".to_string(),
            roi: None,
        };
        let roi = StepContext {
            name: "jets".to_string(),
            roi: Some("None".to_string()),
        };
        assert_eq!(fs.canonical_key(), r#"{"name":"jets"}"#);
        assert_eq!(roi.canonical_key(), r#"{"name":"jets","roi":"None"}"#);
        assert_ne!(fs.canonical_key(), roi.canonical_key());
    }
}
