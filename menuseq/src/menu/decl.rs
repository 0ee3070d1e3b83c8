//! Menu-file input declarations and their `InputSpec` implementation.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::core::types::{BuildContext, Built, InputOptions, InputSpec};
use crate::menu::reco::{ConditionExpr, RecoConfig};
use crate::menu::{BuildAction, MenuDomain, StepContext};

/// Key template used for produced names without an explicit `keys` entry.
pub const DEFAULT_KEY_TEMPLATE: &str = "HLT_{name}";

/// Whether `name` is a legal input, label, or step name.
pub fn is_valid_name(name: &str) -> bool {
    use std::sync::LazyLock;
    static NAME_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("name pattern is valid")
    });
    NAME_RE.is_match(name)
}

/// One `[[inputs]]` table of a menu file, as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDecl {
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_override: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_when: Vec<ConditionalDeps>,
    /// Produced name to container-key template.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub keys: IndexMap<String, String>,
}

/// Dependencies that apply only when every condition in `when` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionalDeps {
    pub when: Vec<String>,
    pub inputs: Vec<String>,
}

impl InputDecl {
    /// Check names, conditions and key templates, producing the spec and its
    /// registration options. `origin` is recorded for error messages.
    pub fn compile(&self, origin: &str) -> Result<(DeclaredInput, InputOptions), String> {
        let primary = self
            .produces
            .first()
            .ok_or_else(|| "input declares no produced names".to_string())?;
        let context = |msg: String| format!("input '{primary}': {msg}");

        for name in &self.produces {
            check_name("produced name", name).map_err(context)?;
        }
        if let Some(label) = &self.label {
            check_name("label", label).map_err(context)?;
        }
        let mut seen = IndexSet::new();
        for name in &self.produces {
            if !seen.insert(name.as_str()) {
                return Err(context(format!("'{name}' is listed twice in produces")));
            }
        }

        let mut depends_when = Vec::with_capacity(self.depends_when.len());
        for group in &self.depends_when {
            let conditions = group
                .when
                .iter()
                .map(|raw| raw.parse::<ConditionExpr>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(context)?;
            depends_when.push((conditions, group.inputs.clone()));
        }
        for dep in self
            .depends_on
            .iter()
            .chain(depends_when.iter().flat_map(|(_, deps)| deps))
        {
            check_name("dependency", dep).map_err(context)?;
            if self.produces.contains(dep) {
                return Err(context(format!("depends on its own output '{dep}'")));
            }
        }

        for key_name in self.keys.keys() {
            if !self.produces.contains(key_name) {
                return Err(context(format!(
                    "key given for '{key_name}', which it does not produce"
                )));
            }
        }
        let keys = self
            .produces
            .iter()
            .map(|name| {
                let raw = self.keys.get(name).map_or(DEFAULT_KEY_TEMPLATE, String::as_str);
                KeyTemplate::parse(raw).map_err(|err| context(format!("key for '{name}': {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let spec = DeclaredInput {
            produces: self.produces.clone(),
            algorithm: self
                .algorithm
                .clone()
                .unwrap_or_else(|| format!("{primary}Builder")),
            step: self.step,
            depends_on: self.depends_on.clone(),
            depends_when,
            keys,
            origin: origin.to_string(),
        };
        let options = InputOptions {
            step_override: self.step_override,
            label: self.label.clone(),
        };
        Ok((spec, options))
    }
}

fn check_name(kind: &str, name: &str) -> Result<(), String> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(format!("invalid {kind} '{name}'"))
    }
}

/// Container-key template, e.g. `HLT_{reco_alg}{constituent}Jets_{calib}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Name,
    RecoAlg,
    Constituent,
    Calib,
    ClusterCalib,
    Roi,
}

impl Placeholder {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "name" => Placeholder::Name,
            "reco_alg" => Placeholder::RecoAlg,
            "constituent" => Placeholder::Constituent,
            "calib" => Placeholder::Calib,
            "cluster_calib" => Placeholder::ClusterCalib,
            "roi" => Placeholder::Roi,
            _ => return None,
        })
    }

    fn token(self) -> &'static str {
        match self {
            Placeholder::Name => "name",
            Placeholder::RecoAlg => "reco_alg",
            Placeholder::Constituent => "constituent",
            Placeholder::Calib => "calib",
            Placeholder::ClusterCalib => "cluster_calib",
            Placeholder::Roi => "roi",
        }
    }
}

impl KeyTemplate {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut rest = raw;
        while !rest.is_empty() {
            let Some(open) = rest.find(['{', '}']) else {
                segments.push(Segment::Literal(rest.to_string()));
                break;
            };
            if rest[open..].starts_with('}') {
                return Err(format!("unmatched '}}' in '{raw}'"));
            }
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| format!("unterminated placeholder in '{raw}'"))?;
            let token = &after[..close];
            let placeholder = Placeholder::parse(token)
                .ok_or_else(|| format!("unknown placeholder '{{{token}}}' in '{raw}'"))?;
            segments.push(Segment::Placeholder(placeholder));
            rest = &after[close + 1..];
        }
        if segments.is_empty() {
            return Err("empty key template".to_string());
        }
        Ok(Self { segments })
    }

    /// Render for produced name `name`. A full-scan step renders `{roi}` as `FS`.
    pub fn render(&self, name: &str, config: &RecoConfig, step: &StepContext) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(Placeholder::Name) => out.push_str(name),
                Segment::Placeholder(Placeholder::RecoAlg) => out.push_str(config.reco_alg.label()),
                Segment::Placeholder(Placeholder::Constituent) => {
                    out.push_str(&config.constituent_label());
                }
                Segment::Placeholder(Placeholder::Calib) => {
                    out.push_str(config.jet_calibration().token());
                }
                Segment::Placeholder(Placeholder::ClusterCalib) => {
                    out.push_str(config.cluster_calib.label());
                }
                Segment::Placeholder(Placeholder::Roi) => {
                    out.push_str(step.roi.as_deref().unwrap_or("FS"));
                }
            }
        }
        out
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Placeholder(placeholder) => write!(f, "{{{}}}", placeholder.token())?,
            }
        }
        Ok(())
    }
}

/// A compiled `InputDecl`.
#[derive(Debug, Clone)]
pub struct DeclaredInput {
    produces: Vec<String>,
    algorithm: String,
    step: Option<usize>,
    depends_on: Vec<String>,
    depends_when: Vec<(Vec<ConditionExpr>, Vec<String>)>,
    keys: Vec<KeyTemplate>,
    origin: String,
}

impl DeclaredInput {
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }
}

impl InputSpec<MenuDomain> for DeclaredInput {
    fn produces(&self) -> &[String] {
        &self.produces
    }

    fn step(&self) -> Option<usize> {
        self.step
    }

    fn dependencies(&self, config: &RecoConfig) -> Vec<String> {
        let mut deps: IndexSet<String> = self.depends_on.iter().cloned().collect();
        for (conditions, extra) in &self.depends_when {
            if conditions.iter().all(|condition| condition.holds(config)) {
                deps.extend(extra.iter().cloned());
            }
        }
        deps.into_iter().collect()
    }

    fn build(&self, ctx: &BuildContext<'_, MenuDomain>) -> Built<MenuDomain> {
        let reads = self
            .dependencies(ctx.config)
            .iter()
            .filter_map(|dep| ctx.input(dep).cloned())
            .collect();
        let writes: Vec<String> = self
            .produces
            .iter()
            .zip(&self.keys)
            .map(|(name, key)| key.render(name, ctx.config, ctx.step_context))
            .collect();

        let action = BuildAction {
            algorithm: self.algorithm.clone(),
            input: ctx.input.to_string(),
            step: ctx.step,
            step_name: ctx.step_context.name.clone(),
            roi: ctx.step_context.roi.clone(),
            reads,
            writes: writes.clone(),
        };
        self.produces
            .iter()
            .zip(writes)
            .fold(Built::new(action), |built, (name, key)| built.with(name.clone(), key))
    }

    fn origin(&self) -> Option<&str> {
        Some(&self.origin)
    }
}
