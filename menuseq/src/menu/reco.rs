//! Typed reconstruction options for jet and MET inputs.
//!
//! Every option is a closed enum parsed once when the configuration is
//! loaded. Nothing downstream matches on option strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::cache::{CanonicalKey, json_key};

/// Jet clustering algorithm (`recoAlg`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoAlg {
    #[default]
    A4,
    A10,
    A10r,
    A10t,
    A10sd,
}

impl RecoAlg {
    /// Collection-name fragment, e.g. `AntiKt4`.
    pub fn label(self) -> &'static str {
        match self {
            RecoAlg::A4 => "AntiKt4",
            RecoAlg::A10 => "AntiKt10",
            RecoAlg::A10r => "AntiKt10Reclustered",
            RecoAlg::A10t => "AntiKt10Trimmed",
            RecoAlg::A10sd => "AntiKt10SoftDrop",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            RecoAlg::A4 => "a4",
            RecoAlg::A10 => "a10",
            RecoAlg::A10r => "a10r",
            RecoAlg::A10t => "a10t",
            RecoAlg::A10sd => "a10sd",
        }
    }
}

/// Jet input type (`constitType`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constituent {
    #[default]
    #[serde(rename = "tc")]
    Topo,
    #[serde(rename = "pf")]
    PFlow,
}

impl Constituent {
    pub fn token(self) -> &'static str {
        match self {
            Constituent::Topo => "tc",
            Constituent::PFlow => "pf",
        }
    }
}

/// Topocluster calibration (`clusterCalib`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterCalib {
    #[default]
    Em,
    Lcw,
}

impl ClusterCalib {
    pub fn label(self) -> &'static str {
        match self {
            ClusterCalib::Em => "EM",
            ClusterCalib::Lcw => "LC",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            ClusterCalib::Em => "em",
            ClusterCalib::Lcw => "lcw",
        }
    }
}

/// Tracking configuration (`trkopt`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tracking {
    #[default]
    NoTrk,
    Ftf,
    RoiFtf,
}

impl Tracking {
    pub fn enabled(self) -> bool {
        !matches!(self, Tracking::NoTrk)
    }

    pub fn token(self) -> &'static str {
        match self {
            Tracking::NoTrk => "notrk",
            Tracking::Ftf => "ftf",
            Tracking::RoiFtf => "roiftf",
        }
    }
}

/// Jet calibration sequence (`jetCalib`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JetCalibration {
    NoCalib,
    Jes,
    SubJes,
    SubJesIS,
    SubJesGsc,
    SubJesGscIS,
    SubResJesGsc,
    SubResJesGscIS,
}

impl JetCalibration {
    pub const ALL: [JetCalibration; 8] = [
        JetCalibration::NoCalib,
        JetCalibration::Jes,
        JetCalibration::SubJes,
        JetCalibration::SubJesIS,
        JetCalibration::SubJesGsc,
        JetCalibration::SubJesGscIS,
        JetCalibration::SubResJesGsc,
        JetCalibration::SubResJesGscIS,
    ];

    pub fn token(self) -> &'static str {
        match self {
            JetCalibration::NoCalib => "nojcalib",
            JetCalibration::Jes => "jes",
            JetCalibration::SubJes => "subjes",
            JetCalibration::SubJesIS => "subjesIS",
            JetCalibration::SubJesGsc => "subjesgsc",
            JetCalibration::SubJesGscIS => "subjesgscIS",
            JetCalibration::SubResJesGsc => "subresjesgsc",
            JetCalibration::SubResJesGscIS => "subresjesgscIS",
        }
    }

    /// Area-based pileup subtraction; needs the event-density input.
    pub fn pileup_subtraction(self) -> bool {
        !matches!(self, JetCalibration::NoCalib | JetCalibration::Jes)
    }

    /// Residual pileup correction; needs primary vertices.
    pub fn residual(self) -> bool {
        matches!(
            self,
            JetCalibration::SubResJesGsc | JetCalibration::SubResJesGscIS
        )
    }

    /// Global sequential calibration; needs tracks.
    pub fn gsc(self) -> bool {
        matches!(
            self,
            JetCalibration::SubJesGsc
                | JetCalibration::SubJesGscIS
                | JetCalibration::SubResJesGsc
                | JetCalibration::SubResJesGscIS
        )
    }

    pub fn in_situ(self) -> bool {
        matches!(
            self,
            JetCalibration::SubJesIS
                | JetCalibration::SubJesGscIS
                | JetCalibration::SubResJesGscIS
        )
    }

    pub fn uses_tracks(self) -> bool {
        self.gsc() || self.residual()
    }
}

impl fmt::Display for JetCalibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for JetCalibration {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        JetCalibration::ALL
            .into_iter()
            .find(|calib| calib.token() == raw)
            .ok_or_else(|| {
                let known: Vec<&str> = JetCalibration::ALL.iter().map(|c| c.token()).collect();
                format!(
                    "unknown jet calibration '{raw}' (expected one of: default, {})",
                    known.join(", ")
                )
            })
    }
}

/// `jetCalib` as written in configuration: `default` or an explicit sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JetCalibSetting {
    #[default]
    Default,
    Explicit(JetCalibration),
}

impl TryFrom<String> for JetCalibSetting {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw == "default" {
            return Ok(JetCalibSetting::Default);
        }
        raw.parse().map(JetCalibSetting::Explicit)
    }
}

impl From<JetCalibSetting> for String {
    fn from(setting: JetCalibSetting) -> Self {
        match setting {
            JetCalibSetting::Default => "default".to_string(),
            JetCalibSetting::Explicit(calib) => calib.token().to_string(),
        }
    }
}

/// Reconstruction configuration passed to every input's dependency and
/// build functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecoConfig {
    pub reco_alg: RecoAlg,
    pub constituent: Constituent,
    pub cluster_calib: ClusterCalib,
    pub jet_calib: JetCalibSetting,
    pub tracking: Tracking,
}

impl RecoConfig {
    /// Calibration after resolving `default`: `jes` for large-R jets,
    /// otherwise chosen by constituent type.
    pub fn jet_calibration(&self) -> JetCalibration {
        match (self.jet_calib, self.constituent) {
            (JetCalibSetting::Explicit(calib), _) => calib,
            (JetCalibSetting::Default, _) if self.reco_alg != RecoAlg::A4 => JetCalibration::Jes,
            (JetCalibSetting::Default, Constituent::Topo) => JetCalibration::SubJesIS,
            (JetCalibSetting::Default, Constituent::PFlow) => JetCalibration::SubResJesGscIS,
        }
    }

    /// Collection-name fragment for the jet inputs, e.g. `EMTopo` or `EMPFlow`.
    pub fn constituent_label(&self) -> String {
        match self.constituent {
            Constituent::Topo => format!("{}Topo", self.cluster_calib.label()),
            Constituent::PFlow => "EMPFlow".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let calib = self.jet_calibration();
        if self.constituent == Constituent::PFlow && !self.tracking.enabled() {
            return Err("constituent 'pf' requires tracking (set tracking = \"ftf\")".to_string());
        }
        if self.constituent == Constituent::PFlow && self.cluster_calib == ClusterCalib::Lcw {
            return Err("constituent 'pf' is only defined for cluster_calib 'em'".to_string());
        }
        if calib.uses_tracks() && !self.tracking.enabled() {
            return Err(format!("jet_calib '{calib}' requires tracking"));
        }
        if self.reco_alg != RecoAlg::A4 && calib.in_situ() && self.reco_alg != RecoAlg::A10t {
            return Err(format!(
                "jet_calib '{calib}' has no in-situ step for reco_alg '{}'",
                self.reco_alg.token()
            ));
        }
        Ok(())
    }
}

impl CanonicalKey for RecoConfig {
    /// JSON of the config with `jet_calib = "default"` replaced by the
    /// calibration it resolves to.
    fn canonical_key(&self) -> String {
        json_key(&RecoConfig {
            jet_calib: JetCalibSetting::Explicit(self.jet_calibration()),
            ..self.clone()
        })
    }
}

/// Predicate over a `RecoConfig`, used by conditional dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    PFlow,
    Topo,
    Lcw,
    Tracking,
    PileupSubtraction,
    Residual,
    Gsc,
    InSitu,
    LargeR,
}

impl Condition {
    const ALL: [Condition; 9] = [
        Condition::PFlow,
        Condition::Topo,
        Condition::Lcw,
        Condition::Tracking,
        Condition::PileupSubtraction,
        Condition::Residual,
        Condition::Gsc,
        Condition::InSitu,
        Condition::LargeR,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Condition::PFlow => "pflow",
            Condition::Topo => "topo",
            Condition::Lcw => "lcw",
            Condition::Tracking => "tracking",
            Condition::PileupSubtraction => "pileup_subtraction",
            Condition::Residual => "residual",
            Condition::Gsc => "gsc",
            Condition::InSitu => "in_situ",
            Condition::LargeR => "large_r",
        }
    }

    pub fn holds(self, config: &RecoConfig) -> bool {
        let calib = config.jet_calibration();
        match self {
            Condition::PFlow => config.constituent == Constituent::PFlow,
            Condition::Topo => config.constituent == Constituent::Topo,
            Condition::Lcw => config.cluster_calib == ClusterCalib::Lcw,
            Condition::Tracking => config.tracking.enabled(),
            Condition::PileupSubtraction => calib.pileup_subtraction(),
            Condition::Residual => calib.residual(),
            Condition::Gsc => calib.gsc(),
            Condition::InSitu => calib.in_situ(),
            Condition::LargeR => config.reco_alg != RecoAlg::A4,
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|condition| condition.token() == raw)
            .ok_or_else(|| format!("unknown condition '{raw}'"))
    }
}

/// A `Condition`, optionally negated with a leading `!`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConditionExpr {
    pub condition: Condition,
    pub negated: bool,
}

impl ConditionExpr {
    pub fn holds(self, config: &RecoConfig) -> bool {
        self.condition.holds(config) != self.negated
    }
}

impl FromStr for ConditionExpr {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        match trimmed.strip_prefix('!') {
            Some(rest) => Ok(ConditionExpr {
                condition: rest.trim().parse()?,
                negated: true,
            }),
            None => Ok(ConditionExpr {
                condition: trimmed.parse()?,
                negated: false,
            }),
        }
    }
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        f.write_str(self.condition.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_tokens_parse_to_closed_variants() {
        for calib in JetCalibration::ALL {
            assert_eq!(calib.token().parse::<JetCalibration>(), Ok(calib));
        }
        let err = "subjesISgsc".parse::<JetCalibration>().expect_err("unknown");
        assert!(err.contains("unknown jet calibration 'subjesISgsc'"));
    }

    #[test]
    fn calibration_predicates() {
        let calib = JetCalibration::SubResJesGscIS;
        assert!(calib.pileup_subtraction());
        assert!(calib.residual());
        assert!(calib.gsc());
        assert!(calib.in_situ());
        assert!(calib.uses_tracks());

        assert!(!JetCalibration::SubJesIS.uses_tracks());
        assert!(JetCalibration::SubJesIS.in_situ());
        assert!(!JetCalibration::Jes.pileup_subtraction());
    }

    #[test]
    fn default_calibration_depends_on_constituent() {
        let topo = RecoConfig::default();
        assert_eq!(topo.jet_calibration(), JetCalibration::SubJesIS);

        let pflow = RecoConfig {
            constituent: Constituent::PFlow,
            tracking: Tracking::Ftf,
            ..RecoConfig::default()
        };
        assert_eq!(pflow.jet_calibration(), JetCalibration::SubResJesGscIS);
        assert_eq!(pflow.constituent_label(), "EMPFlow");

        let large_r = RecoConfig {
            reco_alg: RecoAlg::A10,
            ..RecoConfig::default()
        };
        assert_eq!(large_r.jet_calibration(), JetCalibration::Jes);
        assert!(large_r.validate().is_ok());
    }

    #[test]
    fn parses_from_toml_tokens() {
        let cfg: RecoConfig = toml::from_str(
            "reco_alg = \"a10t\"\nconstituent = \"tc\"\ncluster_calib = \"lcw\"\njet_calib = \"jes\"\n",
        )
        .expect("parse");
        assert_eq!(cfg.reco_alg, RecoAlg::A10t);
        assert_eq!(cfg.cluster_calib, ClusterCalib::Lcw);
        assert_eq!(cfg.jet_calib, JetCalibSetting::Explicit(JetCalibration::Jes));
        assert_eq!(cfg.tracking, Tracking::NoTrk);
        assert_eq!(cfg.constituent_label(), "LCTopo");
    }

    #[test]
    fn rejects_unknown_calibration_at_load() {
        let err = toml::from_str::<RecoConfig>("jet_calib = \"subjesXX\"\n").expect_err("bad");
        assert!(err.to_string().contains("unknown jet calibration"));
    }

    #[test]
    fn validate_rejects_inconsistent_combinations() {
        let pflow_no_tracks = RecoConfig {
            constituent: Constituent::PFlow,
            ..RecoConfig::default()
        };
        assert!(pflow_no_tracks.validate().is_err());

        let gsc_no_tracks = RecoConfig {
            jet_calib: JetCalibSetting::Explicit(JetCalibration::SubJesGscIS),
            ..RecoConfig::default()
        };
        assert_eq!(
            gsc_no_tracks.validate(),
            Err("jet_calib 'subjesgscIS' requires tracking".to_string())
        );

        assert!(RecoConfig::default().validate().is_ok());
    }

    #[test]
    fn canonical_key_resolves_default_calibration() {
        let implicit = RecoConfig::default();
        let explicit = RecoConfig {
            jet_calib: JetCalibSetting::Explicit(JetCalibration::SubJesIS),
            ..RecoConfig::default()
        };
        assert_eq!(implicit.canonical_key(), explicit.canonical_key());
        assert_eq!(
            implicit.canonical_key(),
            r#"{"cluster_calib":"em","constituent":"tc","jet_calib":"subjesIS","reco_alg":"a4","tracking":"notrk"}"#
        );
        assert_ne!(
            implicit.canonical_key(),
            RecoConfig {
                tracking: Tracking::Ftf,
                ..RecoConfig::default()
            }
            .canonical_key()
        );
    }

    #[test]
    fn conditions_evaluate_against_config() {
        let pflow = RecoConfig {
            constituent: Constituent::PFlow,
            tracking: Tracking::Ftf,
            ..RecoConfig::default()
        };
        let topo = RecoConfig::default();

        let gsc: ConditionExpr = "gsc".parse().expect("gsc");
        assert!(gsc.holds(&pflow));
        assert!(!gsc.holds(&topo));

        let not_tracking: ConditionExpr = " !tracking".parse().expect("negated");
        assert!(not_tracking.negated);
        assert!(not_tracking.holds(&topo));
        assert!(!not_tracking.holds(&pflow));
        assert_eq!(not_tracking.to_string(), "!tracking");

        assert_eq!(
            "jetcalib".parse::<ConditionExpr>(),
            Err("unknown condition 'jetcalib'".to_string())
        );
    }
}
