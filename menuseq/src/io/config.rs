//! Reconstruction configuration stored under `.menuseq/reco.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::menu::RecoConfig;

/// Load the reconstruction configuration from a TOML file.
///
/// If the file is missing, returns `RecoConfig::default()`.
pub fn load_config(path: &Path) -> Result<RecoConfig> {
    if !path.exists() {
        let cfg = RecoConfig::default();
        validate(&cfg, path)?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RecoConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    validate(&cfg, path)?;
    Ok(cfg)
}

fn validate(cfg: &RecoConfig, path: &Path) -> Result<()> {
    cfg.validate()
        .map_err(|msg| anyhow!("invalid config {}: {msg}", path.display()))
}

/// Atomically write the configuration to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RecoConfig) -> Result<()> {
    validate(cfg, path)?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write `contents` next to `path` and rename it into place.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
