//! Key files
//!
//! One JSON file per user holding `{a_sk, k_sk, a_pk, k_pk}` in hex. Loading
//! checks that the public halves match the secrets.

use std::path::Path;

use anyhow::{Context, Result};
use shroud_privacy::ShieldedKeys;

pub fn save_keys(path: &Path, keys: &ShieldedKeys) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(keys)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write key file {}", path.display()))?;
    log::info!("Wrote keys for {} to {}", keys.address, path.display());
    Ok(())
}

pub fn load_keys(path: &Path) -> Result<ShieldedKeys> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read key file {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid key file {}", path.display()))
}
