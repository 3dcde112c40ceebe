//! Shroud Configuration
//!
//! Shared configuration crate for the shroud mixer client.
//!
//! Handles loading configuration from:
//! 1. SHROUD_CONFIG env var (explicit path)
//! 2. ./shroud.toml (current directory)
//! 3. ~/.shroud/config.toml (user home)
//!
//! Environment variables take precedence over TOML config. The loaded
//! [`ShroudConfig`] is passed explicitly to the components that need it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const LOCAL_CONFIG_FILE: &str = "shroud.toml";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".shroud";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_PROVER_URL: &str = "http://127.0.0.1:50051";
const DEFAULT_PROVER_TIMEOUT_SECS: u64 = 300;
const DEFAULT_WALLET_DIR: &str = "./shroud-wallet";
const DEFAULT_TREE_DEPTH: usize = 32;
const DEFAULT_SYNC_BLOCKS_PER_BATCH: u64 = 1000;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShroudConfig {
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Where proofs come from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProverMode {
    /// In-process simulated prover (development and tests)
    #[default]
    Mock,
    /// Remote proving service
    Http,
}

/// zk-SNARK scheme the mixer contract verifies
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProofSystemKind {
    #[default]
    Groth16,
    Pghr13,
}

impl std::str::FromStr for ProofSystemKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "groth16" => Ok(Self::Groth16),
            "pghr13" => Ok(Self::Pghr13),
            other => anyhow::bail!("unknown proof system: {other}"),
        }
    }
}

/// Prover configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default)]
    pub mode: ProverMode,
    #[serde(default)]
    pub proof_system: ProofSystemKind,
    #[serde(default = "default_prover_url")]
    pub url: String,
    #[serde(default = "default_prover_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            mode: ProverMode::Mock,
            proof_system: ProofSystemKind::Groth16,
            url: DEFAULT_PROVER_URL.into(),
            timeout_secs: DEFAULT_PROVER_TIMEOUT_SECS,
        }
    }
}

fn default_prover_url() -> String {
    DEFAULT_PROVER_URL.into()
}
fn default_prover_timeout() -> u64 {
    DEFAULT_PROVER_TIMEOUT_SECS
}

/// Wallet storage and sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Directory holding one database per user
    #[serde(default = "default_wallet_dir")]
    pub data_dir: String,
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,
    /// Blocks scanned per atomic commit
    #[serde(default = "default_sync_blocks")]
    pub sync_blocks_per_batch: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_WALLET_DIR.into(),
            tree_depth: DEFAULT_TREE_DEPTH,
            sync_blocks_per_batch: DEFAULT_SYNC_BLOCKS_PER_BATCH,
        }
    }
}

fn default_wallet_dir() -> String {
    DEFAULT_WALLET_DIR.into()
}
fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}
fn default_sync_blocks() -> u64 {
    DEFAULT_SYNC_BLOCKS_PER_BATCH
}

impl WalletConfig {
    /// Database directory for `username`
    pub fn user_dir(&self, username: &str) -> PathBuf {
        Path::new(&self.data_dir).join(username)
    }
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from a variable if present
fn env_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut String) {
    if let Some(v) = lookup(key) {
        *field = v;
    }
}

/// Set field from a variable if present and parseable
fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) {
    match lookup(key).map(|v| v.parse()) {
        Some(Ok(parsed)) => *field = parsed,
        Some(Err(_)) => log::warn!("Ignoring unparseable value for {key}"),
        None => {}
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl ShroudConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check SHROUD_CONFIG env var
        if let Ok(path) = env::var("SHROUD_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("SHROUD_CONFIG points to missing file: {}", path.display());
        }

        // 2. Check ./shroud.toml (current directory)
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.shroud/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// [`load`](Self::load))
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Prover
        if let Some(v) = lookup("SHROUD_PROVER_MODE") {
            self.prover.mode = match v.to_ascii_lowercase().as_str() {
                "http" | "remote" => ProverMode::Http,
                _ => ProverMode::Mock,
            };
        }
        env_parse(&lookup, "SHROUD_PROOF_SYSTEM", &mut self.prover.proof_system);
        env_string(&lookup, "SHROUD_PROVER_URL", &mut self.prover.url);
        env_parse(&lookup, "SHROUD_PROVER_TIMEOUT_SECS", &mut self.prover.timeout_secs);

        // Wallet
        env_string(&lookup, "SHROUD_WALLET_DIR", &mut self.wallet.data_dir);
        env_parse(&lookup, "SHROUD_TREE_DEPTH", &mut self.wallet.tree_depth);
        env_parse(&lookup, "SHROUD_SYNC_BATCH", &mut self.wallet.sync_blocks_per_batch);
    }

    /// Reject values the rest of the client cannot work with
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..64).contains(&self.wallet.tree_depth),
            "wallet.tree_depth must be between 1 and 63, got {}",
            self.wallet.tree_depth
        );
        anyhow::ensure!(
            self.wallet.sync_blocks_per_batch > 0,
            "wallet.sync_blocks_per_batch must be positive"
        );
        anyhow::ensure!(
            self.prover.timeout_secs > 0,
            "prover.timeout_secs must be positive"
        );
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
