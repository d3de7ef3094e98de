//! Engine configuration stored as a TOML file.
//!
//! This file is intended to be edited by humans and must remain stable and
//! automatable. Missing fields default to sensible values.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::Rates;
use crate::io::prompt::PromptVariant;

/// Top-level configuration (TOML).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RadarConfig {
    pub generator: GeneratorConfig,
    pub retry: RetryConfig,
    pub rates: Rates,
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Command that accepts a prompt on stdin and writes the completion to
    /// stdout (e.g. `["gemini", "--output-format", "text"]`).
    pub command: Vec<String>,

    /// Hard per-attempt time budget in seconds.
    pub timeout_secs: u64,

    /// Truncate generator stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: vec!["gemini".to_string()],
            timeout_secs: 12,
            output_limit_bytes: 200_000,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total generation attempts before switching to the deterministic path.
    pub max_attempts: u32,

    /// Constant delay between attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 750,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    pub variant: PromptVariant,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            variant: PromptVariant::Schema,
        }
    }
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            retry: RetryConfig::default(),
            rates: Rates::default(),
            prompt: PromptConfig::default(),
        }
    }
}

impl RadarConfig {
    pub fn validate(&self) -> Result<()> {
        if self.generator.command.is_empty() || self.generator.command[0].trim().is_empty() {
            return Err(anyhow!("generator.command must be a non-empty array"));
        }
        if self.generator.timeout_secs == 0 {
            return Err(anyhow!("generator.timeout_secs must be > 0"));
        }
        if self.generator.output_limit_bytes == 0 {
            return Err(anyhow!("generator.output_limit_bytes must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be > 0"));
        }
        if !(self.rates.credit_rate > 0.0 && self.rates.credit_rate < 1.0) {
            return Err(anyhow!("rates.credit_rate must be within (0, 1)"));
        }
        if !(self.rates.ibs_share > 0.0 && self.rates.ibs_share < 1.0) {
            return Err(anyhow!("rates.ibs_share must be within (0, 1)"));
        }
        if !(self.rates.default_simples_rate > 0.0 && self.rates.default_simples_rate < 100.0) {
            return Err(anyhow!("rates.default_simples_rate must be within (0, 100)"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RadarConfig::default()`.
pub fn load_config(path: &Path) -> Result<RadarConfig> {
    if !path.exists() {
        let cfg = RadarConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RadarConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RadarConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
