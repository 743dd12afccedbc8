//! Process-wide configuration
//!
//! A single switch today: whether validators run as part of the call
//! pipeline. The flag is read fresh on every call, so flipping it takes
//! effect for the next call and never for one already in flight.
//!
//! Resolution order for [`ForgeConfig::from_env`]:
//! 1. SIGFORGE_CONFIG environment variable pointing at a YAML file
//! 2. SIGFORGE_RUN_VALIDATORS environment variable (overrides the file)
//! 3. Built-in defaults

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

static RUN_VALIDATORS: AtomicBool = AtomicBool::new(true);

/// Whether validators are run. Defaults to `true`.
pub fn get_run_validators() -> bool {
    RUN_VALIDATORS.load(Ordering::SeqCst)
}

/// Turn validators on or off for all subsequent calls.
pub fn set_run_validators(run: bool) {
    let previous = RUN_VALIDATORS.swap(run, Ordering::SeqCst);
    if previous != run {
        info!(run_validators = run, "validator switch changed");
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default = "default_true")]
    pub run_validators: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            run_validators: true,
        }
    }
}

impl ForgeConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse sigforge config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading sigforge configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("SIGFORGE_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(raw) = std::env::var("SIGFORGE_RUN_VALIDATORS") {
            config.run_validators = parse_flag(&raw)
                .ok_or_else(|| anyhow!("SIGFORGE_RUN_VALIDATORS must be a boolean, got '{}'", raw))?;
        }

        Ok(config)
    }

    /// Publish this configuration to the process-wide switches.
    pub fn apply(&self) {
        set_run_validators(self.run_validators);
    }

    /// Snapshot of the switches currently in effect.
    pub fn current() -> Self {
        Self {
            run_validators: get_run_validators(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Serialises tests that flip the process-wide switch.
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    static LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
