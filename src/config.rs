// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Welding configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default merge tolerance in model units
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// File looked up in the working directory when no path is given
pub const CONFIG_FILE_NAME: &str = "vertexweld.toml";

/// Welding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeldConfig {
    /// Vertices strictly closer than this are merged
    pub epsilon: f64,
    /// Seed for the hierarchy insertion order; random when unset
    pub seed: Option<u64>,
    /// Cross-check the broad phase against an exhaustive comparison
    pub verify: bool,
    /// Report manifold and boundary information after welding
    pub topology: bool,
    /// Drop vertices no face references after welding
    pub prune_orphans: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for WeldConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            seed: None,
            verify: false,
            topology: false,
            prune_orphans: false,
            verbose: false,
        }
    }
}

impl WeldConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: WeldConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `path`, else `vertexweld.toml` if present, else defaults, then
    /// apply environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if PathBuf::from(CONFIG_FILE_NAME).exists() => Self::from_file(CONFIG_FILE_NAME)?,
            None => Self::default(),
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(epsilon) = std::env::var("VERTEXWELD_EPSILON") {
            self.epsilon = epsilon
                .parse()
                .with_context(|| format!("Invalid VERTEXWELD_EPSILON: {}", epsilon))?;
        }

        if let Ok(seed) = std::env::var("VERTEXWELD_SEED") {
            self.seed = Some(
                seed.parse()
                    .with_context(|| format!("Invalid VERTEXWELD_SEED: {}", seed))?,
            );
        }

        if let Ok(verify) = std::env::var("VERTEXWELD_VERIFY") {
            self.verify = verify.parse().unwrap_or(false);
        }

        if let Ok(verbose) = std::env::var("VERTEXWELD_VERBOSE") {
            self.verbose = verbose.parse().unwrap_or(false);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            bail!("epsilon must be positive and finite, got {}", self.epsilon);
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
