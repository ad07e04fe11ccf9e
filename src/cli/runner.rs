// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! File-level welding runner

use crate::config::WeldConfig;
use crate::geometry::{validate_mesh, Bvh, CandidatePairs, Mesh, MeshValidation, WeldStats};
use crate::io;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Broad phase compared against the exhaustive reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub broad_phase_pairs: usize,
    pub brute_force_pairs: usize,
    pub matches: bool,
}

/// Result of welding one file
#[derive(Debug, Clone)]
pub struct WeldRun {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub stats: WeldStats,
    pub orphans_removed: usize,
    pub topology: Option<MeshValidation>,
    pub verification: Option<Verification>,
    pub duration: Duration,
}

impl WeldRun {
    /// False only when verification ran and disagreed
    pub fn passed(&self) -> bool {
        self.verification.map_or(true, |v| v.matches)
    }
}

/// Runner for welding files according to a [`WeldConfig`]
pub struct Runner {
    config: WeldConfig,
}

impl Runner {
    pub fn new(config: WeldConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WeldConfig {
        &self.config
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Weld `mesh` in place
    pub fn weld_mesh(&self, mesh: &mut Mesh, input: &Path) -> Result<WeldRun> {
        let start = Instant::now();
        let mut rng = self.rng();

        let verification = if self.config.verify {
            Some(self.verify(mesh, &mut rng)?)
        } else {
            None
        };

        let stats = mesh
            .weld_vertices_with_rng(self.config.epsilon, &mut rng)
            .with_context(|| format!("Failed to weld {:?}", input))?;

        let orphans_removed = if self.config.prune_orphans {
            mesh.remove_orphaned_vertices()
        } else {
            0
        };

        let topology = self.config.topology.then(|| validate_mesh(mesh));

        Ok(WeldRun {
            input: input.to_path_buf(),
            output: None,
            stats,
            orphans_removed,
            topology,
            verification,
            duration: start.elapsed(),
        })
    }

    fn verify(&self, mesh: &Mesh, rng: &mut StdRng) -> Result<Verification> {
        let bvh = Bvh::build_with_rng(&mesh.vertices, self.config.epsilon, rng)?;
        let broad = bvh.broad_phase_detect();
        let brute = bvh.brute_force_detect();

        let verification = Verification {
            broad_phase_pairs: broad.len(),
            brute_force_pairs: brute.len(),
            matches: broad == brute,
        };
        if !verification.matches {
            tracing::warn!(
                broad_phase = broad.len(),
                brute_force = brute.len(),
                "broad phase disagrees with exhaustive comparison"
            );
        }
        Ok(verification)
    }

    /// Load `input`, weld it, and write the result to `output`
    pub fn weld_file(&self, input: &Path, output: &Path) -> Result<WeldRun> {
        let mut mesh = io::import_mesh(input)?;
        let mut run = self.weld_mesh(&mut mesh, input)?;
        io::export_mesh(&mesh, output)?;
        run.output = Some(output.to_path_buf());
        Ok(run)
    }

    /// Weld several files into `out_dir`, keeping each file name.
    /// Files are independent and processed in parallel.
    pub fn weld_batch(
        &self,
        inputs: &[PathBuf],
        out_dir: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<(PathBuf, Result<WeldRun>)>> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

        let results: Vec<(PathBuf, Result<WeldRun>)> = inputs
            .par_iter()
            .map(|input| {
                let result = match input.file_name() {
                    Some(name) => self.weld_file(input, &out_dir.join(name)),
                    None => Err(anyhow::anyhow!("Input has no file name: {:?}", input)),
                };
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                (input.clone(), result)
            })
            .collect();

        Ok(results)
    }

    /// Candidate pairs of a file's vertices
    pub fn candidate_pairs(&self, input: &Path) -> Result<CandidatePairs> {
        let mesh = io::import_mesh(input)?;
        let bvh = Bvh::build_with_rng(&mesh.vertices, self.config.epsilon, &mut self.rng())
            .with_context(|| format!("Failed to build hierarchy for {:?}", input))?;
        Ok(bvh.broad_phase_detect())
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(WeldConfig::default())
    }
}
