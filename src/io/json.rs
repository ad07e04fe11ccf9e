// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! JSON mesh documents

use crate::geometry::Mesh;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn import_json(path: &Path) -> Result<Mesh> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read mesh file: {:?}", path))?;
    let mesh: Mesh = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse mesh JSON: {:?}", path))?;
    mesh.validate_indices()
        .with_context(|| format!("Invalid mesh JSON: {:?}", path))?;
    Ok(mesh)
}

pub fn export_json(mesh: &Mesh, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(mesh).context("Failed to serialize mesh")?;
    fs::write(path, content).with_context(|| format!("Failed to write mesh file: {:?}", path))
}
