// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - mesh import and export

mod json;
mod stl;

pub use json::{export_json, import_json};
pub use stl::{export_stl, import_stl};

use crate::geometry::Mesh;
use anyhow::{bail, Result};
use std::path::Path;

/// Supported mesh file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Json,
}

impl MeshFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("stl") => Ok(Self::Stl),
            Some("json") => Ok(Self::Json),
            _ => bail!(
                "Unsupported mesh format: {:?} (supported formats: stl, json)",
                path
            ),
        }
    }
}

/// Load a mesh, choosing the reader from the file extension
pub fn import_mesh(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    match MeshFormat::from_path(path)? {
        MeshFormat::Stl => import_stl(path),
        MeshFormat::Json => import_json(path),
    }
}

/// Save a mesh, choosing the writer from the file extension
pub fn export_mesh(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match MeshFormat::from_path(path)? {
        MeshFormat::Stl => export_stl(mesh, path),
        MeshFormat::Json => export_json(mesh, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MeshFormat::from_path(Path::new("a/b.STL")).unwrap(), MeshFormat::Stl);
        assert_eq!(MeshFormat::from_path(Path::new("mesh.json")).unwrap(), MeshFormat::Json);
        assert!(MeshFormat::from_path(Path::new("mesh.obj")).is_err());
        assert!(MeshFormat::from_path(Path::new("mesh")).is_err());
    }
}
