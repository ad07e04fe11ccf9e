// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for hierarchy construction and welding

use thiserror::Error;

/// Errors raised by the hierarchy and the duplicate resolver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeldError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, WeldError>;
