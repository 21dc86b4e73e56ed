//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`RetargetError`] covers the failure modes that can
//! legitimately reach a caller:
//! - Configuration loading (settings, region pattern tables)
//! - Scene lookups with stale handles
//! - The optional external authoring-tool path
//!
//! The crate itself only raises the configuration variants. The scene and
//! external-tool variants are the vocabulary for host implementations of
//! [`ExternalRetargeter`](crate::session::ExternalRetargeter); the session
//! logs whichever one comes back and falls back to the in-process adapter.
//!
//! Mesh-level adaptation never returns an error. Unresolvable bones,
//! unreadable weights and degenerate bind matrices degrade the result and
//! are reported as warnings instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_retarget::errors::{RetargetError, Result};
//!
//! fn load_settings(json: &str) -> Result<RetargetSettings> {
//!     RetargetSettings::from_json(json)
//! }
//! ```

use std::time::Duration;

use thiserror::Error;

/// The main error type for the retargeting pipeline.
#[derive(Error, Debug)]
pub enum RetargetError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// JSON parsing error (settings, pattern tables, mapping tables).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The region pattern table is structurally invalid.
    #[error("Invalid region pattern table: {0}")]
    InvalidPatternTable(String),

    // ========================================================================
    // Scene Errors (external retargeter implementations)
    // ========================================================================
    /// A node handle no longer resolves in the scene.
    #[error("Scene node not found: {0}")]
    NodeNotFound(String),

    /// A skinned mesh handle no longer resolves in the scene.
    #[error("Skinned mesh not found: {0}")]
    MeshNotFound(String),

    // ========================================================================
    // External Tool Errors (external retargeter implementations)
    // ========================================================================
    /// The external authoring tool could not be located.
    #[error("External tool not found: {0}")]
    ExternalToolNotFound(String),

    /// The external authoring tool did not finish in time.
    #[error("External tool timed out after {0:?}")]
    ExternalToolTimeout(Duration),

    /// The external authoring tool exited unsuccessfully.
    #[error("External tool failed with exit status {status}")]
    ExternalToolFailed {
        /// Process exit status
        status: i32,
    },

    /// File I/O error raised while exchanging data with the external tool.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, RetargetError>`.
pub type Result<T> = std::result::Result<T, RetargetError>;
