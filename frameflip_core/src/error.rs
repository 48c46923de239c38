// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use std::time::Duration;

use thiserror::Error;

use crate::format::RenderFormat;

/// Failures surfaced by the render manager and backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A bounded wait expired.
    #[error("{operation} timed out after {waited:?}")]
    Timeout {
        /// What was being waited for.
        operation: &'static str,
        /// How long the caller waited.
        waited: Duration,
    },
    /// The backend rejected the configuration or could not be created.
    #[error("renderer configuration failed")]
    ConfigureFailed,
    /// No backend can handle the requested format.
    #[error("no renderer handles format {0}")]
    UnsupportedFormat(RenderFormat),
    /// A render-thread-only operation was called from another thread.
    #[error("{operation} called from outside the render thread")]
    WrongThread {
        /// The rejected operation.
        operation: &'static str,
    },
}

/// A decoded picture does not match the image it is copied into.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PictureError {
    /// The source plane is too short for the declared geometry.
    #[error("source plane {plane} holds {len} bytes, needs {needed}")]
    ShortPlane {
        /// Plane number.
        plane: usize,
        /// Bytes available.
        len: usize,
        /// Bytes required.
        needed: usize,
    },
    /// Picture and image disagree on format.
    #[error("picture format {picture} does not match image format {image}")]
    FormatMismatch {
        /// Picture format.
        picture: RenderFormat,
        /// Image format.
        image: RenderFormat,
    },
}

/// Failure to load a [`RenderConfig`](crate::config::RenderConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document is malformed or has unknown keys.
    #[error("invalid render config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is outside its valid range.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}
