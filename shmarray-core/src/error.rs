// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for shmarray.
//!
//! Explicit enum error types only. No `Box<dyn Error>` in return positions,
//! no `anyhow::Result` - every failure is strongly typed and carries the
//! underlying OS error as its source where one exists.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ElementType;

/// Top-level error type for the frame exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    // =========================================================================
    // Caller Errors - nothing was created
    // =========================================================================
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // =========================================================================
    // Storage Errors - partial state is always cleaned up before these surface
    // =========================================================================
    #[error("Frame I/O failure: {0}")]
    Io(#[from] FrameIoError),

    #[error("Insufficient space for {path}: need {required} bytes, {available} available")]
    OutOfSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    // =========================================================================
    // Handle Allocation
    // =========================================================================
    #[error("Handle allocation failed: {0}")]
    Clock(#[from] ClockError),
}

impl ExchangeError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// True for storage, mapping and validation failures.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Storage, mapping and frame validation failures.
#[derive(Debug, Error)]
pub enum FrameIoError {
    #[error("Could not create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not query free space for {path}: {source}")]
    StatFs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read from {path} failed: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Write to {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not extend {path} to {len} bytes: {source}")]
    Extend {
        path: PathBuf,
        len: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("mmap of {path} ({len} bytes) failed: {source}")]
    Map {
        path: PathBuf,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("munmap of {path} failed: {source}")]
    Unmap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File size of {path} incorrect: got {actual} bytes but expected {expected} bytes")]
    SizeMismatch {
        path: PathBuf,
        actual: u64,
        expected: u64,
    },

    #[error("File {path} is too small to hold a frame header: {size} bytes (min: {min})")]
    TooSmall { path: PathBuf, size: u64, min: u64 },

    #[error("Magic bytes in {path} are {found:?} but expected {expected:?}")]
    MagicMismatch {
        path: PathBuf,
        found: [u8; 8],
        expected: [u8; 8],
    },

    #[error("Element type in {path} is {found} but expected {expected}")]
    TypeMismatch {
        path: PathBuf,
        found: ElementType,
        expected: ElementType,
    },

    #[error("Boolean payload in {path} holds {value:#04x} at offset {offset}")]
    InvalidBoolean {
        path: PathBuf,
        offset: usize,
        value: u8,
    },

    #[error("Payload fill for {path} failed: {source}")]
    Fill {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// The system clock could not produce a timestamp for a new handle.
#[derive(Debug, Error)]
#[error("System clock unavailable: {0}")]
pub struct ClockError(#[from] pub std::time::SystemTimeError);

/// Illegal frame lifecycle transitions.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition from {from} to {to} for frame {handle}")]
    InvalidTransition {
        handle: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Frame {handle} is in terminal state: {state}")]
    TerminalState { handle: String, state: &'static str },
}

/// Configuration errors - invalid configuration prevents startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    Parse { message: String },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Process-wide instance guard errors.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("Instance already initialized in this process: {owner}")]
    AlreadyInitialized { owner: String },
}

/// Result type alias using ExchangeError.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_display() {
        let err = FrameIoError::SizeMismatch {
            path: PathBuf::from("/dev/shm/1.2.3"),
            actual: 12,
            expected: 29,
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/shm/1.2.3"));
        assert!(msg.contains("12"));
        assert!(msg.contains("29"));
    }

    #[test]
    fn test_error_chain_keeps_os_error() {
        use std::error::Error as _;

        let os = std::io::Error::from_raw_os_error(libc::ENOSPC);
        let err: ExchangeError = FrameIoError::Write {
            path: PathBuf::from("/dev/shm/x"),
            source: os,
        }
        .into();

        assert!(err.is_io());
        let io = err.source().expect("io error has a source");
        let os = io.source().expect("frame error has an os source");
        assert!(os.to_string().contains("os error"));
    }

    #[test]
    fn test_type_mismatch_names_both_types() {
        let err = FrameIoError::TypeMismatch {
            path: PathBuf::from("/dev/shm/x"),
            found: ElementType::Int32,
            expected: ElementType::Float64,
        };
        let msg = err.to_string();
        assert!(msg.contains("int32"));
        assert!(msg.contains("float64"));
    }
}
