// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Space-checked creation of frame files.
//!
//! The file is created first, then the containing filesystem is asked for
//! its free space. Any failure removes the file before returning.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::error::{ExchangeError, ExchangeResult, FrameIoError};
use crate::types::Handle;

/// Removes a file when dropped unless disarmed.
///
/// Covers early returns and unwinding out of a fill callback alike.
pub(crate) struct RemoveOnDrop<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> RemoveOnDrop<'a> {
    pub(crate) fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    /// Keep the file.
    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed frame file after failure"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove frame file after failure"
            ),
        }
    }
}

/// Create (or truncate) the file behind `handle` and check that its
/// filesystem has at least `bytes_required` bytes free.
///
/// Returns a read-write descriptor; the caller owns the file from here on.
pub fn open_for_write(handle: &Handle, bytes_required: u64, mode: u32) -> ExchangeResult<File> {
    let path = handle.as_path();

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path);

    // A failed open may still leave a file behind.
    let guard = RemoveOnDrop::new(path);

    let file = file.map_err(|source| FrameIoError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    let stat = nix::sys::statvfs::fstatvfs(&file).map_err(|errno| FrameIoError::StatFs {
        path: path.to_path_buf(),
        source: std::io::Error::from(errno),
    })?;

    let available = (stat.blocks_available() as u64).saturating_mul(stat.fragment_size() as u64);
    if available < bytes_required {
        tracing::warn!(
            path = %path.display(),
            required = bytes_required,
            available = available,
            "Insufficient space for frame"
        );
        return Err(ExchangeError::OutOfSpace {
            path: path.to_path_buf(),
            required: bytes_required,
            available,
        });
    }

    guard.disarm();
    Ok(file)
}
