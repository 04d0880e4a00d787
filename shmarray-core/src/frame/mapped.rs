// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Owned mappings of frame files.
//!
//! A mapping is stored as its interior payload pointer only. The mapping
//! base is always recomputed as `payload - HEADER_LEN`, so the pointer handed
//! to callers and the pointer passed to `munmap` cannot drift apart.

use std::fs::File;
use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::ptr::NonNull;

use crate::error::{ExchangeError, ExchangeResult, FrameIoError};
use crate::frame::header::{self, HEADER_LEN};
use crate::state::{FrameLifecycle, FrameState};
use crate::types::{ElementType, Handle};

/// A shared read-write mapping of one whole frame.
///
/// Unmaps on drop. Never touches the file itself.
#[derive(Debug)]
pub(crate) struct FrameMapping {
    payload: NonNull<u8>,
    payload_len: usize,
    live: bool,
}

impl FrameMapping {
    /// Map `HEADER_LEN + payload_len` bytes of `file`, shared and read-write.
    pub(crate) fn map(file: &File, path: &Path, payload_len: usize) -> Result<Self, FrameIoError> {
        let len = HEADER_LEN + payload_len;

        // SAFETY: fd is valid for the duration of the call, len is non-zero,
        // offset 0 is valid. The mapping outlives the descriptor.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(FrameIoError::Map {
                path: path.to_path_buf(),
                len,
                source: std::io::Error::last_os_error(),
            });
        }

        let base = NonNull::new(ptr as *mut u8).ok_or_else(|| FrameIoError::Map {
            path: path.to_path_buf(),
            len,
            source: std::io::Error::other("mmap returned null"),
        })?;

        // SAFETY: the mapping is at least HEADER_LEN bytes long.
        let payload = unsafe { NonNull::new_unchecked(base.as_ptr().add(HEADER_LEN)) };

        Ok(Self {
            payload,
            payload_len,
            live: true,
        })
    }

    /// Adopt a mapping previously given away by [`FrameMapping::forget`].
    ///
    /// # Safety
    /// `payload` must be the interior pointer of a live mapping of exactly
    /// `HEADER_LEN + payload_len` bytes that nothing else will unmap.
    pub(crate) unsafe fn from_raw(payload: NonNull<u8>, payload_len: usize) -> Self {
        Self {
            payload,
            payload_len,
            live: true,
        }
    }

    fn base(&self) -> *mut u8 {
        // SAFETY: payload always sits HEADER_LEN bytes into the mapping.
        unsafe { self.payload.as_ptr().sub(HEADER_LEN) }
    }

    fn frame_len(&self) -> usize {
        HEADER_LEN + self.payload_len
    }

    pub(crate) fn header_mut(&mut self) -> &mut [u8; HEADER_LEN] {
        // SAFETY: base points at HEADER_LEN mapped bytes, uniquely borrowed.
        unsafe { &mut *(self.base() as *mut [u8; HEADER_LEN]) }
    }

    pub(crate) fn payload_ptr(&self) -> NonNull<u8> {
        self.payload
    }

    pub(crate) fn payload(&self) -> &[u8] {
        // SAFETY: payload_len bytes past the header are mapped for our lifetime.
        unsafe { std::slice::from_raw_parts(self.payload.as_ptr(), self.payload_len) }
    }

    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self gives exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.payload.as_ptr(), self.payload_len) }
    }

    /// Unmap now. Idempotent.
    pub(crate) fn unmap(&mut self) -> std::io::Result<()> {
        if !self.live {
            return Ok(());
        }
        self.live = false;

        // SAFETY: base and frame_len describe exactly the region mmap returned.
        let result = unsafe { libc::munmap(self.base() as *mut libc::c_void, self.frame_len()) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    /// Stop owning the mapping without unmapping it.
    pub(crate) fn forget(&mut self) {
        self.live = false;
    }
}

impl Drop for FrameMapping {
    fn drop(&mut self) {
        if let Err(e) = self.unmap() {
            tracing::error!(error = %e, "Failed to unmap frame");
        }
    }
}

/// A validated frame mapped into this process.
///
/// The single owner of the frame's reclamation: [`MappedFrame::release`]
/// unmaps and removes the backing file. Dropping an unreleased frame does
/// the same, logging instead of returning errors.
#[derive(Debug)]
pub struct MappedFrame {
    handle: Handle,
    element_type: ElementType,
    mapping: FrameMapping,
    lifecycle: FrameLifecycle,
    released: bool,
}

// SAFETY: MappedFrame owns its mapping; nothing else in the process aliases it.
unsafe impl Send for MappedFrame {}

// SAFETY: shared references only hand out &[u8].
unsafe impl Sync for MappedFrame {}

impl MappedFrame {
    pub(crate) fn new(
        handle: Handle,
        element_type: ElementType,
        mapping: FrameMapping,
        lifecycle: FrameLifecycle,
    ) -> Self {
        Self {
            handle,
            element_type,
            mapping,
            lifecycle,
            released: false,
        }
    }

    /// Rebuild a frame from the pointer returned by [`MappedFrame::into_raw`].
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` on a frame with the same handle,
    /// payload length and element type, and must not have been passed to
    /// `from_raw` before. The resulting frame owns the mapping again.
    pub unsafe fn from_raw(
        handle: Handle,
        payload_len: usize,
        element_type: ElementType,
        ptr: *mut u8,
    ) -> ExchangeResult<Self> {
        element_type.check_byte_len(payload_len)?;
        header::frame_len(payload_len)?;
        let payload =
            NonNull::new(ptr).ok_or_else(|| ExchangeError::invalid("Null payload pointer"))?;

        let lifecycle = FrameLifecycle::starting_at(&handle, FrameState::Mapped);
        Ok(Self::new(
            handle,
            element_type,
            FrameMapping::from_raw(payload, payload_len),
            lifecycle,
        ))
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.mapping.payload_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> FrameState {
        self.lifecycle.state()
    }

    /// The payload, straight from shared memory.
    ///
    /// Starts 9 bytes into a page, so it is not aligned for multi-byte
    /// element types.
    pub fn payload(&self) -> &[u8] {
        self.mapping.payload()
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.mapping.payload_mut()
    }

    /// Interior pointer to the first payload byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.mapping.payload_ptr().as_ptr()
    }

    pub(crate) fn mark_consumed(&mut self) {
        self.lifecycle.advance(FrameState::Consumed);
    }

    /// Fail the frame, reclaiming it, and hand back the error.
    pub(crate) fn reject(mut self, err: FrameIoError) -> ExchangeError {
        tracing::warn!(handle = %self.handle, error = %err, "Rejected mapped frame");
        self.lifecycle.fail();
        drop(self);
        err.into()
    }

    /// Unmap the frame and remove its backing file.
    ///
    /// File removal is attempted even when unmapping fails.
    pub fn release(mut self) -> ExchangeResult<()> {
        self.released = true;
        let path = self.handle.as_path();

        let unmapped = self.mapping.unmap();
        let removed = std::fs::remove_file(path);

        if let Err(source) = unmapped {
            self.lifecycle.fail();
            return Err(FrameIoError::Unmap {
                path: path.to_path_buf(),
                source,
            }
            .into());
        }
        if let Err(source) = removed {
            self.lifecycle.fail();
            return Err(FrameIoError::Remove {
                path: path.to_path_buf(),
                source,
            }
            .into());
        }

        self.lifecycle.advance(FrameState::Released);
        tracing::debug!(
            handle = %self.handle,
            bytes = self.mapping.payload_len,
            "Released frame"
        );
        Ok(())
    }

    /// Give up ownership, returning the interior payload pointer.
    ///
    /// The mapping and file stay alive until the pointer is handed back to
    /// [`MappedFrame::from_raw`] and released.
    pub fn into_raw(mut self) -> *mut u8 {
        self.released = true;
        self.mapping.forget();
        self.mapping.payload_ptr().as_ptr()
    }
}

impl Drop for MappedFrame {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        tracing::debug!(handle = %self.handle, "Frame dropped without release, reclaiming");

        let mut clean = true;
        if let Err(e) = self.mapping.unmap() {
            clean = false;
            tracing::error!(handle = %self.handle, error = %e, "Failed to unmap frame");
        }
        match std::fs::remove_file(self.handle.as_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                clean = false;
                tracing::error!(handle = %self.handle, error = %e, "Failed to remove frame file");
            }
        }

        if clean {
            if !self.lifecycle.state().is_terminal() {
                self.lifecycle.advance(FrameState::Released);
            }
        } else {
            self.lifecycle.fail();
        }
    }
}
