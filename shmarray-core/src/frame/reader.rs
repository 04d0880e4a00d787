// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Frame readers.
//!
//! `open_and_map` checks the file size, magic and type tag before mapping
//! anything, so no payload byte is trusted until the header is. Any failure
//! removes the file: a rejected frame is never retried.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::FileExt;
use std::path::Path;

use serde::Serialize;

use crate::error::{ExchangeError, ExchangeResult, FrameIoError};
use crate::frame::header::{self, HEADER_LEN};
use crate::frame::mapped::{FrameMapping, MappedFrame};
use crate::frame::opener::RemoveOnDrop;
use crate::frame::FrameExchange;
use crate::state::{FrameLifecycle, FrameState};
use crate::types::{Element, ElementType, FrameDescriptor, Handle};

/// Chunk size used when checksumming a frame for inspection.
const INSPECT_CHUNK: usize = 64 * 1024;

/// Non-destructive view of a frame file.
#[derive(Debug, Clone, Serialize)]
pub struct FrameSummary {
    pub handle: Handle,
    /// Total file size including the header.
    pub file_len: u64,
    pub magic_ok: bool,
    /// `Unknown` when the magic or the tag is unrecognized.
    pub element_type: ElementType,
    pub payload_len: u64,
    /// Whole elements in the payload, when the type is known.
    pub element_count: Option<u64>,
    /// CRC32 of the payload bytes.
    pub crc32: u32,
}

impl FrameExchange {
    /// Open, validate and map a published frame.
    ///
    /// The returned frame must be released exactly once, either through
    /// [`MappedFrame::release`] or by dropping it.
    pub fn open_and_map(
        &self,
        handle: &Handle,
        payload_len: usize,
        element_type: ElementType,
    ) -> ExchangeResult<MappedFrame> {
        let mut lifecycle = FrameLifecycle::published(handle);
        let guard = RemoveOnDrop::new(handle.as_path());

        match map_validated(handle.as_path(), payload_len, element_type, &mut lifecycle) {
            Ok(mapping) => {
                guard.disarm();
                lifecycle.advance(FrameState::Mapped);
                tracing::debug!(handle = %handle, bytes = payload_len, "Mapped frame");
                Ok(MappedFrame::new(
                    handle.clone(),
                    element_type,
                    mapping,
                    lifecycle,
                ))
            }
            Err(e) => {
                tracing::warn!(handle = %handle, error = %e, "Rejected frame, removing");
                lifecycle.fail();
                Err(e)
            }
        }
    }

    /// Copy a frame's payload out and release the frame.
    pub fn read_copy(
        &self,
        handle: &Handle,
        payload_len: usize,
        element_type: ElementType,
    ) -> ExchangeResult<Vec<u8>> {
        let mut frame = self.open_and_map(handle, payload_len, element_type)?;

        let data = frame.payload().to_vec();
        frame.mark_consumed();
        frame.release()?;

        Ok(data)
    }

    /// Read a frame described by `desc` into an aligned vector of `T`.
    ///
    /// The frame must have been written with `T`'s element type.
    pub fn read_vec<T: Element>(&self, desc: &FrameDescriptor) -> ExchangeResult<Vec<T>> {
        let byte_len = desc
            .len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| {
                ExchangeError::invalid(format!("Element count {} overflows", desc.len))
            })?;

        let mut frame = self.open_and_map(&desc.handle, byte_len, T::TYPE)?;

        if T::TYPE == ElementType::Boolean {
            if let Some(offset) = frame.payload().iter().position(|&b| b > 1) {
                let value = frame.payload()[offset];
                let path = desc.handle.as_path().to_path_buf();
                return Err(frame.reject(FrameIoError::InvalidBoolean {
                    path,
                    offset,
                    value,
                }));
            }
        }

        let mut out = vec![T::default(); desc.len];
        // SAFETY: out spans exactly byte_len bytes, T is plain old data and
        // boolean payloads were checked to hold only 0 or 1 above.
        unsafe {
            std::ptr::copy_nonoverlapping(frame.as_ptr(), out.as_mut_ptr() as *mut u8, byte_len);
        }

        frame.mark_consumed();
        frame.release()?;

        Ok(out)
    }

    /// Give a mapped frame back: unmap it and remove its file.
    pub fn release(&self, frame: MappedFrame) -> ExchangeResult<()> {
        frame.release()
    }

    /// Release a frame known only by its handle, length, type and interior
    /// pointer.
    ///
    /// # Safety
    /// Same contract as [`MappedFrame::from_raw`]: `ptr` must come from
    /// [`MappedFrame::into_raw`] for this very frame and is consumed here.
    pub unsafe fn release_raw(
        &self,
        handle: Handle,
        payload_len: usize,
        element_type: ElementType,
        ptr: *mut u8,
    ) -> ExchangeResult<()> {
        MappedFrame::from_raw(handle, payload_len, element_type, ptr)?.release()
    }

    /// Summarize a frame without consuming it.
    pub fn inspect(&self, handle: &Handle) -> ExchangeResult<FrameSummary> {
        let path = handle.as_path();
        let mut file = File::open(path).map_err(|source| FrameIoError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let file_len = file_len(&file, path)?;
        if file_len < HEADER_LEN as u64 {
            return Err(FrameIoError::TooSmall {
                path: path.to_path_buf(),
                size: file_len,
                min: HEADER_LEN as u64,
            }
            .into());
        }

        let read_err = |source| FrameIoError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut hdr = [0u8; HEADER_LEN];
        file.read_exact(&mut hdr).map_err(read_err)?;
        let recorded = header::element_type(&hdr);

        let mut hasher = crc32fast::Hasher::new();
        let mut chunk = vec![0u8; INSPECT_CHUNK];
        loop {
            let n = file.read(&mut chunk).map_err(read_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }

        let element_type = recorded.unwrap_or(ElementType::Unknown);
        let payload_len = file_len - HEADER_LEN as u64;

        Ok(FrameSummary {
            handle: handle.clone(),
            file_len,
            magic_ok: recorded.is_some(),
            element_type,
            payload_len,
            element_count: element_type.size().map(|size| payload_len / size as u64),
            crc32: hasher.finalize(),
        })
    }
}

fn file_len(file: &File, path: &Path) -> Result<u64, FrameIoError> {
    Ok(file
        .metadata()
        .map_err(|source| FrameIoError::Stat {
            path: path.to_path_buf(),
            source,
        })?
        .len())
}

/// Open → size check → header check → map.
fn map_validated(
    path: &Path,
    payload_len: usize,
    element_type: ElementType,
    lifecycle: &mut FrameLifecycle,
) -> ExchangeResult<FrameMapping> {
    element_type.check_byte_len(payload_len)?;
    let total = header::frame_len(payload_len)? as u64;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| FrameIoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    lifecycle.advance(FrameState::Opened);

    let size = file_len(&file, path)?;
    if size < HEADER_LEN as u64 {
        return Err(FrameIoError::TooSmall {
            path: path.to_path_buf(),
            size,
            min: HEADER_LEN as u64,
        }
        .into());
    }
    if size != total {
        return Err(FrameIoError::SizeMismatch {
            path: path.to_path_buf(),
            actual: size,
            expected: total,
        }
        .into());
    }

    let mut hdr = [0u8; HEADER_LEN];
    file.read_exact_at(&mut hdr, 0)
        .map_err(|source| FrameIoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    header::validate(path, &hdr, element_type)?;
    lifecycle.advance(FrameState::Validated);

    Ok(FrameMapping::map(&file, path, payload_len)?)
}
