// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Frame writers.
//!
//! Buffered mode copies a caller buffer into the file with plain writes.
//! Write-through mode sizes the file, maps it, writes the header into the
//! mapping and lets the caller fill the payload in place. Both produce the
//! same bytes on disk. Neither removes the file on success; that belongs to
//! the reader's release.

use std::io::{Seek, SeekFrom, Write};

use crate::error::{ExchangeResult, FrameIoError};
use crate::frame::header;
use crate::frame::mapped::FrameMapping;
use crate::frame::opener::{open_for_write, RemoveOnDrop};
use crate::frame::FrameExchange;
use crate::state::{FrameLifecycle, FrameState};
use crate::types::{Element, ElementType, FrameDescriptor, Handle};

impl FrameExchange {
    /// Write `payload` as a frame of `element_type` and return its handle.
    pub fn write(&self, payload: &[u8], element_type: ElementType) -> ExchangeResult<Handle> {
        element_type.check_byte_len(payload.len())?;
        let total = header::frame_len(payload.len())?;

        let handle = self.allocator.allocate()?;
        let mut lifecycle = FrameLifecycle::new(&handle);

        if let Err(e) = self.write_buffered(&handle, payload, element_type, total) {
            lifecycle.fail();
            return Err(e);
        }

        self.publish(&handle, &mut lifecycle, payload.len());
        Ok(handle)
    }

    /// Write a frame whose payload is produced in place by `fill`.
    ///
    /// `fill` is called exactly once with the `payload_len` byte payload
    /// region of the mapped file.
    pub fn write_with<F>(
        &self,
        payload_len: usize,
        element_type: ElementType,
        fill: F,
    ) -> ExchangeResult<Handle>
    where
        F: FnOnce(&mut [u8]),
    {
        self.try_write_with(payload_len, element_type, |buf| {
            fill(buf);
            Ok::<(), std::convert::Infallible>(())
        })
    }

    /// Like [`FrameExchange::write_with`], for fills that can fail.
    ///
    /// A failing or panicking fill removes the file; a failure is reported
    /// as [`FrameIoError::Fill`].
    pub fn try_write_with<F, E>(
        &self,
        payload_len: usize,
        element_type: ElementType,
        fill: F,
    ) -> ExchangeResult<Handle>
    where
        F: FnOnce(&mut [u8]) -> Result<(), E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        element_type.check_byte_len(payload_len)?;
        let total = header::frame_len(payload_len)?;

        let handle = self.allocator.allocate()?;
        let mut lifecycle = FrameLifecycle::new(&handle);

        if let Err(e) = self.write_mapped(&handle, payload_len, element_type, total, fill) {
            lifecycle.fail();
            return Err(e);
        }

        self.publish(&handle, &mut lifecycle, payload_len);
        Ok(handle)
    }

    /// Write a typed slice and describe the frame for the consumer.
    pub fn write_slice<T: Element>(&self, data: &[T]) -> ExchangeResult<FrameDescriptor> {
        // SAFETY: Element is sealed to primitive types without padding, so
        // every byte of the slice is initialized.
        let bytes = unsafe {
            std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data))
        };

        let handle = self.write(bytes, T::TYPE)?;
        Ok(FrameDescriptor {
            handle,
            len: data.len(),
            element_type: T::TYPE,
        })
    }

    fn write_buffered(
        &self,
        handle: &Handle,
        payload: &[u8],
        element_type: ElementType,
        total: usize,
    ) -> ExchangeResult<()> {
        let path = handle.as_path();
        let mut file = open_for_write(handle, total as u64, self.config.file_mode)?;
        let guard = RemoveOnDrop::new(path);

        let write_err = |source| FrameIoError::Write {
            path: path.to_path_buf(),
            source,
        };
        file.write_all(&header::encode(element_type))
            .map_err(write_err)?;
        file.write_all(payload).map_err(write_err)?;

        check_size(&file, path, total)?;

        guard.disarm();
        Ok(())
    }

    fn write_mapped<F, E>(
        &self,
        handle: &Handle,
        payload_len: usize,
        element_type: ElementType,
        total: usize,
        fill: F,
    ) -> ExchangeResult<()>
    where
        F: FnOnce(&mut [u8]) -> Result<(), E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = handle.as_path();
        let mut file = open_for_write(handle, total as u64, self.config.file_mode)?;
        let guard = RemoveOnDrop::new(path);

        // Materialize the full length with a single byte at the end
        let extend_err = |source| FrameIoError::Extend {
            path: path.to_path_buf(),
            len: total as u64,
            source,
        };
        file.seek(SeekFrom::Start(total as u64 - 1))
            .map_err(extend_err)?;
        file.write_all(&[0]).map_err(extend_err)?;

        check_size(&file, path, total)?;

        let mut mapping = FrameMapping::map(&file, path, payload_len)?;
        drop(file);

        *mapping.header_mut() = header::encode(element_type);

        fill(mapping.payload_mut()).map_err(|e| FrameIoError::Fill {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        mapping.unmap().map_err(|source| FrameIoError::Unmap {
            path: path.to_path_buf(),
            source,
        })?;

        guard.disarm();
        Ok(())
    }

    fn publish(&self, handle: &Handle, lifecycle: &mut FrameLifecycle, payload_len: usize) {
        lifecycle.advance(FrameState::Written);
        lifecycle.advance(FrameState::Published);
        tracing::debug!(handle = %handle, bytes = payload_len, "Published frame");
    }
}

fn check_size(file: &std::fs::File, path: &std::path::Path, total: usize) -> ExchangeResult<()> {
    let actual = file
        .metadata()
        .map_err(|source| FrameIoError::Stat {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if actual != total as u64 {
        return Err(FrameIoError::SizeMismatch {
            path: path.to_path_buf(),
            actual,
            expected: total as u64,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::ExchangeConfig;
    use crate::error::ExchangeError;

    fn exchange_in(dir: &Path) -> FrameExchange {
        FrameExchange::new(ExchangeConfig::with_base_dir(dir).unwrap())
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_buffered_layout() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());

        let handle = exchange.write(&[1, 0, 0, 1, 0], ElementType::Boolean).unwrap();
        let bytes = std::fs::read(handle.as_path()).unwrap();

        assert_eq!(bytes.len(), 9 + 5);
        assert_eq!(&bytes[..8], b"SHMARRY\0");
        assert_eq!(bytes[8], b'z');
        assert_eq!(&bytes[9..], &[1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_write_through_matches_buffered() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());
        let payload: Vec<u8> = (0..64u8).collect();

        let buffered = exchange.write(&payload, ElementType::Int64).unwrap();
        let mapped = exchange
            .write_with(payload.len(), ElementType::Int64, |buf| {
                buf.copy_from_slice(&payload)
            })
            .unwrap();

        assert_ne!(buffered, mapped);
        assert_eq!(
            std::fs::read(buffered.as_path()).unwrap(),
            std::fs::read(mapped.as_path()).unwrap()
        );
    }

    #[test]
    fn test_write_through_hands_out_payload_region() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());

        let mut seen = None;
        exchange
            .write_with(12, ElementType::Float32, |buf| seen = Some(buf.len()))
            .unwrap();
        assert_eq!(seen, Some(12));
    }

    #[test]
    fn test_zero_length_frames() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());

        let a = exchange.write(&[], ElementType::Short).unwrap();
        let b = exchange.write_with(0, ElementType::Short, |_| {}).unwrap();
        assert_eq!(std::fs::metadata(a.as_path()).unwrap().len(), 9);
        assert_eq!(std::fs::metadata(b.as_path()).unwrap().len(), 9);
    }

    #[test]
    fn test_failed_fill_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());

        let err = exchange
            .try_write_with(8, ElementType::Byte, |_| Err("source array vanished"))
            .unwrap_err();

        assert!(matches!(err, ExchangeError::Io(FrameIoError::Fill { .. })));
        assert!(err.to_string().contains("source array vanished"));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_panicking_fill_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            exchange.write_with(8, ElementType::Byte, |_| panic!("fill exploded"))
        }));

        assert!(result.is_err());
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_invalid_arguments_create_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());

        let err = exchange.write(&[1, 2, 3], ElementType::Unknown).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidArgument { .. }));

        let err = exchange.write(&[1, 2, 3], ElementType::Int32).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidArgument { .. }));

        let err = exchange
            .write_with(usize::MAX, ElementType::Byte, |_| {})
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidArgument { .. }));

        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_out_of_space_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());

        let mut called = false;
        let err = exchange
            .write_with(1 << 60, ElementType::Byte, |_| called = true)
            .unwrap_err();

        assert!(matches!(err, ExchangeError::OutOfSpace { .. }));
        assert!(!called);
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_write_slice_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let exchange = exchange_in(dir.path());

        let desc = exchange.write_slice(&[1i32, 3, 5, 7, 9]).unwrap();
        assert_eq!(desc.len, 5);
        assert_eq!(desc.element_type, ElementType::Int32);
        assert_eq!(desc.byte_len(), Some(20));

        let bytes = std::fs::read(desc.handle.as_path()).unwrap();
        assert_eq!(bytes[8], b'i');
        assert_eq!(&bytes[9..13], &1i32.to_ne_bytes());
        assert_eq!(&bytes[25..29], &9i32.to_ne_bytes());
    }
}
