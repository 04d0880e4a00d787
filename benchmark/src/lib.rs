// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared fixtures for the frame exchange benchmarks.
//!
//! Frames are written under a private temporary directory so runs never
//! touch `/dev/shm` or leave files behind when a benchmark is interrupted.

use shmarray_core::{ExchangeConfig, FrameExchange};
use tempfile::TempDir;

/// Payload sizes to benchmark (in bytes).
pub const PAYLOAD_SIZES: &[usize] = &[64, 4096, 65536, 1024 * 1024, 16 * 1024 * 1024];

/// A frame exchange rooted in a temporary directory.
///
/// The directory is removed when the fixture is dropped.
pub struct ScratchExchange {
    exchange: FrameExchange,
    _dir: TempDir,
}

impl ScratchExchange {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let config = ExchangeConfig::with_base_dir(dir.path())?;

        Ok(Self {
            exchange: FrameExchange::new(config),
            _dir: dir,
        })
    }

    pub fn exchange(&self) -> &FrameExchange {
        &self.exchange
    }
}

/// Deterministic payload of `size` bytes.
pub fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shmarray_core::ElementType;

    #[test]
    fn test_scratch_round_trip() {
        let scratch = ScratchExchange::new().unwrap();
        let data = payload(4096);

        let handle = scratch.exchange().write(&data, ElementType::Byte).unwrap();
        let back = scratch
            .exchange()
            .read_copy(&handle, data.len(), ElementType::Byte)
            .unwrap();

        assert_eq!(back, data);
        assert!(!handle.as_path().exists());
    }
}
