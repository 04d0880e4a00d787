// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared-memory frame exchange.
//!
//! A producer writes `[magic][type tag][payload]` into a fresh file under a
//! shared-memory-backed directory and publishes the handle out of band. The
//! consumer opens, validates and maps the frame, then releases it, which
//! removes the file. One writer and one reader per frame, no locking.

mod handle;
pub mod header;
mod mapped;
mod opener;
mod reader;
mod writer;

pub use handle::HandleAllocator;
pub use header::{HEADER_LEN, MAGIC};
pub use mapped::MappedFrame;
pub use opener::open_for_write;
pub use reader::FrameSummary;

use crate::config::ExchangeConfig;
use crate::error::ExchangeResult;
use crate::types::Handle;

/// Entry point for both ends of an exchange.
///
/// Operations are synchronous and blocking; callers wanting bounded latency
/// wrap them in their own timeout.
#[derive(Debug, Clone)]
pub struct FrameExchange {
    config: ExchangeConfig,
    allocator: HandleAllocator,
}

impl FrameExchange {
    pub fn new(config: ExchangeConfig) -> Self {
        let allocator = HandleAllocator::new(config.base_dir.clone());
        Self { config, allocator }
    }

    /// Allocate a handle without creating anything.
    pub fn allocate(&self) -> ExchangeResult<Handle> {
        Ok(self.allocator.allocate()?)
    }
}

impl Default for FrameExchange {
    /// Exchange under `/dev/shm`.
    fn default() -> Self {
        Self::new(ExchangeConfig::default())
    }
}
