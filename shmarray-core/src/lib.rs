// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! shmarray Core Library
//!
//! Exchange of large primitive arrays between two processes through
//! shared-memory-backed frame files. A producer writes a frame and hands
//! the handle to a consumer over its own control channel; the consumer
//! validates, maps and releases the frame.

pub mod config;
pub mod error;
pub mod frame;
pub mod instance;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigLoader, ExchangeConfig};
pub use error::{ConfigError, ExchangeError, ExchangeResult, FrameIoError};
pub use frame::{FrameExchange, FrameSummary, MappedFrame};
pub use instance::InstanceGuard;
pub use state::{FrameLifecycle, FrameState};
pub use types::{Element, ElementType, FrameDescriptor, Handle};
