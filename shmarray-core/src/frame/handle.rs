// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Handle allocation.
//!
//! Names are `<base_dir>/<unix micros>.<thread id>.<random salt>`. The salt
//! separates two allocations made by one thread inside the same microsecond.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ClockError;
use crate::types::Handle;

/// Generates collision-resistant handles inside a base directory.
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    base_dir: PathBuf,
}

impl HandleAllocator {
    /// `base_dir` must be absolute; [`crate::ExchangeConfig`] guarantees it.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Allocate a fresh handle. Fails only if the clock predates the epoch.
    pub fn allocate(&self) -> Result<Handle, ClockError> {
        let micros = SystemTime::now().duration_since(UNIX_EPOCH)?.as_micros();
        let tid = nix::unistd::gettid();
        let salt: u32 = rand::random();

        let name = format!("{}.{}.{}", micros, tid, salt);
        Ok(Handle::from_trusted(self.base_dir.join(name)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_handle_shape() {
        let allocator = HandleAllocator::new("/dev/shm");
        let handle = allocator.allocate().unwrap();

        assert!(handle.as_path().starts_with("/dev/shm"));
        let name = handle.as_path().file_name().unwrap().to_str().unwrap();
        let parts: Vec<&str> = name.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.parse::<u128>().is_ok()));
    }

    #[test]
    fn test_rapid_allocations_are_distinct() {
        let allocator = HandleAllocator::new("/dev/shm");
        let handles: HashSet<Handle> = (0..10_000).map(|_| allocator.allocate().unwrap()).collect();
        assert_eq!(handles.len(), 10_000);
    }

    #[test]
    fn test_threads_get_distinct_handles() {
        let allocator = HandleAllocator::new("/dev/shm");
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let allocator = allocator.clone();
                std::thread::spawn(move || {
                    (0..1_000)
                        .map(|_| allocator.allocate().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for worker in workers {
            for handle in worker.join().unwrap() {
                assert!(all.insert(handle));
            }
        }
        assert_eq!(all.len(), 4_000);
    }
}
