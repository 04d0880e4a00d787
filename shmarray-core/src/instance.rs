// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process-wide instance guard.
//!
//! Runtimes embedded next to the exchange (one per process) hold an
//! [`InstanceGuard`] for their lifetime. A second acquire fails fast until
//! the first guard is dropped.

use std::sync::Mutex;

use crate::error::InstanceError;

static ACTIVE: Mutex<Option<String>> = Mutex::new(None);

/// Proof that this process' single instance slot is taken.
#[derive(Debug)]
pub struct InstanceGuard {
    owner: String,
}

impl InstanceGuard {
    /// Take the slot for `owner`.
    pub fn acquire(owner: impl Into<String>) -> Result<Self, InstanceError> {
        let owner = owner.into();
        let mut active = ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(current) = active.as_ref() {
            return Err(InstanceError::AlreadyInitialized {
                owner: current.clone(),
            });
        }

        *active = Some(owner.clone());
        tracing::debug!(owner = %owner, "Acquired process instance guard");
        Ok(Self { owner })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether any guard is currently held in this process.
    pub fn is_held() -> bool {
        ACTIVE
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let mut active = ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *active = None;
        tracing::debug!(owner = %self.owner, "Released process instance guard");
    }
}
