// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

use std::time::Duration;

use shmarray_core::ExchangeResult;

pub mod alloc;
pub mod inspect;
pub mod read;
pub mod validate;
pub mod write;

/// Run a blocking frame operation off the async runtime, optionally bounded.
///
/// Frame operations cannot be cancelled. On timeout the command still waits
/// for the operation to settle and hands a successful result to `undo`, so a
/// frame produced or consumed after the deadline is never silently lost.
pub async fn run_blocking<T, F, U>(
    timeout: Option<Duration>,
    op: F,
    undo: U,
) -> Result<T, Box<dyn std::error::Error>>
where
    F: FnOnce() -> ExchangeResult<T> + Send + 'static,
    T: Send + 'static,
    U: FnOnce(T),
{
    let mut task = tokio::task::spawn_blocking(op);

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "Frame operation timed out, waiting for it to settle"
                );
                match task.await {
                    Ok(Ok(value)) => undo(value),
                    Ok(Err(e)) => tracing::debug!(error = %e, "Timed-out operation failed"),
                    Err(e) => tracing::error!(error = %e, "Timed-out operation panicked"),
                }
                return Err(format!(
                    "Frame operation timed out after {}ms",
                    limit.as_millis()
                )
                .into());
            }
        },
        None => task.await,
    };

    Ok(joined??)
}
