// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmarray read` command - Consume a frame into a file or stdout.

use std::io::Write;
use std::time::Duration;

use shmarray_core::{ElementType, FrameExchange, Handle};

use super::run_blocking;

pub async fn execute(
    exchange: FrameExchange,
    timeout: Option<Duration>,
    handle: &str,
    element_type: ElementType,
    len: usize,
    output: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = Handle::new(handle)?;
    let element_size = element_type
        .size()
        .ok_or("Element type must be a concrete primitive type")?;
    let byte_len = len
        .checked_mul(element_size)
        .ok_or("Element count overflows the payload size")?;

    tracing::info!(handle = %handle, element_type = %element_type, elements = len, "Reading frame");

    // The frame is gone once read_copy returns, so a late payload is still
    // written out rather than dropped
    let data = run_blocking(
        timeout,
        move || exchange.read_copy(&handle, byte_len, element_type),
        |late: Vec<u8>| {
            tracing::warn!(bytes = late.len(), "Frame consumed after timeout, writing payload anyway");
            if let Err(e) = emit(output, &late) {
                tracing::error!(error = %e, "Failed to write payload of consumed frame");
            }
        },
    )
    .await?;

    emit(output, &data)?;

    tracing::info!(bytes = data.len(), "Frame consumed");
    Ok(())
}

fn emit(output: Option<&str>, data: &[u8]) -> std::io::Result<()> {
    match output {
        Some(path) => std::fs::write(path, data),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shmarray_core::ExchangeConfig;

    #[tokio::test]
    async fn test_missing_frame_is_an_error() {
        let frames = tempfile::tempdir().unwrap();
        let exchange = FrameExchange::new(ExchangeConfig::with_base_dir(frames.path()).unwrap());
        let handle = frames.path().join("never-written");

        let err = execute(
            exchange,
            None,
            handle.to_str().unwrap(),
            ElementType::Byte,
            4,
            None,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("never-written"));
    }
}
