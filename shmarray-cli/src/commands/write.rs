// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmarray write` command - Publish a file's contents as a frame.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use shmarray_core::{ElementType, FrameDescriptor, FrameExchange, Handle};

use super::run_blocking;

pub async fn execute(
    exchange: FrameExchange,
    timeout: Option<Duration>,
    element_type: ElementType,
    input: &str,
    mapped: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let desc = publish_file(exchange, timeout, element_type, input, mapped).await?;
    println!("{}", serde_json::to_string(&desc)?);
    Ok(())
}

/// Write `input` as a frame and describe it.
pub async fn publish_file(
    exchange: FrameExchange,
    timeout: Option<Duration>,
    element_type: ElementType,
    input: &str,
    mapped: bool,
) -> Result<FrameDescriptor, Box<dyn std::error::Error>> {
    tracing::info!(input = %input, element_type = %element_type, mapped, "Writing frame");

    let element_size = element_type
        .size()
        .ok_or("Element type must be a concrete primitive type")?;

    let (handle, byte_len) = if mapped {
        let mut file = std::fs::File::open(input)?;
        let byte_len = usize::try_from(file.metadata()?.len())?;

        // Stream the input straight into the mapped payload
        let handle = run_blocking(
            timeout,
            move || exchange.try_write_with(byte_len, element_type, move |buf| file.read_exact(buf)),
            discard_frame,
        )
        .await?;
        (handle, byte_len)
    } else {
        let payload = std::fs::read(input)?;
        let byte_len = payload.len();
        let handle = run_blocking(
            timeout,
            move || exchange.write(&payload, element_type),
            discard_frame,
        )
        .await?;
        (handle, byte_len)
    };

    let desc = FrameDescriptor {
        handle,
        len: byte_len / element_size,
        element_type,
    };

    tracing::info!(handle = %desc.handle, elements = desc.len, "Frame published");
    Ok(desc)
}

/// Remove a frame whose handle will never be printed.
pub(crate) fn discard_frame(handle: Handle) {
    match std::fs::remove_file(handle.as_path()) {
        Ok(()) => tracing::warn!(handle = %handle, "Removed frame written after timeout"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::error!(
            handle = %handle,
            error = %e,
            "Failed to remove frame written after timeout"
        ),
    }
}
