// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmarray inspect` command - Describe a frame without consuming it.

use std::time::Duration;

use shmarray_core::{FrameExchange, Handle};

use super::run_blocking;

pub async fn execute(
    exchange: FrameExchange,
    timeout: Option<Duration>,
    handle: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = Handle::new(handle)?;
    let summary = run_blocking(timeout, move || exchange.inspect(&handle), drop).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let magic = if summary.magic_ok {
        "✓ SHMARRY"
    } else {
        "✗ unrecognized"
    };
    println!("Frame: {}", summary.handle);
    println!("  Magic:         {}", magic);
    println!("  Element Type:  {}", summary.element_type);
    println!("  File Size:     {} bytes", summary.file_len);
    println!("  Payload Size:  {} bytes", summary.payload_len);
    match summary.element_count {
        Some(count) => println!("  Elements:      {}", count),
        None => println!("  Elements:      -"),
    }
    println!("  Payload CRC32: {:#010x}", summary.crc32);
    Ok(())
}
