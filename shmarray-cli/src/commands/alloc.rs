// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmarray alloc` command - Print a fresh handle.

use shmarray_core::FrameExchange;

pub async fn execute(exchange: &FrameExchange) -> Result<(), Box<dyn std::error::Error>> {
    let handle = exchange.allocate()?;
    println!("{}", handle);
    Ok(())
}
