// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! On-disk frame header.
//!
//! ```text
//! offset 0  [u8; 8]  magic "SHMARRY\0"
//! offset 8  u8       element type tag
//! offset 9  [u8; N]  payload, native endian
//! ```

use std::path::Path;

use crate::error::{ExchangeError, FrameIoError};
use crate::types::ElementType;

/// Magic bytes identifying a frame file.
pub const MAGIC: [u8; 8] = *b"SHMARRY\0";

/// Offset of the element type tag.
const TAG_OFFSET: usize = MAGIC.len();

/// Magic plus type tag.
pub const HEADER_LEN: usize = MAGIC.len() + 1;

/// Encode the header for a frame of the given type.
pub fn encode(element_type: ElementType) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..TAG_OFFSET].copy_from_slice(&MAGIC);
    header[TAG_OFFSET] = element_type.tag();
    header
}

/// Total file length for a payload of `payload_len` bytes.
pub fn frame_len(payload_len: usize) -> Result<usize, ExchangeError> {
    payload_len.checked_add(HEADER_LEN).ok_or_else(|| {
        ExchangeError::invalid(format!(
            "Payload of {} bytes overflows the frame length",
            payload_len
        ))
    })
}

/// Check magic first, then the type tag.
pub fn validate(
    path: &Path,
    header: &[u8; HEADER_LEN],
    expected: ElementType,
) -> Result<(), FrameIoError> {
    let mut found = [0u8; 8];
    found.copy_from_slice(&header[..TAG_OFFSET]);
    if found != MAGIC {
        return Err(FrameIoError::MagicMismatch {
            path: path.to_path_buf(),
            found,
            expected: MAGIC,
        });
    }

    let found = ElementType::from_tag(header[TAG_OFFSET]);
    if found != expected {
        return Err(FrameIoError::TypeMismatch {
            path: path.to_path_buf(),
            found,
            expected,
        });
    }

    Ok(())
}

/// Element type recorded in a header, `None` when the magic is wrong.
pub fn element_type(header: &[u8; HEADER_LEN]) -> Option<ElementType> {
    (header[..TAG_OFFSET] == MAGIC).then(|| ElementType::from_tag(header[TAG_OFFSET]))
}
