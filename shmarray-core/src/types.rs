// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers and tags shared by writers and readers.
//!
//! Everything that crosses the out-of-band control channel lives here:
//! the element type tag, the handle naming a frame's backing file, and the
//! descriptor bundling both with the element count.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

/// Primitive element type of a frame's payload.
///
/// Each variant is stored on disk as a single ASCII character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub enum ElementType {
    Boolean,
    Byte,
    Short,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Sentinel for any tag this library does not recognize.
    Unknown,
}

impl ElementType {
    /// All concrete element types.
    pub const ALL: [ElementType; 7] = [
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
    ];

    /// Map an on-disk tag to its type. Unrecognized tags yield `Unknown`.
    pub const fn from_tag(tag: u8) -> Self {
        match tag {
            b'z' => Self::Boolean,
            b'b' => Self::Byte,
            b's' => Self::Short,
            b'i' => Self::Int32,
            b'j' => Self::Int64,
            b'f' => Self::Float32,
            b'd' => Self::Float64,
            _ => Self::Unknown,
        }
    }

    /// The on-disk tag byte.
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Boolean => b'z',
            Self::Byte => b'b',
            Self::Short => b's',
            Self::Int32 => b'i',
            Self::Int64 => b'j',
            Self::Float32 => b'f',
            Self::Float64 => b'd',
            Self::Unknown => b'\0',
        }
    }

    /// Size of one element in bytes, `None` for `Unknown`.
    pub const fn size(&self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Byte => Some(1),
            Self::Short => Some(2),
            Self::Int32 | Self::Float32 => Some(4),
            Self::Int64 | Self::Float64 => Some(8),
            Self::Unknown => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Unknown => "unknown",
        }
    }

    /// Check that `byte_len` is a whole number of elements of this type.
    pub(crate) fn check_byte_len(&self, byte_len: usize) -> Result<(), ExchangeError> {
        let Some(size) = self.size() else {
            return Err(ExchangeError::invalid(
                "Element type is unknown; frames must carry a concrete type",
            ));
        };
        if byte_len % size != 0 {
            return Err(ExchangeError::invalid(format!(
                "Byte length {} is not a multiple of the {} element size {}",
                byte_len,
                self.name(),
                size
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ('{}')", self.name(), self.tag().escape_ascii())
    }
}

impl FromStr for ElementType {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.to_ascii_lowercase().as_str() {
            "z" | "bool" | "boolean" => Self::Boolean,
            "b" | "byte" | "i8" => Self::Byte,
            "s" | "short" | "i16" => Self::Short,
            "i" | "int" | "int32" | "i32" => Self::Int32,
            "j" | "long" | "int64" | "i64" => Self::Int64,
            "f" | "float" | "float32" | "f32" => Self::Float32,
            "d" | "double" | "float64" | "f64" => Self::Float64,
            other => {
                return Err(ExchangeError::invalid(format!(
                    "Unrecognized element type: {}",
                    other
                )))
            }
        };
        Ok(parsed)
    }
}

impl TryFrom<char> for ElementType {
    type Error = ExchangeError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        let ty = u8::try_from(value)
            .map(Self::from_tag)
            .unwrap_or(Self::Unknown);
        if ty == Self::Unknown {
            return Err(ExchangeError::invalid(format!(
                "Unrecognized element type tag: {:?}",
                value
            )));
        }
        Ok(ty)
    }
}

impl From<ElementType> for char {
    fn from(ty: ElementType) -> Self {
        ty.tag() as char
    }
}

/// Absolute path naming a frame's backing file.
///
/// Created by the allocator, passed by value to the consumer, and consumed
/// by release. Must be absolute, non-empty, valid UTF-8 and free of NUL
/// bytes, so it crosses a text control channel unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(PathBuf);

impl Handle {
    /// Create a new Handle with validation.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ExchangeError> {
        let path = path.into();

        if path.as_os_str().is_empty() {
            return Err(ExchangeError::invalid("Empty handle received"));
        }

        if !path.is_absolute() {
            return Err(ExchangeError::invalid(format!(
                "Handle must be an absolute path: {}",
                path.display()
            )));
        }

        if path.to_str().is_none() {
            return Err(ExchangeError::invalid(format!(
                "Handle is not valid UTF-8: {}",
                path.display()
            )));
        }

        if path.as_os_str().as_encoded_bytes().contains(&0) {
            return Err(ExchangeError::invalid(format!(
                "Handle contains a NUL byte: {}",
                path.display()
            )));
        }

        Ok(Self(path))
    }

    /// Wrap a path already known to be absolute, UTF-8 and NUL-free.
    pub(crate) fn from_trusted(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for Handle {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl TryFrom<String> for Handle {
    type Error = ExchangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        // Lossless: handles are UTF-8
        handle.0.to_string_lossy().into_owned()
    }
}

/// Everything a consumer needs to open a published frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    pub handle: Handle,
    /// Number of elements, not bytes.
    pub len: usize,
    pub element_type: ElementType,
}

impl FrameDescriptor {
    /// Payload size in bytes.
    ///
    /// `None` for an unknown element type or when the count overflows,
    /// as it may for a descriptor received from an untrusted peer.
    pub fn byte_len(&self) -> Option<usize> {
        self.element_type
            .size()
            .and_then(|size| self.len.checked_mul(size))
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Primitive element types that can be written to and read from frames.
///
/// Sealed: every implementor is plain old data whose in-memory bytes are the
/// native-endian payload format.
pub trait Element: sealed::Sealed + Copy + Default + 'static {
    const TYPE: ElementType;
}

macro_rules! impl_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}
            impl Element for $t {
                const TYPE: ElementType = ElementType::$variant;
            }
        )*
    };
}

impl_element! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
}
