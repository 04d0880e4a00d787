// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end tests for the frame exchange.
//!
//! Every test runs against its own temporary base directory and checks that
//! nothing is left behind once a frame is consumed or rejected.

use std::path::Path;
use std::sync::mpsc;

use shmarray_core::{
    ConfigLoader, ElementType, ExchangeConfig, ExchangeError, FrameDescriptor, FrameExchange,
    FrameIoError, FrameState, Handle,
};
use tempfile::TempDir;

fn setup() -> (TempDir, FrameExchange) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = ExchangeConfig::with_base_dir(temp_dir.path()).expect("Invalid base dir");
    (temp_dir, FrameExchange::new(config))
}

fn leftover_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("Failed to list base dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Round trip through both writers for every type and a spread of sizes
#[test]
fn test_round_trip_all_types_and_sizes() {
    let (temp_dir, exchange) = setup();

    for ty in ElementType::ALL {
        let size = ty.size().unwrap();
        for count in [0usize, 1, 5, 1000, 70_000] {
            let data = if ty == ElementType::Boolean {
                (0..count).map(|i| (i % 3 == 0) as u8).collect()
            } else {
                pattern(count * size)
            };

            let handle = exchange.write(&data, ty).unwrap();
            assert_eq!(exchange.read_copy(&handle, data.len(), ty).unwrap(), data);
            assert!(!handle.as_path().exists());

            let handle = exchange
                .write_with(data.len(), ty, |buf| buf.copy_from_slice(&data))
                .unwrap();
            assert_eq!(exchange.read_copy(&handle, data.len(), ty).unwrap(), data);
            assert!(!handle.as_path().exists());
        }
    }

    assert!(leftover_files(temp_dir.path()).is_empty());
}

/// Expecting any other type than the one written always fails
#[test]
fn test_type_discrimination() {
    let (temp_dir, exchange) = setup();

    for written in ElementType::ALL {
        for expected in ElementType::ALL {
            if written == expected {
                continue;
            }
            let payload = vec![0u8; 8];
            let handle = exchange.write(&payload, written).unwrap();

            let err = exchange
                .open_and_map(&handle, payload.len(), expected)
                .unwrap_err();
            assert!(
                matches!(err, ExchangeError::Io(FrameIoError::TypeMismatch { .. })),
                "{} read as {}: {}",
                written,
                expected,
                err
            );
            assert!(!handle.as_path().exists());
        }
    }

    assert!(leftover_files(temp_dir.path()).is_empty());
}

/// Any expected size other than the written one fails deterministically
#[test]
fn test_size_discrimination() {
    let (temp_dir, exchange) = setup();

    for wrong in [0usize, 8, 15, 17, 4096] {
        let handle = exchange.write(&pattern(16), ElementType::Byte).unwrap();
        let err = exchange
            .open_and_map(&handle, wrong, ElementType::Byte)
            .unwrap_err();
        assert!(err.is_io(), "size {}: {}", wrong, err);
        assert!(!handle.as_path().exists());
    }

    assert!(leftover_files(temp_dir.path()).is_empty());
}

/// Boolean scenario: 5 flags mapped, inspected in place, then released
#[test]
fn test_boolean_array_scenario() {
    let (_temp_dir, exchange) = setup();

    let desc = exchange
        .write_slice(&[true, false, false, true, false])
        .unwrap();
    let frame = exchange
        .open_and_map(&desc.handle, 5, ElementType::Boolean)
        .unwrap();

    // SAFETY: the frame keeps 5 payload bytes mapped.
    let first_five = unsafe { std::slice::from_raw_parts(frame.as_ptr(), 5) };
    assert_eq!(first_five, &[1, 0, 0, 1, 0]);

    exchange.release(frame).unwrap();
    assert!(!desc.handle.as_path().exists());
}

/// Int scenario: 20 bytes copied out, file gone immediately after
#[test]
fn test_int_array_scenario() {
    let (_temp_dir, exchange) = setup();

    let desc = exchange.write_slice(&[1i32, 3, 5, 7, 9]).unwrap();
    let expected: Vec<u8> = [1i32, 3, 5, 7, 9]
        .iter()
        .flat_map(|v| v.to_ne_bytes())
        .collect();

    let data = exchange
        .read_copy(&desc.handle, desc.byte_len().unwrap(), desc.element_type)
        .unwrap();
    assert_eq!(data.len(), 20);
    assert_eq!(data, expected);
    assert!(!desc.handle.as_path().exists());
}

/// Asking for more than the filesystem can hold creates nothing
#[test]
fn test_out_of_space() {
    let (temp_dir, exchange) = setup();

    let err = exchange
        .write_with(1 << 60, ElementType::Int64, |_| unreachable!())
        .unwrap_err();
    assert!(matches!(err, ExchangeError::OutOfSpace { .. }));
    assert!(leftover_files(temp_dir.path()).is_empty());
}

/// 10,000 rapid allocations on one thread never collide
#[test]
fn test_handle_uniqueness() {
    let (temp_dir, exchange) = setup();

    let handles: std::collections::HashSet<Handle> =
        (0..10_000).map(|_| exchange.allocate().unwrap()).collect();
    assert_eq!(handles.len(), 10_000);
    assert!(handles
        .iter()
        .all(|h| h.as_path().parent() == Some(temp_dir.path())));
}

/// Producer and consumer on different threads hand off through a channel
#[test]
fn test_handoff_between_threads() {
    let (temp_dir, exchange) = setup();
    let (tx, rx) = mpsc::channel::<FrameDescriptor>();

    let producer = {
        let exchange = exchange.clone();
        std::thread::spawn(move || {
            for round in 0..50i64 {
                let data: Vec<i64> = (0..round * 10).map(|v| v * round).collect();
                tx.send(exchange.write_slice(&data).unwrap()).unwrap();
            }
        })
    };

    let consumer = std::thread::spawn(move || {
        let mut rounds = 0i64;
        for desc in rx {
            let data: Vec<i64> = exchange.read_vec(&desc).unwrap();
            let expected: Vec<i64> = (0..rounds * 10).map(|v| v * rounds).collect();
            assert_eq!(data, expected);
            rounds += 1;
        }
        rounds
    });

    producer.join().unwrap();
    assert_eq!(consumer.join().unwrap(), 50);
    assert!(leftover_files(temp_dir.path()).is_empty());
}

/// The descriptor survives a trip through JSON on the control channel
#[test]
fn test_descriptor_over_json_control_channel() {
    let (_temp_dir, exchange) = setup();

    let desc = exchange.write_slice(&[0.5f32, 0.25, 0.125]).unwrap();
    let wire = serde_json::to_string(&desc).unwrap();

    let received: FrameDescriptor = serde_json::from_str(&wire).unwrap();
    let data: Vec<f32> = exchange.read_vec(&received).unwrap();
    assert_eq!(data, vec![0.5, 0.25, 0.125]);
}

/// A consumer that mutates the mapped payload and then releases
#[test]
fn test_mapped_frame_lifecycle() {
    let (temp_dir, exchange) = setup();

    let handle = exchange
        .write_with(4, ElementType::Float32, |buf| {
            buf.copy_from_slice(&2.5f32.to_ne_bytes())
        })
        .unwrap();

    let mut frame = exchange
        .open_and_map(&handle, 4, ElementType::Float32)
        .unwrap();
    assert_eq!(frame.state(), FrameState::Mapped);
    assert_eq!(frame.len(), 4);
    assert_eq!(frame.element_type(), ElementType::Float32);
    assert_eq!(frame.payload(), &2.5f32.to_ne_bytes());

    frame.payload_mut()[0] ^= 0xff;
    frame.release().unwrap();

    assert!(leftover_files(temp_dir.path()).is_empty());
}

/// Exchanges built from the same YAML agree on where frames live
#[test]
fn test_config_file_drives_both_ends() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("shmarray.yaml");
    let frames_dir = temp_dir.path().join("frames");
    std::fs::create_dir(&frames_dir).unwrap();

    std::fs::write(
        &config_path,
        format!("exchange:\n  base_dir: {}\n", frames_dir.display()),
    )
    .unwrap();

    let writer = FrameExchange::new(ConfigLoader::load_file(&config_path).unwrap());
    let reader = FrameExchange::new(ConfigLoader::load_file(&config_path).unwrap());

    let handle = writer.write(b"abcd", ElementType::Byte).unwrap();
    assert!(handle.as_path().starts_with(&frames_dir));
    assert_eq!(reader.read_copy(&handle, 4, ElementType::Byte).unwrap(), b"abcd");
    assert!(leftover_files(&frames_dir).is_empty());
}

/// The default exchange writes under /dev/shm
#[test]
fn test_default_exchange_uses_dev_shm() {
    if !Path::new("/dev/shm").is_dir() {
        return;
    }

    let exchange = FrameExchange::default();
    let handle = exchange.write(&[42], ElementType::Byte).unwrap();
    assert!(handle.as_path().starts_with("/dev/shm"));
    assert_eq!(exchange.read_copy(&handle, 1, ElementType::Byte).unwrap(), vec![42]);
    assert!(!handle.as_path().exists());
}
