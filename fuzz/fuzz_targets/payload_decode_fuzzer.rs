//! Fuzz target for the inbound clock payload decoder
//!
//! Any peer (or anything else that can reach the port) controls these bytes.
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary payloads straight into `decode_clock`
//! - Near misses: valid decimals wrapped in arbitrary padding, signs and
//!   trailing garbage
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - Payloads longer than `MAX_PAYLOAD_LEN` MUST be rejected as `TooLong`
//! - Accepted values re-encode to the trimmed input with leading zeros
//!   stripped
//! - Every encoded `u64` MUST decode to itself, with or without a trailing
//!   newline

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use skewclock_core::wire::{decode_clock, encode_clock, WireError, MAX_PAYLOAD_LEN};

#[derive(Debug, Arbitrary)]
enum FuzzInput {
    Raw(Vec<u8>),
    Padded { value: u64, prefix: Vec<u8>, suffix: Vec<u8> },
}

fuzz_target!(|input: FuzzInput| {
    match input {
        FuzzInput::Raw(bytes) => check_raw(&bytes),
        FuzzInput::Padded { value, prefix, suffix } => {
            let encoded = encode_clock(value);
            assert_eq!(decode_clock(&encoded), Ok(value));

            let mut line = encoded.to_vec();
            line.push(b'\n');
            assert_eq!(decode_clock(&line), Ok(value));

            let mut padded = prefix;
            padded.extend_from_slice(&encoded);
            padded.extend_from_slice(&suffix);
            check_raw(&padded);
        },
    }
});

fn check_raw(bytes: &[u8]) {
    let result = decode_clock(bytes);

    if bytes.len() > MAX_PAYLOAD_LEN {
        assert_eq!(result, Err(WireError::TooLong { len: bytes.len() }));
        return;
    }

    if let Ok(value) = result {
        let text = std::str::from_utf8(bytes).unwrap().trim_ascii();
        let digits = text.trim_start_matches('0');
        let expected = if digits.is_empty() { "0" } else { digits };
        assert_eq!(encode_clock(value), bytes::Bytes::from(expected.to_string()));
    }
}
