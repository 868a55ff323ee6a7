//! Fuzz target for payload layout decoding.
//!
//! Any data-type/byte-region combination must decode without panicking
//! and re-encode with its pad bits zeroed.

#![no_main]

use libfuzzer_sys::fuzz_target;
use umbilical_proto::{DataTypeId, Payload};

fuzz_target!(|input: (u8, [u8; 4])| {
    let (selector, region) = input;
    let Some(data_type) = DataTypeId::from_u8(selector) else {
        return;
    };

    let payload = Payload::decode(data_type, region);
    assert_eq!(payload.data_type(), data_type);

    // Re-encoding keeps the value bits and zeroes the padding. NaN
    // floats defeat structural equality, so compare at the bit level.
    let encoded = payload.encode();
    assert_eq!(Payload::decode(data_type, encoded).encode(), encoded);
});
