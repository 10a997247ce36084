//! Property-based tests for the codec's universal guarantees: round trip,
//! CRC rejection, capacity clamp, null pointers, and plan-cache/signature
//! stability under concurrent use.

use std::sync::Arc;
use std::thread;

use flatcodec::{codable_struct, marshal, unmarshal, Config, Options, Ptr, Slice, Text};
use proptest::prelude::*;

#[repr(C)]
struct IntList {
    values: Slice<i64>,
}
codable_struct!(IntList { values: Slice<i64> });

#[repr(C)]
struct TextField {
    value: Text,
}
codable_struct!(TextField { value: Text });

#[repr(C)]
struct MaybePoint {
    point: Ptr<[i64; 2]>,
}
codable_struct!(MaybePoint { point: Ptr<[i64; 2]> });

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// For any `Vec<i64>`, marshalling a [`Slice<i64>`] view of it and
    /// unmarshalling reproduces the same elements in the same order.
    #[test]
    fn prop_slice_of_i64_round_trips(values in proptest::collection::vec(any::<i64>(), 0..64)) {
        let s = unsafe { Slice::from_raw_parts(values.as_ptr(), values.len()) };
        let bytes = marshal(&s).unwrap();
        let decoded = unmarshal::<Slice<i64>>(&bytes).unwrap();
        prop_assert_eq!(decoded.as_slice(), values.as_slice());
    }

    /// Every decoded slice has `capacity == length`, regardless of the
    /// capacity the encoder's source slice happened to carry.
    #[test]
    fn prop_decoded_slice_capacity_equals_length(values in proptest::collection::vec(any::<i64>(), 0..64)) {
        let s = unsafe { Slice::from_raw_parts(values.as_ptr(), values.len()) };
        let bytes = marshal(&s).unwrap();
        let decoded = unmarshal::<Slice<i64>>(&bytes).unwrap();
        prop_assert_eq!(decoded.len(), decoded.capacity());
    }

    /// For any `String`, round-tripping through a one-field struct wrapping
    /// [`Text`] reproduces the same string.
    #[test]
    fn prop_text_round_trips(s in ".*") {
        let field = TextField { value: unsafe { Text::from_raw_parts(s.as_ptr(), s.len()) } };
        let bytes = marshal(&field).unwrap();
        let decoded = unmarshal::<TextField>(&bytes).unwrap();
        prop_assert_eq!(decoded.value.as_str(), s.as_str());
    }

    /// A null pointer field round-trips to a null pointer, for every
    /// pointee content that would otherwise be carried.
    #[test]
    fn prop_null_pointer_round_trips(present in any::<bool>(), a in any::<i64>(), b in any::<i64>()) {
        let pair = [a, b];
        let point = MaybePoint {
            point: if present {
                unsafe { Ptr::from_raw(&pair as *const [i64; 2]) }
            } else {
                Ptr::null()
            },
        };
        let bytes = marshal(&point).unwrap();
        let decoded = unmarshal::<MaybePoint>(&bytes).unwrap();
        if present {
            prop_assert_eq!(decoded.point.get().copied(), Some([a, b]));
        } else {
            prop_assert!(decoded.point.is_null());
        }
    }

    /// Flipping any single byte of a frame's payload makes decode fail with
    /// `CrcMismatch`, per the CRC rejection property.
    #[test]
    fn prop_crc_rejects_single_byte_corruption(
        values in proptest::collection::vec(any::<i64>(), 1..32),
        flip_seed in any::<u32>(),
    ) {
        let s = unsafe { Slice::from_raw_parts(values.as_ptr(), values.len()) };
        let mut bytes = marshal(&s).unwrap();
        let payload_start = 8;
        let payload_end = bytes.len() - 4;
        prop_assume!(payload_end > payload_start);
        let idx = payload_start + (flip_seed as usize % (payload_end - payload_start));
        bytes[idx] ^= 0xFF;

        let cfg = flatcodec::DEFAULT_CONFIG();
        let mut dec = cfg.decoder(&bytes);
        let result = dec.decode_val::<Slice<i64>>();
        prop_assert_eq!(result.unwrap_err(), flatcodec::CodecError::CrcMismatch);
    }
}

/// The signature computed for a type does not depend on which plan table
/// (encode or decode) is populated first, or on how many other types the
/// cache has already seen.
#[test]
fn signature_is_independent_of_cache_insertion_order() {
    let cfg_a = Config::new(Options::default());
    let cfg_b = Config::new(Options::default());

    let sig_a = {
        let mut enc = cfg_a.encoder(None);
        enc.encode_val(&IntList { values: Slice::empty() }).unwrap();
        let bytes = enc.buffer();
        u32::from_le_bytes(bytes[4..8].try_into().unwrap())
    };

    // cfg_b warms its encode-plan cache with unrelated types first, so
    // `IntList`'s plan is built only after the cache already holds entries.
    cfg_b.encoder(None).encode_val(&TextField { value: Text::empty() }).unwrap();
    cfg_b.encoder(None).encode_val(&MaybePoint { point: Ptr::null() }).unwrap();
    let sig_b = {
        let mut enc = cfg_b.encoder(None);
        enc.encode_val(&IntList { values: Slice::empty() }).unwrap();
        let bytes = enc.buffer();
        u32::from_le_bytes(bytes[4..8].try_into().unwrap())
    };

    assert_eq!(sig_a, sig_b);
}

/// Concurrent callers racing to populate the plan cache for the same type
/// all observe the same cached plan, and no caller ever sees a torn or
/// partial cache.
#[test]
fn cache_is_idempotent_under_concurrent_callers() {
    let cfg = Arc::new(Config::new(Options::default()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cfg = Arc::clone(&cfg);
            thread::spawn(move || {
                let list = IntList { values: Slice::empty() };
                cfg.marshal(&list).unwrap()
            })
        })
        .collect();

    let results: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for pair in results.windows(2) {
        assert_eq!(pair[0], pair[1]);
    }
}
