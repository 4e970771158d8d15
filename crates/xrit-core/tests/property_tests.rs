//! # Property-Based Tests
//!
//! Invariants of the identifier text form, the codec's collection
//! categories and the chunked channel, checked with proptest.

#![allow(clippy::unwrap_used, clippy::panic)]

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::BTreeMap;
use xrit_core::{ChunkedChannel, Identifier, TransmitRequester, codec};

#[derive(Debug, Default)]
struct CountingRequester(Cell<usize>);

impl TransmitRequester for CountingRequester {
    fn request_transmit(&self) {
        self.0.set(self.0.get() + 1);
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Formatting then parsing an identifier is the identity.
    #[test]
    fn identifier_text_round_trip(value in any::<u128>()) {
        let id = Identifier::from_u128(value);
        let parsed: Identifier = id.to_string().parse().unwrap();

        prop_assert_eq!(parsed, id);
    }

    /// Parsing accepts any case and formats back to lowercase.
    #[test]
    fn identifier_parse_is_case_insensitive(value in any::<u128>()) {
        let text = Identifier::from_u128(value).to_string();
        let upper: Identifier = text.to_uppercase().parse().unwrap();

        prop_assert_eq!(upper.to_string(), text);
    }

    /// Strings of the wrong length never parse.
    #[test]
    fn identifier_rejects_wrong_length(text in "[0-9a-f-]{0,35}") {
        prop_assert!(text.parse::<Identifier>().is_err());
    }

    /// Sequences survive serialize then parse in order.
    #[test]
    fn sequence_round_trip(items in vec(any::<i64>(), 0..64)) {
        let (parsed, errors) = codec::from_str::<Vec<i64>>(&codec::to_string(&items));

        prop_assert!(errors.is_empty());
        prop_assert_eq!(parsed, items);
    }

    /// Mappings keep membership and values.
    #[test]
    fn mapping_round_trip(entries in btree_map("[a-z\"\\\\ ]{0,12}", any::<u64>(), 0..32)) {
        let (parsed, errors) = codec::from_str::<BTreeMap<String, u64>>(&codec::to_string(&entries));

        prop_assert!(errors.is_empty());
        prop_assert_eq!(parsed, entries);
    }

    /// Any payload sliced at any frame size reassembles byte-for-byte.
    #[test]
    fn chunked_channel_reassembles(
        payloads in vec(vec(any::<u8>(), 1..300), 1..8),
        max_bytes in 1usize..64
    ) {
        let mut sender = ChunkedChannel::new(CountingRequester::default(), max_bytes);
        let mut receiver = ChunkedChannel::new(CountingRequester::default(), max_bytes);
        sender.on_connected();

        for payload in &payloads {
            sender.send_message(payload.clone()).unwrap();
        }

        let mut delivered = Vec::new();
        while let Some(frame) = sender.poll_transmit() {
            prop_assert!(frame.payload.len() <= max_bytes);
            if let Some(whole) = receiver.receive_frame(&frame.payload, frame.flags).unwrap() {
                delivered.push(whole);
            }
        }

        prop_assert_eq!(delivered, payloads);
        prop_assert_eq!(sender.queued(), 0);
    }
}
