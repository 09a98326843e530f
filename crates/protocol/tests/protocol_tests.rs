//! Integration tests for the wire-level protocol types
//!
//! Covers:
//! - Dialect detection over every interface count
//! - Deduplication window semantics
//! - Operator line decoding against arbitrary frames

use protocol::{
    DEDUP_WINDOW, Deduplicator, EndpointOverride, EndpointPair, FRAME_LEN, Frame, LineCommand,
    ProtocolError, ProtocolVersion, decode_line, encode_line,
};
use proptest::prelude::*;

fn arb_frame() -> impl Strategy<Value = Frame> {
    proptest::collection::vec(any::<u8>(), FRAME_LEN).prop_map(|bytes| {
        let mut frame = Frame::zeroed();
        frame.as_mut_bytes().copy_from_slice(&bytes);
        frame
    })
}

mod dialect_detection {
    use super::*;

    #[test]
    fn test_known_interface_counts() {
        let table = [
            (2, ProtocolVersion::V3, EndpointPair::new(0x81, 0x02)),
            (3, ProtocolVersion::V2, EndpointPair::new(0x82, 0x03)),
            (4, ProtocolVersion::V1, EndpointPair::new(0x84, 0x04)),
        ];

        for (count, version, pair) in table {
            let detected = ProtocolVersion::from_interface_count(count).unwrap();
            assert_eq!(detected, version);
            assert_eq!(detected.endpoints(), Some(pair));
        }
    }

    proptest! {
        #[test]
        fn prop_unknown_counts_are_unrecognized(count in any::<u8>()) {
            prop_assume!(!(2..=4).contains(&count));
            prop_assert_eq!(
                ProtocolVersion::from_interface_count(count),
                Err(ProtocolError::ProtocolUnrecognized { count })
            );
        }

        #[test]
        fn prop_complete_override_is_verbatim(
            vendor_id in any::<u16>(),
            read in any::<u8>(),
            write in any::<u8>(),
        ) {
            let pair = EndpointOverride::new(Some(read), Some(write)).complete(vendor_id);
            prop_assert_eq!(pair, Ok(EndpointPair::new(read, write)));
        }
    }
}

mod deduplication {
    use super::*;

    proptest! {
        #[test]
        fn prop_identical_repeat_is_duplicate(frame in arb_frame()) {
            let mut dedup = Deduplicator::new();
            prop_assert!(dedup.is_unique(&frame));
            prop_assert!(!dedup.is_unique(&frame));
        }

        #[test]
        fn prop_header_never_matters(
            frame in arb_frame(),
            header in proptest::collection::vec(any::<u8>(), 4),
        ) {
            let mut other = frame;
            other.as_mut_bytes()[..4].copy_from_slice(&header);

            let mut dedup = Deduplicator::new();
            prop_assert!(dedup.is_unique(&frame));
            prop_assert!(!dedup.is_unique(&other));
        }

        #[test]
        fn prop_payload_change_is_unique(
            frame in arb_frame(),
            position in DEDUP_WINDOW,
            delta in 1u8..=255,
        ) {
            let mut other = frame;
            other.as_mut_bytes()[position] = frame.as_bytes()[position].wrapping_add(delta);

            let mut dedup = Deduplicator::new();
            prop_assert!(dedup.is_unique(&frame));
            prop_assert!(dedup.is_unique(&other));
        }
    }
}

mod operator_lines {
    use super::*;

    #[test]
    fn test_reset_line_layout() {
        let command = decode_line("3 07 02 00").unwrap();
        let mut expected = [0u8; FRAME_LEN];
        expected[..3].copy_from_slice(&[0x07, 0x02, 0x00]);
        assert_eq!(command, LineCommand::Send(Frame::from(expected)));
    }

    #[test]
    fn test_zero_count_quits() {
        assert_eq!(decode_line("0").unwrap(), LineCommand::Quit);
    }

    proptest! {
        #[test]
        fn prop_encoded_prefix_decodes_to_padded_frame(
            data in proptest::collection::vec(any::<u8>(), 1..=FRAME_LEN),
        ) {
            let command = decode_line(&encode_line(&data)).unwrap();
            prop_assert_eq!(command, LineCommand::Send(Frame::from_slice(&data).unwrap()));
        }

        #[test]
        fn prop_oversized_counts_rejected(count in (FRAME_LEN + 1)..1000usize) {
            let rejected = matches!(
                decode_line(&format!("{} 00", count)),
                Err(ProtocolError::FrameTooLarge { .. })
            );
            prop_assert!(rejected);
        }
    }
}
