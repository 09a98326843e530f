//! Session Integration Tests
//!
//! Acquisition, dialect resolution and exchange behavior against the mock
//! backend.
//!
//! # Test Scenarios
//! - Dialect table for the known vendor
//! - Endpoint overrides for other vendors
//! - Echo exchanges and deduplication
//! - Reset acknowledgment rule
//! - Teardown on every exit path
//!
//! Run with: `cargo test -p probe --test session_tests`

use probe::test_utils::{MockDevice, MockReply};
use probe::usb::{DedupMode, Session, SessionError, SessionOptions, TransferOutcome};
use proptest::prelude::*;
use protocol::{
    EndpointOverride, EndpointPair, FRAME_LEN, Frame, KNOWN_VENDOR_ID, ProtocolError,
    ProtocolVersion, Response,
};

const PRODUCT_ID: u16 = 0x1b2e;

fn known_vendor() -> SessionOptions {
    SessionOptions::new(KNOWN_VENDOR_ID, PRODUCT_ID)
}

// ============================================================================
// Dialect Resolution Tests
// ============================================================================

#[test]
fn test_interface_counts_select_dialect() {
    let table = [
        (2, ProtocolVersion::V3, EndpointPair::new(0x81, 0x02)),
        (3, ProtocolVersion::V2, EndpointPair::new(0x82, 0x03)),
        (4, ProtocolVersion::V1, EndpointPair::new(0x84, 0x04)),
    ];

    for (count, version, endpoints) in table {
        let device = MockDevice::new();
        device.set_interface_count(count);

        let session = Session::open(device.backend(), known_vendor()).unwrap();
        assert_eq!(session.protocol(), Some(version));
        assert_eq!(session.endpoints(), Some(endpoints));
    }
}

#[test]
fn test_partial_override_names_missing_side() {
    let device = MockDevice::new();
    let options = known_vendor().with_endpoints(EndpointOverride::new(Some(0x82), None));

    let err = Session::open(device.backend(), options).err().unwrap();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::MissingEndpointOverride {
            missing: "Output",
            ..
        })
    ));
    assert_eq!(err.remediation(), Some("You probably forgot to specify -o."));
    assert_eq!(device.open_handles(), 0);
}

proptest! {
    #[test]
    fn prop_unknown_counts_fail_and_release(count in any::<u8>()) {
        prop_assume!(!(2..=4).contains(&count));
        let device = MockDevice::new();
        device.set_interface_count(count);

        let err = Session::open(device.backend(), known_vendor()).err().unwrap();
        let unrecognized = matches!(
            err,
            SessionError::Protocol(ProtocolError::ProtocolUnrecognized { count: c }) if c == count
        );
        prop_assert!(unrecognized);
        prop_assert_eq!(device.open_handles(), 0);
        prop_assert_eq!(device.attached(), vec![0, 1, 2]);
    }

    #[test]
    fn prop_other_vendors_need_both_endpoints(
        vendor_id in 1u16..,
        input in proptest::option::of(1u8..),
        output in proptest::option::of(1u8..),
    ) {
        prop_assume!(vendor_id != KNOWN_VENDOR_ID);
        let device = MockDevice::new();
        let options = SessionOptions::new(vendor_id, PRODUCT_ID)
            .with_endpoints(EndpointOverride::new(input, output));

        let result = Session::open(device.backend(), options);
        match (input, output) {
            (Some(read), Some(write)) => {
                let session = result.ok().unwrap();
                prop_assert_eq!(session.endpoints(), Some(EndpointPair::new(read, write)));
                prop_assert_eq!(session.protocol(), Some(ProtocolVersion::Override));
            }
            _ => {
                let missing = matches!(
                    result.err(),
                    Some(SessionError::Protocol(ProtocolError::MissingEndpointOverride { .. }))
                );
                prop_assert!(missing);
            }
        }
    }

    #[test]
    fn prop_echo_exchange_returns_request(bytes in proptest::collection::vec(any::<u8>(), 1..=FRAME_LEN)) {
        let device = MockDevice::new();
        let mut session = Session::open(device.backend(), known_vendor()).unwrap();
        let frame = Frame::from_slice(&bytes).unwrap();
        prop_assume!(frame.command() != 0x07);

        let outcome = session.exchange(&frame);
        prop_assert_eq!(outcome, TransferOutcome::Unique(Response::new(frame, FRAME_LEN)));
    }
}

// ============================================================================
// Exchange Tests
// ============================================================================

#[test]
fn test_identical_repeat_is_duplicate() {
    let device = MockDevice::new();
    let mut session = Session::open(device.backend(), known_vendor()).unwrap();
    let frame = Frame::from_slice(&[0x0e, 0x00, 0x12, 0x34, 0x56]).unwrap();

    assert!(matches!(
        session.send(&frame, DedupMode::On),
        TransferOutcome::Unique(_)
    ));
    assert_eq!(session.send(&frame, DedupMode::On), TransferOutcome::Duplicate);
}

#[test]
fn test_differences_before_byte_four_are_duplicates() {
    let device = MockDevice::new();
    let mut session = Session::open(device.backend(), known_vendor()).unwrap();

    session.send(&Frame::from_slice(&[0x0e, 0x00, 0x00, 0x00]).unwrap(), DedupMode::On);
    let outcome = session.send(&Frame::from_slice(&[0x0e, 0x00, 0xff, 0xff]).unwrap(), DedupMode::On);
    assert_eq!(outcome, TransferOutcome::Duplicate);
}

#[test]
fn test_empty_reset_answer_depends_on_dialect() {
    let device = MockDevice::new();
    device.push_reply(MockReply::Data(Vec::new()));
    let mut session = Session::open(device.backend(), known_vendor()).unwrap();
    assert_eq!(session.exchange(&Frame::reset()), TransferOutcome::Acknowledged);

    let device = MockDevice::new();
    device.push_reply(MockReply::Data(Vec::new()));
    let options = SessionOptions::new(0x046d, 0xc52b)
        .with_endpoints(EndpointOverride::new(Some(0x81), Some(0x02)));
    let mut session = Session::open(device.backend(), options).unwrap();
    assert_eq!(
        session.exchange(&Frame::reset()),
        TransferOutcome::Unique(Response::new(Frame::zeroed(), 0))
    );
}

#[test]
fn test_frames_use_resolved_endpoints() {
    let device = MockDevice::new();
    device.set_interface_count(4);
    let mut session = Session::open(device.backend(), known_vendor()).unwrap();

    session.exchange(&Frame::zeroed());
    assert_eq!(device.writes()[0].0, 0x04);
    assert_eq!(device.reads(), vec![0x84]);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[test]
fn test_drop_restores_kernel_drivers() {
    let device = MockDevice::new();
    {
        let _session = Session::open(device.backend(), known_vendor()).unwrap();
        assert_eq!(device.open_handles(), 1);
        assert_eq!(device.claimed(), vec![1, 2]);
    }

    assert_eq!(device.open_handles(), 0);
    assert_eq!(device.released(), vec![1, 2]);
    assert_eq!(device.attached(), vec![0, 1, 2]);
}

#[test]
fn test_at_most_one_handle_across_reinits() {
    let device = MockDevice::new();
    let mut session = Session::open(device.backend(), known_vendor()).unwrap();

    for _ in 0..3 {
        session.reinit().unwrap();
        assert_eq!(device.open_handles(), 1);
    }
    assert_eq!(device.opens(), 4);
}

#[test]
fn test_reinit_redetects_dialect() {
    let device = MockDevice::new();
    let mut session = Session::open(device.backend(), known_vendor()).unwrap();
    assert_eq!(session.protocol(), Some(ProtocolVersion::V2));

    device.set_interface_count(2);
    session.reinit().unwrap();
    assert_eq!(session.protocol(), Some(ProtocolVersion::V3));
}
