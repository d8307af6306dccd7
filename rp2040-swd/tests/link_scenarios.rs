//! End-to-end bring-up scenarios (S1, S2, S6) against [`rp2040_swd::Session::connect`].
//!
//! `connect` and the raw DP/AP accessors each issue exactly one wire transaction per
//! call (unlike the composite memory/register helpers in `mem_ap`/`debug`), so every
//! step below scripts a single `queue_ok_read`/`queue_ok_write`.

mod support;

use rp2040_swd::consts::*;
use rp2040_swd::{LinkTarget, Session, SwdError};
use support::{NullDelay, ScriptedLine};

fn session(line: ScriptedLine) -> Session<ScriptedLine, NullDelay> {
    Session::new(line, NullDelay, 0)
}

/// Scripts every wire transaction `Session::connect` issues up to (not including) the
/// power-up poll loop, which each scenario scripts differently.
fn script_connect_prelude(line: &mut ScriptedLine, idcode: u32) {
    line.queue_ack_only(rp2040_swd::Ack::Protocol); // TARGETSEL, ack ignored
    line.queue_ok_read(idcode); // IDCODE readback
    line.queue_ok_write(); // DP.ABORT clear
    line.queue_ok_write(); // select_bank(0, 0)
    line.queue_ok_write(); // DP.CTRL/STAT power-up request
}

#[test]
fn s1_idcode_readback_for_core0() {
    const IDCODE: u32 = 0x0BC1_2477;
    let mut line = ScriptedLine::new();
    script_connect_prelude(&mut line, IDCODE);

    line.queue_ok_read(CTRL_STAT_POWER_UP_ACK_MASK); // power-up handshake succeeds
    line.queue_ok_write(); // select_bank(AP_BANK_F, 0)
    line.queue_ok_read(0); // AP IDR posted read (discarded)
    line.queue_ok_read(0x0477_0021); // RDBUFF drain: cached AP IDR
    line.queue_ok_write(); // select_bank(AP_BANK_0, 0)
    line.queue_ok_write(); // AP.CSW configure

    line.queue_ok_read(IDCODE); // the test's own follow-up read_dp(IDCODE)

    let mut s = session(line);
    s.connect(LinkTarget::Core0).expect("connect must succeed");
    assert_eq!(s.read_dp(DP_IDCODE).unwrap(), IDCODE);
}

#[test]
fn s2_power_up_handshake_succeeds_when_both_ack_bits_set() {
    let mut line = ScriptedLine::new();
    script_connect_prelude(&mut line, 0x0BC1_2477);
    line.queue_ok_read(0xF000_0000); // both CSYSPWRUPACK/CDBGPWRUPACK set
    line.queue_ok_write();
    line.queue_ok_read(0);
    line.queue_ok_read(0x0477_0021);
    line.queue_ok_write();
    line.queue_ok_write();

    let mut s = session(line);
    assert!(s.connect(LinkTarget::Core0).is_ok());
}

#[test]
fn s2_power_up_handshake_fails_when_ack_bits_are_missing() {
    let mut line = ScriptedLine::new();
    script_connect_prelude(&mut line, 0x0BC1_2477);
    for _ in 0..32 {
        line.queue_ok_read(0x5000_0000); // neither ack bit set
    }

    let mut s = session(line);
    let err = s.connect(LinkTarget::Core0).unwrap_err();
    assert!(matches!(
        err,
        SwdError::LinkNotBrought(rp2040_swd::LinkStep::PowerUpHandshake)
    ));
}

/// Property 6 / S6: a WAIT ack is retried internally; surfaced only once the retry
/// budget is exhausted.
#[test]
fn s6_wait_is_retried_then_succeeds() {
    let mut line = ScriptedLine::new();
    line.queue_ack_only(rp2040_swd::Ack::Wait);
    line.queue_ack_only(rp2040_swd::Ack::Wait);
    line.queue_ok_write();

    let mut io = rp2040_swd::LineDriver::new(line, NullDelay, 0);
    let outcome = rp2040_swd::frame::transact(
        &mut io,
        rp2040_swd::frame::PortType::DebugPort,
        rp2040_swd::frame::Direction::Write,
        0x8,
        Some(0),
        false,
        &rp2040_swd::RetrySettings::default(),
    );
    assert!(outcome.is_ok());
}

#[test]
fn s6_wait_exhausted_surfaces_protocol_error() {
    let mut line = ScriptedLine::new();
    let retries = rp2040_swd::RetrySettings { max_wait_retries: 8, idle_cycles_after_transfer: 8 };
    for _ in 0..=8 {
        line.queue_ack_only(rp2040_swd::Ack::Wait);
    }

    let mut io = rp2040_swd::LineDriver::new(line, NullDelay, 0);
    let err = rp2040_swd::frame::transact(
        &mut io,
        rp2040_swd::frame::PortType::DebugPort,
        rp2040_swd::frame::Direction::Write,
        0x8,
        Some(0),
        false,
        &retries,
    )
    .unwrap_err();
    assert!(matches!(err, SwdError::WaitRetriesExhausted(8)));
}
