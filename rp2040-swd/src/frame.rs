//! L2 — one SWD transaction: header, turnaround, ACK, data, parity.

use crate::error::{Ack, SwdError};
use crate::line::{Delay, Line, LineDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    DebugPort,
    AccessPort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Retry/backoff knobs, mirroring a teacher-style `SwdSettings`.
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    /// Bound on WAIT-ack retries before a transaction surfaces as a protocol error.
    pub max_wait_retries: usize,
    /// Idle clocks inserted after a transaction, giving a buffered write time to land.
    pub idle_cycles_after_transfer: usize,
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_wait_retries: 8,
            idle_cycles_after_transfer: 8,
        }
    }
}

/// Outcome of a single transaction. `data` is only meaningful for reads, and per the
/// posted-read rule, an AP read's `data` is the *previous* AP read's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub ack: Ack,
    pub data: u32,
}

fn even_parity<I: IntoIterator<Item = bool>>(bits: I) -> bool {
    bits.into_iter().filter(|&b| b).count() % 2 == 1
}

fn header_bits(port: PortType, direction: Direction, addr4: u8) -> [bool; 8] {
    let apndp = matches!(port, PortType::AccessPort);
    let rnw = matches!(direction, Direction::Read);
    let a2 = (addr4 & 0b0100) != 0;
    let a3 = (addr4 & 0b1000) != 0;
    let parity = even_parity([apndp, rnw, a2, a3]);

    [
        true,  // Start
        apndp, // APnDP
        rnw,   // RnW
        a2,    // A[2]
        a3,    // A[3]
        parity, false, // Stop
        true,  // Park
    ]
}

/// Perform one SWD transaction, with WAIT retried up to `retries.max_wait_retries`
/// times. `ignore_ack` suppresses ACK-based error reporting (used only for the
/// multi-drop TARGETSEL write, where no single DAP is expected to answer).
pub fn transact<L: Line, D: Delay>(
    io: &mut LineDriver<L, D>,
    port: PortType,
    direction: Direction,
    addr4: u8,
    write_data: Option<u32>,
    ignore_ack: bool,
    retries: &RetrySettings,
) -> Result<TransactionOutcome, SwdError> {
    let mut attempt = 0usize;
    loop {
        let outcome = transact_once(io, port, direction, addr4, write_data, retries)?;

        if ignore_ack || outcome.ack == Ack::Ok {
            return Ok(outcome);
        }

        if outcome.ack == Ack::Wait {
            attempt += 1;
            if attempt > retries.max_wait_retries {
                return Err(SwdError::WaitRetriesExhausted(retries.max_wait_retries));
            }
            tracing::debug!(attempt, "SWD WAIT ack, retrying");
            continue;
        }

        let kind = match direction {
            Direction::Read => "read",
            Direction::Write => "write",
        };
        return Err(SwdError::Protocol(outcome.ack, kind));
    }
}

fn transact_once<L: Line, D: Delay>(
    io: &mut LineDriver<L, D>,
    port: PortType,
    direction: Direction,
    addr4: u8,
    write_data: Option<u32>,
    retries: &RetrySettings,
) -> Result<TransactionOutcome, SwdError> {
    // DIO is already held from the end of the previous transaction (or never released,
    // for the first one): the header is always driven by the host.
    for bit in header_bits(port, direction, addr4) {
        io.write_bit(bit);
    }

    // Turnaround: host releases DIO, target takes over to drive ACK.
    io.release_dio();
    let _turnaround = io.read_bit();

    let mut ack_bits = 0u8;
    for i in 0..3 {
        if io.read_bit() {
            ack_bits |= 1 << i;
        }
    }
    let ack = Ack::decode(ack_bits);

    let result = match (direction, ack) {
        (Direction::Read, Ack::Ok) => {
            let mut data = 0u32;
            for i in 0..32 {
                if io.read_bit() {
                    data |= 1 << i;
                }
            }
            let parity_bit = io.read_bit();
            // Turnaround back to host drive: reclaim DIO, then clock the turnaround bit.
            io.hold_dio();
            io.write_bit(false);

            let expected_parity = even_parity((0..32).map(|i| (data >> i) & 1 != 0));
            if parity_bit != expected_parity {
                return Err(SwdError::ParityMismatch("AP/DP"));
            }

            TransactionOutcome { ack, data }
        }
        (Direction::Read, _) => {
            // Non-OK ack on a read: reclaim DIO before returning (read pitfall policy).
            io.hold_dio();
            TransactionOutcome { ack, data: 0 }
        }
        (Direction::Write, Ack::Ok) => {
            // Turnaround: reclaim DIO, then clock the turnaround bit, before driving data.
            io.hold_dio();
            io.write_bit(false);
            let data = write_data.unwrap_or(0);
            for i in 0..32 {
                io.write_bit((data >> i) & 1 != 0);
            }
            let parity = even_parity((0..32).map(|i| (data >> i) & 1 != 0));
            io.write_bit(parity);

            for _ in 0..retries.idle_cycles_after_transfer {
                io.write_bit(false);
            }

            TransactionOutcome { ack, data }
        }
        (Direction::Write, _) => {
            // Non-OK ack on a write: symmetric policy, host holds DIO and stops.
            io.hold_dio();
            TransactionOutcome { ack, data: 0 }
        }
    };

    Ok(result)
}
