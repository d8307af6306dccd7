//! Unified error taxonomy for the SWD engine (see DESIGN.md for the mapping from the
//! original informal "negative step code" vocabulary onto this type).

/// Which step of the multi-drop bring-up sequence failed.
///
/// Ordered as they occur in [`crate::link::Session::connect`]; kept as data (not a
/// magic number) so callers can match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStep {
    /// Step 8: the TARGETSEL write itself (only reachable if the line framer rejected it).
    TargetSelect,
    /// Step 9: the post-TARGETSEL IDCODE read never returned a sane ACK.
    IdCodeReadback,
    /// Step 10: clearing sticky errors via DP.ABORT.
    AbortClear,
    /// Step 12: CSYSPWRUPACK/CDBGPWRUPACK never both went high.
    PowerUpHandshake,
    /// Step 13: the AP IDR read (posted + RDBUFF drain) failed.
    ApIdRead,
    /// Step 14: programming AP.CSW failed.
    CswConfigure,
}

impl LinkStep {
    /// A short identifier for user-facing diagnostics, matching the "step identifier"
    /// the outer flasher is required to print per the error handling contract.
    pub fn name(&self) -> &'static str {
        match self {
            LinkStep::TargetSelect => "targetsel",
            LinkStep::IdCodeReadback => "idcode",
            LinkStep::AbortClear => "abort-clear",
            LinkStep::PowerUpHandshake => "power-up",
            LinkStep::ApIdRead => "ap-idr",
            LinkStep::CswConfigure => "csw-configure",
        }
    }
}

impl std::fmt::Display for LinkStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The 3-bit ACK field of an SWD transaction, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Ok,
    Wait,
    Fault,
    /// Any bit pattern other than the three valid ACK codes.
    Protocol,
}

impl Ack {
    pub(crate) fn decode(bits: u8) -> Ack {
        match bits {
            0b001 => Ack::Ok,
            0b010 => Ack::Wait,
            0b100 => Ack::Fault,
            _ => Ack::Protocol,
        }
    }
}

/// The single result-carrying error type for the whole engine.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum SwdError {
    /// Target responded with {0:?} to a {1} transaction.
    Protocol(Ack, &'static str),

    /// Data parity check failed on a read from {0}.
    ParityMismatch(&'static str),

    /// DIO turnaround was lost; the line was left in an undefined direction.
    TurnaroundLost,

    /// Link bring-up failed at step `{0}`.
    LinkNotBrought(LinkStep),

    /// Memory access port transaction failed: {0}
    MemAp(#[from] Box<SwdError>),

    /// Half-word read at {0:#010x} is not 2-byte aligned.
    Unaligned(u32),

    /// Timed out waiting for `{0}` after {1} us.
    DebugTimeout(&'static str, u32),

    /// Target took a fault vector while executing an injected call (DFSR={0:#010x}).
    TargetFault(u32),

    /// WAIT response was retried {0} times without success.
    WaitRetriesExhausted(usize),

    /// Bootrom function table has no entry for `{0}`.
    MissingBootromFunction(&'static str),

    /// Flash routine `{0}` failed: {1}
    RoutineCallFailed(&'static str, Box<SwdError>),
}

pub type Result<T> = std::result::Result<T, SwdError>;
