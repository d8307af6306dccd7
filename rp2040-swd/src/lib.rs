//! Bit-banged SWD engine for the RP2040: bring-up, memory access, Cortex-M debug
//! control, and a boot-ROM flash-programming recipe built on top.
//!
//! Layered roughly as the datasheet describes the protocol stack:
//!
//! - [`line`] — L1, raw half-duplex clock/data edges.
//! - [`frame`] — L2, the 8-bit request header / ack / data-phase transaction.
//! - [`link`] — L3, multi-drop bring-up and the DP/AP register API.
//! - [`mem_ap`] — L4, memory-space access via TAR/DRW.
//! - [`debug`] — L5, Cortex-M halt/resume/register access and the call trampoline.
//! - [`flash`] — a client of L5, not part of the debug engine itself.

pub mod consts;
pub mod debug;
pub mod error;
pub mod flash;
pub mod frame;
pub mod line;
pub mod mem_ap;
pub mod link;

pub use consts::{DEFAULT_STACK_TOP_OFFSET, RP2040_SRAM_BASE};
pub use debug::Trampoline;
pub use error::{Ack, LinkStep, SwdError};
pub use flash::{BootromFunctions, FlashWorkspace};
pub use frame::RetrySettings;
pub use line::{Delay, Line, LineDriver};
pub use link::{DebugPosture, LinkTarget, Session};
