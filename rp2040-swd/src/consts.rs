//! Fixed bit-exact constants from §6. All patterns are written MSB-first, matching
//! how the reference datasheet/spec gives them; [`crate::line::LineDriver::write_pattern`]
//! walks them left to right onto the wire in that order.

/// JTAG-to-SWD dormant-state exit sequence. Only the low 30 bits of the 32-bit magic
/// value `0xAEEE_EEE6` are emitted on the wire — see the open-question note in §9.
pub const DORMANT_EXIT_PATTERN: &str = "101110_111011_101110_111011_100110";

/// 128-bit SWD selection alert sequence, MSB-first.
pub const SELECTION_ALERT_PATTERN: &str =
    "0100_1001_1100_1111_1001_0000_0100_0110_\
     1010_1001_1011_0100_1010_0001_0110_0001_\
     1001_0111_1111_0101_1011_1011_1100_0111_\
     0100_0101_0111_0000_0011_1101_1001_1000";

/// SWD activation code (selects SWD, as opposed to other CoreSight protocols, out of
/// dormant state), given as its full reference wire pattern.
pub const ACTIVATION_CODE_SWD: &str = "0000_0101_1000_1111";

/// TARGETSEL value selecting the RP2040's core 0 DAP.
pub const TARGET_ID_CORE0: u32 = 0x0100_2927;
/// TARGETSEL value selecting the RP2040's core 1 DAP.
pub const TARGET_ID_CORE1: u32 = 0x1100_2927;
/// TARGETSEL value selecting the RP2040's rescue DP.
pub const TARGET_ID_RESCUE: u32 = 0xF100_2927;

// -- DP register offsets (within whichever DP bank DP.SELECT has chosen) --
pub const DP_IDCODE: u8 = 0x0;
pub const DP_ABORT: u8 = 0x0;
pub const DP_CTRL_STAT: u8 = 0x4;
pub const DP_SELECT: u8 = 0x8;
pub const DP_RDBUFF: u8 = 0xC;
pub const DP_TARGETSEL: u8 = 0xC;

pub const ABORT_CLEAR_ALL_STICKY: u32 = 0x1E;
pub const CTRL_STAT_POWER_UP_REQ: u32 = 0x5000_0001;
pub const CTRL_STAT_POWER_UP_ACK_MASK: u32 = (1 << 31) | (1 << 29);

// -- AP (MEM-AP) register offsets --
pub const AP_CSW: u8 = 0x0;
pub const AP_TAR: u8 = 0x4;
pub const AP_DRW: u8 = 0xC;
pub const AP_IDR: u8 = 0xC; // bank 0xF

pub const AP_BANK_0: u8 = 0x0;
pub const AP_BANK_F: u8 = 0xF;

/// 32-bit transfer size, auto-increment single, as programmed into CSW at connect time.
pub const CSW_32BIT_AUTOINCR: u32 = 0x2200_0012;

// -- Cortex-M debug & system-control registers (§4.5) --
pub const DHCSR: u32 = 0xE000_EDF0;
pub const DCRSR: u32 = 0xE000_EDF4;
pub const DCRDR: u32 = 0xE000_EDF8;
pub const DEMCR: u32 = 0xE000_EDFC;
pub const AIRCR: u32 = 0xE000_ED0C;
pub const VTOR: u32 = 0xE000_ED08;
pub const NVIC_ICPR: u32 = 0xE000_E180;
pub const DFSR: u32 = 0xE000_ED30;
pub const ICSR: u32 = 0xE000_ED04;

pub const DHCSR_DBGKEY: u32 = 0xA05F_0000;
pub const DHCSR_C_DEBUGEN: u32 = 1 << 0;
pub const DHCSR_C_HALT: u32 = 1 << 1;
pub const DHCSR_C_MASKINTS: u32 = 1 << 3;
pub const DHCSR_S_REGRDY: u32 = 1 << 16;
pub const DHCSR_S_HALT: u32 = 1 << 17;

pub const DCRSR_REGWNR: u32 = 1 << 16;

/// DFSR bits that a trampoline's own `bkpt 0` sets as a matter of course on every
/// successful call — not evidence of a fault taken while the callee ran.
pub const DFSR_HALTED: u32 = 1 << 0;
pub const DFSR_BKPT: u32 = 1 << 1;

/// ICSR[8:0], the exception number active when the core halted. Zero means the core
/// halted directly (halting debug, e.g. our own breakpoint) rather than mid-handler.
pub const ICSR_VECTACTIVE_MASK: u32 = 0x1FF;

pub const DEMCR_VC_CORERESET: u32 = 1 << 0;
pub const AIRCR_SYSRESETREQ: u32 = 0x05FA_0004;

/// Core-register selector IDs accepted by DCRSR[6:0]. r0-r12 map directly to 0-12.
pub mod reg_id {
    pub const R0: u8 = 0;
    pub const R1: u8 = 1;
    pub const R2: u8 = 2;
    pub const R3: u8 = 3;
    pub const R7: u8 = 7;
    pub const LR: u8 = 14;
    pub const PC: u8 = 15;
    pub const XPSR: u8 = 16;
    pub const MSP: u8 = 17;
    pub const PSP: u8 = 18;
    /// Composite CONTROL/PRIMASK/FAULTMASK/BASEPRI register.
    pub const CONTROL_PRIMASK: u8 = 20;
}

/// Bootrom "debug trampoline" published by the RP2040 boot ROM: `blx r7; bkpt 0`.
/// Not all boot ROM revisions publish it at the same address, so callers may instead
/// inject [`INJECTED_TRAMPOLINE_WORDS`] into RAM and branch there.
pub const INJECTED_TRAMPOLINE_WORDS: [u32; 3] = [0x4337_2601, 0xBE00_47B8, 0x46C0_E7FA];

/// Base address of the RP2040's striped SRAM, where callers stage trampoline code,
/// flash page buffers, and the call stack used by [`crate::debug::Session::call_function`].
pub const RP2040_SRAM_BASE: u32 = 0x2000_0000;

/// Default stack-top offset within a caller-supplied RAM workspace (i.e. the usable
/// default MSP is `workspace_base + DEFAULT_STACK_TOP_OFFSET`).
pub const DEFAULT_STACK_TOP_OFFSET: u32 = 0x80;

/// RP2040 boot ROM function table pointer (a fixed ROM address for every revision the
/// flash recipe targets).
pub const BOOTROM_TABLE_POINTER_ADDR: u32 = 0x0000_0014;
