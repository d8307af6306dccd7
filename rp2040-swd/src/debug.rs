//! L5 — Cortex-M debug: halt/resume, core-register R/W, reset-into-debug, and the
//! "call an arbitrary on-target function" trampoline orchestration.

use crate::consts::*;
use crate::error::SwdError;
use crate::line::{Delay, Line};
use crate::link::{DebugPosture, Session};

/// Where the `blx r7; bkpt 0` stub used to invoke on-target functions lives.
#[derive(Debug, Clone, Copy)]
pub enum Trampoline {
    /// Use the boot ROM's own published trampoline address.
    Bootrom(u32),
    /// Inject [`crate::consts::INJECTED_TRAMPOLINE_WORDS`] at this RAM workspace
    /// address and branch there instead.
    Injected(u32),
}

impl Trampoline {
    fn entry_address(self) -> u32 {
        match self {
            Trampoline::Bootrom(addr) => addr,
            Trampoline::Injected(workspace) => workspace,
        }
    }
}

impl<L: Line, D: Delay> Session<L, D> {
    /// Polls `predicate` each iteration, sleeping ~1us between polls, bounded by
    /// `timeout_us` iterations. This is the engine's only notion of wall-clock time,
    /// since the `Delay` capability is the sole time source available to it.
    fn poll_until<F>(&mut self, timeout_us: u32, mut predicate: F) -> Result<(), SwdError>
    where
        F: FnMut(&mut Self) -> Result<bool, SwdError>,
    {
        for _ in 0..timeout_us.max(1) {
            if predicate(self)? {
                return Ok(());
            }
            self.io_mut().delay_us(1);
        }
        Err(SwdError::DebugTimeout("poll", timeout_us))
    }

    fn dhcsr_write(&mut self, bits: u32) -> Result<(), SwdError> {
        self.write_word_via_ap(DHCSR, DHCSR_DBGKEY | bits)
    }

    fn dhcsr_read(&mut self) -> Result<u32, SwdError> {
        self.read_word_via_ap(DHCSR)
    }

    /// Halt the core: DHCSR = key|DEBUGEN|HALT (optionally masking interrupts).
    pub fn halt(&mut self, mask_interrupts: bool) -> Result<(), SwdError> {
        let mut bits = DHCSR_C_DEBUGEN | DHCSR_C_HALT;
        if mask_interrupts {
            bits |= DHCSR_C_MASKINTS;
        }
        self.dhcsr_write(bits)?;
        self.set_posture(DebugPosture::Halted);
        Ok(())
    }

    /// Resume the core: DHCSR = key (optionally keeping interrupts masked).
    pub fn resume(&mut self, mask_interrupts: bool) -> Result<(), SwdError> {
        let bits = if mask_interrupts { DHCSR_C_MASKINTS } else { 0 };
        self.dhcsr_write(bits)?;
        self.set_posture(DebugPosture::Running);
        Ok(())
    }

    /// Write a core register through DCRSR+DCRDR, polling S_REGRDY.
    pub fn write_core_reg(&mut self, reg_id: u8, value: u32, timeout_us: u32) -> Result<(), SwdError> {
        self.write_word_via_ap(DCRDR, value)?;
        self.write_word_via_ap(DCRSR, DCRSR_REGWNR | reg_id as u32)?;
        self.poll_until(timeout_us, |s| {
            Ok(s.dhcsr_read()? & DHCSR_S_REGRDY != 0)
        })
        .map_err(|_| SwdError::DebugTimeout("REGRDY", timeout_us))
    }

    /// Read a core register through DCRSR+DCRDR, polling S_REGRDY.
    pub fn read_core_reg(&mut self, reg_id: u8, timeout_us: u32) -> Result<u32, SwdError> {
        self.write_word_via_ap(DCRSR, reg_id as u32)?;
        self.poll_until(timeout_us, |s| {
            Ok(s.dhcsr_read()? & DHCSR_S_REGRDY != 0)
        })
        .map_err(|_| SwdError::DebugTimeout("REGRDY", timeout_us))?;
        self.read_word_via_ap(DCRDR)
    }

    /// Halt, arm a reset-into-debug (DEMCR.VC_CORERESET), and request a system reset.
    /// The reset clears DP.SELECT and AP.CSW, so both are re-initialized afterward.
    pub fn reset_into_debug(&mut self, settle_delay_us: u32) -> Result<(), SwdError> {
        self.halt(false)?;
        self.write_word_via_ap(DEMCR, DEMCR_VC_CORERESET)?;
        self.write_word_via_ap(AIRCR, AIRCR_SYSRESETREQ)?;

        self.io_mut().delay_us(settle_delay_us.max(1));

        self.select_bank(0, 0)?;
        self.write_ap(AP_CSW, CSW_32BIT_AUTOINCR)?;
        self.set_posture(DebugPosture::Halted);
        Ok(())
    }

    /// Relocate the vector table to `addr` (e.g. to run freshly injected code whose
    /// exception handlers live in RAM).
    pub fn relocate_vtor(&mut self, addr: u32) -> Result<(), SwdError> {
        self.write_word_via_ap(VTOR, addr)
    }

    /// Invoke the on-target function at `callee` with up to four arguments, via the
    /// debug trampoline (§4.5): `callee` is loaded into r7, the trampoline's
    /// `blx r7; bkpt 0` stub is loaded into PC, and the callee returns to it through
    /// `bx lr`. Distinguishes breakpoint-hit (success, returns r0), timeout, and a
    /// fault vector taken while the callee ran.
    pub fn call_function(
        &mut self,
        callee: u32,
        trampoline: Trampoline,
        args: [u32; 4],
        stack_top: u32,
        reg_timeout_us: u32,
        run_timeout_us: u32,
    ) -> Result<u32, SwdError> {
        if let Trampoline::Injected(workspace) = trampoline {
            let words = INJECTED_TRAMPOLINE_WORDS;
            self.write_multi_word_via_ap(workspace, &words)?;
        }

        self.write_core_reg(reg_id::R0, args[0], reg_timeout_us)?;
        self.write_core_reg(reg_id::R1, args[1], reg_timeout_us)?;
        self.write_core_reg(reg_id::R2, args[2], reg_timeout_us)?;
        self.write_core_reg(reg_id::R3, args[3], reg_timeout_us)?;

        // r7 holds the callee address; bit 0 set selects Thumb (always true here).
        self.write_core_reg(reg_id::R7, callee | 1, reg_timeout_us)?;

        self.write_core_reg(reg_id::MSP, stack_top, reg_timeout_us)?;
        self.write_core_reg(reg_id::XPSR, 0x0100_0000, reg_timeout_us)?;
        self.write_core_reg(
            reg_id::PC,
            trampoline.entry_address() | 1,
            reg_timeout_us,
        )?;
        self.write_core_reg(reg_id::CONTROL_PRIMASK, 1, reg_timeout_us)?;

        // Clear all pending interrupts and sticky fault status before launch.
        self.write_word_via_ap(NVIC_ICPR, 0xFFFF_FFFF)?;
        let dfsr = self.read_word_via_ap(DFSR)?;
        self.write_word_via_ap(DFSR, dfsr)?;

        self.resume(false)?;

        self.poll_until(run_timeout_us, |s| {
            Ok(s.dhcsr_read()? & DHCSR_S_HALT != 0)
        })
        .map_err(|_| SwdError::DebugTimeout("call_function halt", run_timeout_us))?;
        self.set_posture(DebugPosture::Halted);

        // The trampoline's own `bkpt 0` sets DFSR.HALTED|BKPT on every successful call;
        // mask those off before treating DFSR as evidence of a fault. A taken fault
        // vector additionally leaves ICSR.VECTACTIVE nonzero (still inside the handler),
        // unlike our own breakpoint, which halts directly without vectoring.
        let dfsr_after = self.read_word_via_ap(DFSR)?;
        let icsr_after = self.read_word_via_ap(ICSR)?;
        let unexpected_dfsr = dfsr_after & !(DFSR_HALTED | DFSR_BKPT);
        if unexpected_dfsr != 0 || icsr_after & ICSR_VECTACTIVE_MASK != 0 {
            return Err(SwdError::TargetFault(dfsr_after));
        }

        self.read_core_reg(reg_id::R0, reg_timeout_us)
    }
}
