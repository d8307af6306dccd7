//! L3 — bring-up sequence and the DP/AP register access API.

use crate::consts::*;
use crate::error::{LinkStep, SwdError};
use crate::frame::{self, Direction, PortType, RetrySettings, TransactionOutcome};
use crate::line::{Delay, Line, LineDriver};

/// Which of the RP2040's three multi-drop DAPs to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Core0,
    Core1,
    Rescue,
}

impl LinkTarget {
    fn target_id(self) -> u32 {
        match self {
            LinkTarget::Core0 => TARGET_ID_CORE0,
            LinkTarget::Core1 => TARGET_ID_CORE1,
            LinkTarget::Rescue => TARGET_ID_RESCUE,
        }
    }
}

/// Debug posture of the target core, tracked so L5 callers can assert preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugPosture {
    Unknown,
    Halted,
    Running,
}

/// One live SWD attachment. Owns the line driver and all session-scoped state: the
/// shadow of DP.SELECT (so bank switches are only issued when the bank actually
/// changes), the cached AP IDR, and the current debug posture.
pub struct Session<L, D> {
    io: LineDriver<L, D>,
    retries: RetrySettings,
    select_shadow: Option<u32>,
    ap_id: Option<u32>,
    posture: DebugPosture,
}

impl<L: Line, D: Delay> Session<L, D> {
    pub fn new(line: L, delay: D, half_period_us: u32) -> Self {
        Session {
            io: LineDriver::new(line, delay, half_period_us),
            retries: RetrySettings::default(),
            select_shadow: None,
            ap_id: None,
            posture: DebugPosture::Unknown,
        }
    }

    pub fn with_retry_settings(mut self, retries: RetrySettings) -> Self {
        self.retries = retries;
        self
    }

    pub fn ap_id(&self) -> Option<u32> {
        self.ap_id
    }

    pub fn posture(&self) -> DebugPosture {
        self.posture
    }

    pub(crate) fn set_posture(&mut self, posture: DebugPosture) {
        self.posture = posture;
    }

    pub(crate) fn retries(&self) -> &RetrySettings {
        &self.retries
    }

    pub(crate) fn io_mut(&mut self) -> &mut LineDriver<L, D> {
        &mut self.io
    }

    fn raw_transact(
        &mut self,
        port: PortType,
        direction: Direction,
        addr4: u8,
        write_data: Option<u32>,
        ignore_ack: bool,
    ) -> Result<TransactionOutcome, SwdError> {
        frame::transact(
            &mut self.io,
            port,
            direction,
            addr4,
            write_data,
            ignore_ack,
            &self.retries,
        )
    }

    /// Raw DP write. `ignore_ack` is only meaningful for the multi-drop TARGETSEL write.
    pub fn write_dp(&mut self, addr4: u8, data32: u32, ignore_ack: bool) -> Result<(), SwdError> {
        self.raw_transact(PortType::DebugPort, Direction::Write, addr4, Some(data32), ignore_ack)?;
        Ok(())
    }

    pub fn read_dp(&mut self, addr4: u8) -> Result<u32, SwdError> {
        let outcome = self.raw_transact(PortType::DebugPort, Direction::Read, addr4, None, false)?;
        Ok(outcome.data)
    }

    /// Raw AP write (DP+AP bank must already be selected by the caller).
    pub fn write_ap(&mut self, addr4: u8, data32: u32) -> Result<(), SwdError> {
        self.raw_transact(PortType::AccessPort, Direction::Write, addr4, Some(data32), false)?;
        Ok(())
    }

    /// Raw AP read. Per the posted-read rule this returns the *previous* AP
    /// transaction's value; the caller chains another `read_ap` or drains via
    /// `read_dp(DP_RDBUFF)`.
    pub fn read_ap(&mut self, addr4: u8) -> Result<u32, SwdError> {
        let outcome = self.raw_transact(PortType::AccessPort, Direction::Read, addr4, None, false)?;
        Ok(outcome.data)
    }

    /// Select an AP bank + DP bank pair, writing DP.SELECT only if it actually changes.
    pub(crate) fn select_bank(&mut self, ap_bank: u8, dp_bank: u8) -> Result<(), SwdError> {
        let value = ((ap_bank as u32) << 4) | (dp_bank as u32 & 0xF);
        if self.select_shadow == Some(value) {
            return Ok(());
        }
        self.write_dp(DP_SELECT, value, false)?;
        self.select_shadow = Some(value);
        Ok(())
    }

    /// A posted AP read followed immediately by the RDBUFF drain that retrieves it.
    pub fn read_ap_now(&mut self, addr4: u8) -> Result<u32, SwdError> {
        self.read_ap(addr4)?;
        self.read_dp(DP_RDBUFF)
    }

    /// Full multi-drop bring-up sequence (§4.3, steps 1-14).
    pub fn connect(&mut self, target: LinkTarget) -> Result<(), SwdError> {
        self.select_shadow = None;
        self.ap_id = None;
        self.posture = DebugPosture::Unknown;

        // 1. Idle: DIO high, >=8 clocks.
        self.io.hold_dio();
        self.io.write_pattern("11111111");

        // 2. JTAG-to-SWD dormant conversion: low 30 bits of 0xAEEE_EEE6, then idle.
        self.io.write_pattern(DORMANT_EXIT_PATTERN);
        self.io.write_bit(false);

        // 3. Brief low idle, then 8 ones.
        self.io.write_bit(false);
        self.io.write_pattern("11111111");

        // 4. 128-bit selection alert.
        self.io.write_pattern(SELECTION_ALERT_PATTERN);

        // 5. 4-bit activation code for SWD.
        self.io.write_pattern(ACTIVATION_CODE_SWD);

        // 6. Line reset.
        self.io.write_line_reset();

        // 7. Eight zeros trailer, short idle.
        self.io.write_pattern("00000000");
        self.io.write_bit(false);

        // 8. TARGETSEL write, ACK ignored (no DAP is allowed to respond).
        tracing::debug!(target = ?target, "writing TARGETSEL");
        self.write_dp(DP_TARGETSEL, target.target_id(), true)?;

        // 9. IDCODE read verifies the selected target is listening.
        let idcode = self
            .read_dp(DP_IDCODE)
            .map_err(|_| SwdError::LinkNotBrought(LinkStep::IdCodeReadback))?;
        tracing::debug!(idcode = format!("{idcode:#010x}"), "target responded");

        // 10. Clear sticky errors.
        self.write_dp(DP_ABORT, ABORT_CLEAR_ALL_STICKY, false)
            .map_err(|_| SwdError::LinkNotBrought(LinkStep::AbortClear))?;

        // 11. Select AP 0 bank 0.
        self.select_bank(0, 0)?;

        // 12. Power-up request, poll for both acks.
        self.write_dp(DP_CTRL_STAT, CTRL_STAT_POWER_UP_REQ, false)
            .map_err(|_| SwdError::LinkNotBrought(LinkStep::PowerUpHandshake))?;

        let mut powered_up = false;
        for _ in 0..32 {
            let ctrl_stat = self
                .read_dp(DP_CTRL_STAT)
                .map_err(|_| SwdError::LinkNotBrought(LinkStep::PowerUpHandshake))?;
            if ctrl_stat & CTRL_STAT_POWER_UP_ACK_MASK == CTRL_STAT_POWER_UP_ACK_MASK {
                powered_up = true;
                break;
            }
        }
        if !powered_up {
            return Err(SwdError::LinkNotBrought(LinkStep::PowerUpHandshake));
        }

        // 13. Read AP IDR (bank F), drain via RDBUFF, cache it.
        self.select_bank(AP_BANK_F, 0)?;
        self.read_ap(AP_IDR)
            .map_err(|_| SwdError::LinkNotBrought(LinkStep::ApIdRead))?;
        let ap_id = self
            .read_dp(DP_RDBUFF)
            .map_err(|_| SwdError::LinkNotBrought(LinkStep::ApIdRead))?;
        self.ap_id = Some(ap_id);
        tracing::debug!(ap_id = format!("{ap_id:#010x}"), "cached AP IDR");

        // 14. Restore AP+DP bank 0, configure CSW for 32-bit auto-increment access.
        self.select_bank(AP_BANK_0, 0)?;
        self.write_ap(AP_CSW, CSW_32BIT_AUTOINCR)
            .map_err(|_| SwdError::LinkNotBrought(LinkStep::CswConfigure))?;

        Ok(())
    }

    /// Park the line and drop the session: DIO driven low, CLK held low.
    pub fn disconnect(mut self) {
        self.io.hold_dio();
        self.io.write_pattern("0");
    }
}
