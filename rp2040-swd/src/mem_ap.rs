//! L4 — memory-space access via the MEM-AP's TAR/DRW pair.
//!
//! Assumes AP+DP bank 0 and CSW are already configured (done once, at connect time).

use crate::consts::{AP_DRW, AP_TAR, DP_RDBUFF};
use crate::error::SwdError;
use crate::line::{Delay, Line};
use crate::link::Session;

impl<L: Line, D: Delay> Session<L, D> {
    pub fn write_word_via_ap(&mut self, addr: u32, data: u32) -> Result<(), SwdError> {
        self.write_ap(AP_TAR, addr)?;
        self.write_ap(AP_DRW, data)?;
        Ok(())
    }

    pub fn read_word_via_ap(&mut self, addr: u32) -> Result<u32, SwdError> {
        self.write_ap(AP_TAR, addr)?;
        self.read_ap(AP_DRW)?; // posted, stale value discarded
        self.read_dp(DP_RDBUFF)
    }

    /// Reads the half-word at `addr`, forcing TAR to the enclosing word address.
    pub fn read_half_word_via_ap(&mut self, addr: u32) -> Result<u16, SwdError> {
        if addr & 1 != 0 {
            return Err(SwdError::Unaligned(addr));
        }
        let word = self.read_word_via_ap(addr & !0x3)?;
        Ok(if addr & 0x2 == 0 {
            (word & 0xFFFF) as u16
        } else {
            (word >> 16) as u16
        })
    }

    /// Streams `data` through DRW starting at `start_addr`, relying on the AP's
    /// auto-increment. TAR is rewritten whenever the running address crosses a
    /// 1024-byte boundary, since auto-increment is only guaranteed within the low
    /// 10 bits of TAR.
    pub fn write_multi_word_via_ap(&mut self, start_addr: u32, data: &[u32]) -> Result<(), SwdError> {
        if data.is_empty() {
            return Ok(());
        }

        self.write_ap(AP_TAR, start_addr)?;
        let mut last_tar_low10 = start_addr & 0x3FF;

        for (i, &word) in data.iter().enumerate() {
            let addr = start_addr.wrapping_add((i as u32) * 4);
            let low10 = addr & 0x3FF;

            if i > 0 && low10 < last_tar_low10 {
                self.write_ap(AP_TAR, addr)?;
            }
            last_tar_low10 = low10;

            self.write_ap(AP_DRW, word)?;
        }

        Ok(())
    }
}
