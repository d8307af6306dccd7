//! L1 — bit-level half-duplex signalling.
//!
//! `Line` and `Delay` are the engine's only swap points: a real GPIO pin pair in
//! production, a recording/scripting stub in tests. Neither trait can fail — a
//! clock/timing misconfiguration only ever surfaces as a protocol error one layer up.

/// Microsecond-resolution busy-sleep. Implementations are expected to spin or call
/// into a hardware timer; the engine never awaits anything.
pub trait Delay {
    fn delay_us(&mut self, us: u32);
}

/// The two-pin GPIO capability the engine bit-bangs SWD over.
///
/// The target captures host-driven DIO on the rising edge of CLK; the host samples
/// target-driven DIO just before the rising edge of CLK.
pub trait Line {
    /// Drive CLK and DIO, with DIO initially held (host-driven).
    fn set_clk(&mut self, level: bool);
    fn set_dio(&mut self, level: bool);
    /// Tri-state DIO so the target can drive it.
    fn release_dio(&mut self);
    /// Re-enable host drive of DIO.
    fn hold_dio(&mut self);
    /// Sample the current level of DIO (meaningful only while released).
    fn sample_dio(&self) -> bool;
}

/// Drives the two raw GPIO primitives with the timed edge protocol §4.1 specifies.
pub struct LineDriver<L, D> {
    line: L,
    delay: D,
    half_period_us: u32,
}

impl<L: Line, D: Delay> LineDriver<L, D> {
    pub fn new(line: L, delay: D, half_period_us: u32) -> Self {
        LineDriver {
            line,
            delay,
            half_period_us,
        }
    }

    fn half_wait(&mut self) {
        self.delay.delay_us(self.half_period_us);
    }

    /// `write_bit(b)`: set DIO=b, wait half-period, raise CLK, wait half-period, lower CLK.
    pub fn write_bit(&mut self, bit: bool) {
        self.line.set_dio(bit);
        self.half_wait();
        self.line.set_clk(true);
        self.half_wait();
        self.line.set_clk(false);
    }

    /// `read_bit()`: wait half-period, sample DIO, raise CLK, wait half-period, lower CLK.
    pub fn read_bit(&mut self) -> bool {
        self.half_wait();
        let sample = self.line.sample_dio();
        self.line.set_clk(true);
        self.half_wait();
        self.line.set_clk(false);
        sample
    }

    /// Tri-state DIO for the target to drive.
    pub fn release_dio(&mut self) {
        self.line.release_dio();
    }

    /// Re-enable host drive of DIO.
    pub fn hold_dio(&mut self) {
        self.line.hold_dio();
    }

    /// Emit a literal ASCII bit string. `0`/`1` produce bits; anything else (including
    /// `_` nibble separators) is skipped, so reference constants can be written readably.
    pub fn write_pattern(&mut self, pattern: &str) {
        for ch in pattern.chars() {
            match ch {
                '0' => self.write_bit(false),
                '1' => self.write_bit(true),
                _ => {}
            }
        }
    }

    /// 64 consecutive ones with DIO driven.
    pub fn write_line_reset(&mut self) {
        for _ in 0..64 {
            self.write_bit(true);
        }
    }

    pub fn line_mut(&mut self) -> &mut L {
        &mut self.line
    }

    /// Busy-sleep for `us` microseconds, delegating to the session's `Delay`.
    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}
