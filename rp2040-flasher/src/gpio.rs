//! Linux `gpiocdev`-backed [`Line`] and [`Delay`], the real collaborators the
//! engine bit-bangs SWD over on a host board (a Raspberry Pi, typically).

use std::thread;
use std::time::Duration;

use gpiocdev::line::Value;
use gpiocdev::request::{Config, Request};
use rp2040_swd::{Delay, Line};

/// Two GPIO-chardev lines wired to the target's SWCLK/SWDIO pins.
///
/// DIO starts out host-driven (output); the engine flips it to input whenever it
/// needs to sample a target-driven bit, via [`release_dio`]/[`hold_dio`].
pub struct GpioLine {
    clk: Request,
    clk_offset: u32,
    dio: Request,
    dio_offset: u32,
}

impl GpioLine {
    pub fn open(chip: &str, clk_offset: u32, dio_offset: u32) -> anyhow::Result<Self> {
        let clk = Request::builder()
            .on_chip(chip)
            .with_consumer("rp2040-flasher")
            .with_line(clk_offset)
            .as_output(Value::Inactive)
            .request()?;

        let dio = Request::builder()
            .on_chip(chip)
            .with_consumer("rp2040-flasher")
            .with_line(dio_offset)
            .as_output(Value::Active)
            .request()?;

        Ok(GpioLine {
            clk,
            clk_offset,
            dio,
            dio_offset,
        })
    }
}

fn as_value(level: bool) -> Value {
    if level {
        Value::Active
    } else {
        Value::Inactive
    }
}

impl Line for GpioLine {
    fn set_clk(&mut self, level: bool) {
        let _ = self.clk.set_value(self.clk_offset, as_value(level));
    }

    fn set_dio(&mut self, level: bool) {
        let _ = self.dio.set_value(self.dio_offset, as_value(level));
    }

    fn release_dio(&mut self) {
        let _ = self
            .dio
            .reconfigure(Config::new().with_line(self.dio_offset).as_input());
    }

    fn hold_dio(&mut self) {
        let _ = self
            .dio
            .reconfigure(Config::new().with_line(self.dio_offset).as_output(Value::Active));
    }

    fn sample_dio(&self) -> bool {
        self.dio
            .value(self.dio_offset)
            .map(|v| v == Value::Active)
            .unwrap_or(false)
    }
}

/// Busy-sleeps via `std::thread::sleep`, matching the host's actual clock resolution
/// rather than a calibrated spin loop — adequate for the low clock rates SWD
/// bit-banging runs at.
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us as u64));
    }
}
