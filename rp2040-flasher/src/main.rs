//! Thin CLI that connects to an RP2040 over bit-banged SWD and writes a firmware
//! image into its internal flash via the boot ROM's own flash routines.

mod gpio;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rp2040_swd::{
    BootromFunctions, FlashWorkspace, LinkTarget, Session, Trampoline, DEFAULT_STACK_TOP_OFFSET,
    RP2040_SRAM_BASE,
};
use tracing_subscriber::EnvFilter;

use gpio::{GpioLine, ThreadDelay};

/// Which RP2040 core (or the always-on rescue DP) to attach the debug session to.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CoreArg {
    #[value(name = "0")]
    Core0,
    #[value(name = "1")]
    Core1,
    Rescue,
}

impl From<CoreArg> for LinkTarget {
    fn from(arg: CoreArg) -> Self {
        match arg {
            CoreArg::Core0 => LinkTarget::Core0,
            CoreArg::Core1 => LinkTarget::Core1,
            CoreArg::Rescue => LinkTarget::Rescue,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "rp2040-flasher", about = "Flash an RP2040 over bit-banged SWD")]
struct Cli {
    /// GPIO chardev the clock/data lines are on.
    #[clap(long, default_value = "/dev/gpiochip0")]
    gpiochip: String,

    /// SWCLK line offset on `--gpiochip`.
    #[clap(long)]
    clk: u32,

    /// SWDIO line offset on `--gpiochip`.
    #[clap(long)]
    dio: u32,

    /// Which DAP to address.
    #[clap(long, default_value = "0")]
    core: CoreArg,

    /// Half a clock period, in microseconds.
    #[clap(long, default_value_t = 1)]
    half_period_us: u32,

    /// Microseconds to wait for a single REGRDY poll.
    #[clap(long, default_value_t = 100)]
    reg_timeout_us: u32,

    /// Microseconds to wait for a called boot ROM routine to hit its breakpoint.
    #[clap(long, default_value_t = 500_000)]
    run_timeout_us: u32,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Firmware image to write verbatim to flash offset 0.
    image: PathBuf,
}

fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_target(false)
        .compact()
        .init();
}

/// Layout of the RAM workspace the flash recipe stages code and data through. Chosen
/// to not overlap: trampoline stub, page buffer, and the call stack each get their own
/// region inside the first 8 KiB of SRAM.
fn default_workspace() -> FlashWorkspace {
    const TRAMPOLINE_OFFSET: u32 = 0x0000;
    const PAGE_BUFFER_OFFSET: u32 = 0x0100;

    FlashWorkspace {
        page_buffer: RP2040_SRAM_BASE + PAGE_BUFFER_OFFSET,
        trampoline: Trampoline::Injected(RP2040_SRAM_BASE + TRAMPOLINE_OFFSET),
        stack_top: RP2040_SRAM_BASE + DEFAULT_STACK_TOP_OFFSET,
        reg_timeout_us: 0,
        run_timeout_us: 0,
    }
}

fn run(cli: Cli) -> Result<()> {
    let image = fs::read(&cli.image)
        .with_context(|| format!("reading firmware image {}", cli.image.display()))?;
    tracing::info!(bytes = image.len(), path = %cli.image.display(), "loaded image");

    let line = GpioLine::open(&cli.gpiochip, cli.clk, cli.dio)
        .with_context(|| format!("opening {} lines clk={} dio={}", cli.gpiochip, cli.clk, cli.dio))?;
    let mut session = Session::new(line, ThreadDelay, cli.half_period_us);

    tracing::info!(core = ?cli.core, "connecting");
    session
        .connect(cli.core.into())
        .context("bringing up the SWD link")?;

    session.halt(true).context("halting the core")?;

    tracing::debug!("resolving boot ROM flash functions");
    let functions: BootromFunctions = session
        .resolve_flash_functions()
        .context("resolving boot ROM function table")?;

    let mut workspace = default_workspace();
    workspace.reg_timeout_us = cli.reg_timeout_us;
    workspace.run_timeout_us = cli.run_timeout_us;

    tracing::info!(bytes = image.len(), "flashing image");
    session
        .flash_image(&functions, &workspace, &image)
        .context("running the flash recipe")?;

    tracing::info!("flash complete, leaving target halted");
    session.disconnect();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "flash failed");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
    Ok(())
}
