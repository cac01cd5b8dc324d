//! Minimal demo/debugger binary driving the emulation core against a flat
//! ROM image: `--trace`/`--debug`/`--break` plus a positional ROM path
//! become an `EmuConfig` (§11.3), loaded at `F000:0000` with `CS:IP` left at
//! its power-on `F000:FFF0` (§8's seed-suite convention), then stepped
//! until `CpuHalt` or `DebugQuit`.
//!
//! The host surface is a trivial logging sink (§6): real presentation is a
//! frontend's job, not this core's.

use clap::Parser;
use emu_core::peripherals::cga::HostSurface;
use emu_core::{Emu, EmuConfig, EmuError};
use log::{info, trace};
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

/// Stamps each log line with a `chrono::Local` timestamp, the same
/// `%Y%m%d_%H%M%S`-flavored format the source this is ported from uses to
/// name its own trace dumps.
fn init_logging() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

#[derive(Parser, Debug)]
#[command(name = "pcdbg", about = "IBM PC/XT-class 8088 emulator core demo driver")]
struct Args {
    /// Populate the debugger's instruction history ring.
    #[arg(long)]
    trace: bool,

    /// Install the debugger memory overlay and REPL.
    #[arg(long)]
    debug: bool,

    /// Arm a break before the first instruction executes.
    #[arg(long = "break")]
    break_on_start: bool,

    /// Enable NEC V20 extended opcodes.
    #[arg(long)]
    v20: bool,

    /// Flat binary ROM image, installed at F000:0000.
    rom: String,
}

/// Logs frames and titles instead of presenting them; good enough to
/// observe a guest program's progress from stdout.
struct LoggingSurface;

impl HostSurface for LoggingSurface {
    fn render_graphics(&self, pixels: &[u8], bg: (u8, u8, u8)) {
        trace!("render_graphics: {} bytes, bg={:?}", pixels.len(), bg);
    }

    fn render_text(&self, cells: &[(u8, u8)], blink_enabled: bool, bg_index: u8, cursor: Option<(u8, u8)>) {
        let mut out = String::new();
        for chunk in cells.chunks(80) {
            for &(ch, _attr) in chunk {
                let printable = if (0x20..0x7F).contains(&ch) { ch as char } else { '.' };
                out.push(printable);
            }
            out.push('\n');
        }
        info!("render_text (blink={}, bg={}, cursor={:?}):\n{}", blink_enabled, bg_index, cursor, out);
    }

    fn set_title(&self, title: &str) {
        info!("title: {title}");
    }
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let rom = match fs::read(&args.rom) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("failed to read {}: {e}", args.rom);
            return ExitCode::FAILURE;
        }
    };

    let config = EmuConfig {
        trace: args.trace,
        debug: args.debug,
        break_on_start: args.break_on_start,
        v20: args.v20,
    };

    let mut emu = match Emu::new(config, Arc::new(LoggingSurface)) {
        Ok(emu) => emu,
        Err(e) => {
            eprintln!("install error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = emu.load_rom(rom) {
        eprintln!("rom install error: {e}");
        return ExitCode::FAILURE;
    }

    let code = run(&mut emu);
    emu.close();
    code
}

/// The step driver (§4.8): `processor.step()` repeatedly, each call also
/// advancing every peripheral by the instruction's cycle count internally.
fn run(emu: &mut Emu) -> ExitCode {
    loop {
        match emu.step() {
            Ok(_) => {}
            Err(EmuError::CpuHalt) => {
                info!("halted");
                return ExitCode::SUCCESS;
            }
            Err(EmuError::DebugQuit) => {
                info!("debugger quit");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                let _ = writeln!(io::stderr(), "step error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
