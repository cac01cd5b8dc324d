//! IBM PC/XT-class 8088/V20 emulator core.
//!
//! This crate covers the emulation core only: the processor model, the
//! memory/IO bus fabric that dispatches reads and writes to pluggable
//! peripheral devices, the interrupt controller feeding the processor, and
//! the two representative peripherals that round out the bus — a CGA-class
//! video adapter and an interactive debugger overlay. Host platform
//! concerns (window presentation, keyboard acquisition, disk images, a BIOS
//! blob) are out of scope; they are reached only through the interfaces
//! these modules expose (`peripherals::cga::HostSurface`, `InterruptHandler`).
//!
//! # Module organization
//!
//! - `addr`: segment:offset to 20-bit linear address conversion.
//! - `bus`: the 1 MiB memory bus and 64 Ki IO bus dispatch tables.
//! - `pic`: the 8259A-class interrupt controller.
//! - `cpu`: instruction decode/execute, flags, the processor step loop.
//! - `memory`: plain RAM and ROM devices.
//! - `peripherals`: the install/reset/step/close lifecycle, CGA, debugger.
//! - `disasm`: opcode mnemonic table and history-entry formatting.
//! - `config`: `EmuConfig`, the construction-time knobs threaded through
//!   `Processor`/`Debugger` instead of process-global state.
//! - `error`: the `EmuError` taxonomy shared by every fallible entry point.
//! - `emu`: a thin orchestrator assembling a `Processor` with the standard
//!   peripheral set from an `EmuConfig`.
//!
//! # Memory map
//!
//! | Address range | Region |
//! |---|---|
//! | `0x00000`-`0x9FFFF` | conventional RAM (caller-sized, typically 640 KiB) |
//! | `0xB8000`-`0xBFFFF` | CGA framebuffer (16 KiB, aliased across the range) |
//! | `0xF0000`-`0xFFFFF` | BIOS ROM, reset vector at `0xFFFF0` |

pub mod addr;
pub mod bus;
pub mod config;
pub mod cpu;
pub mod disasm;
mod emu;
pub mod error;
pub mod memory;
pub mod peripherals;
pub mod pic;

pub use config::EmuConfig;
pub use cpu::{Processor, Registers, Stats, StepCycles};
pub use emu::Emu;
pub use error::{EmuError, Result};
