//! Error taxonomy for the emulation core.
//!
//! Install-time failures and per-step failures share one enum so a step
//! driver can match on a single type regardless of which layer raised it.
//! `CpuHalt` and `DebugQuit` are not failures in the usual sense — they are
//! the two normal-termination signals a driver is expected to catch.

use thiserror::Error;

/// Errors produced by the bus, processor, and peripherals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmuError {
    /// A memory device install requested a range that overlaps an
    /// already-claimed byte.
    #[error("memory range {start:#07x}..={end:#07x} overlaps an installed device")]
    AddressOverlap { start: u32, end: u32 },

    /// A port device install requested a range that overlaps an
    /// already-claimed port.
    #[error("port range {start:#06x}..={end:#06x} overlaps an installed device")]
    PortOverlap { start: u16, end: u16 },

    /// Decode failed: the opcode (optionally prefixed) has no entry in the
    /// dispatch table.
    #[error("invalid opcode {byte:#04x} at {cs:#06x}:{ip:#06x}")]
    InvalidOpcode { cs: u16, ip: u16, byte: u8 },

    /// `HLT` executed with `IF` clear and no pending IRQ. Normal termination.
    #[error("cpu halted")]
    CpuHalt,

    /// The debugger REPL received the `q` command. Normal termination.
    #[error("debugger quit")]
    DebugQuit,

    /// A peripheral's `step`/`in`/`out` failed in a way that should not stop
    /// the guest. Logged by the caller and otherwise ignored.
    #[error("device {device} io error: {detail}")]
    DeviceIoError { device: &'static str, detail: String },
}

pub type Result<T> = std::result::Result<T, EmuError>;
