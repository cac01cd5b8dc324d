//! Peripheral framework: a uniform install/reset/step/close lifecycle for
//! every device beyond the plain RAM/ROM in `memory`.
//!
//! A `Processor` holds its peripherals in an ordered `Vec`. Install order
//! only matters for the debugger overlay, which must be installed last so
//! its recorded "previous owner" table captures every other device (§4.2).
//! Per the port's design notes, a peripheral never stores a reference back
//! to the processor: `install` is handed the bus and IO tables directly,
//! and any device that raises interrupts is hit by reference during the
//! step loop instead of reaching back out on its own.

pub mod cga;
pub mod debugger;
mod font8x8;

pub use cga::Cga;
pub use debugger::Debugger;

use crate::bus::{IoBus, MemoryBus};
use crate::error::Result;

/// Union of memory device and/or IO device plus lifecycle hooks.
///
/// Implementors claim whatever bus ranges they need from within `install`
/// (constructing their own `MemoryDevice`/`IoDevice` wrappers and
/// registering those, not `self`, since a peripheral's externally visible
/// lifecycle and its bus-addressable byte/port storage are different
/// objects once background tasks are involved — see `Cga`).
pub trait Peripheral {
    fn name(&self) -> &'static str;
    fn install(&mut self, bus: &mut MemoryBus, io: &mut IoBus) -> Result<()>;
    fn reset(&mut self);
    /// Advance by the cycle count of the instruction just executed.
    fn step(&mut self, cycles: u32) -> Result<()>;
    fn close(&mut self);
}
