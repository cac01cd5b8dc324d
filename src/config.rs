//! Explicit emulator configuration.
//!
//! The source this core is ported from threads a handful of process-global
//! booleans (a `debugBreak` flag, a `traceInstructions` switch) through the
//! debugger and CPU. Here they are fields on `EmuConfig`, built once by the
//! CLI layer (`demos/pcdbg.rs`) or directly by a library caller/test, and
//! passed into constructors instead of read from ambient state.

/// Construction-time knobs for a `Processor` and its debugger overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuConfig {
    /// Populate the debugger's instruction history ring on every step.
    pub trace: bool,
    /// Install the debugger memory overlay over the full 1 MiB range.
    pub debug: bool,
    /// Arm `Debugger::break_now` before the first step.
    pub break_on_start: bool,
    /// Enable NEC V20 extended (0F-prefixed) opcodes.
    pub v20: bool,
}

impl Default for EmuConfig {
    fn default() -> Self {
        Self {
            trace: false,
            debug: false,
            break_on_start: false,
            v20: false,
        }
    }
}

impl EmuConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
