//! Debugger overlay: a transparent memory-device shim plus an interactive
//! REPL coupled into the processor's step loop.
//!
//! The overlay is installed last, over the whole 1 MiB range (§4.2); every
//! read/write it receives delegates to whichever device owned that byte
//! before the overlay took over, recorded once at install time. Writes run
//! a small rule set afterward — currently just the BIOS-error-byte break
//! trigger at `0040:0015`.
//!
//! The REPL itself is generic over `BufRead`/`Write` rather than tied to
//! stdio, so it can be driven by a test harness feeding canned input.
//!
//! `v`'s row-by-row video dump appends the `<<<!` magic sequence to every
//! line it writes, so a front-end reading the stream can suppress each
//! line terminator and compose the 25 writes into one rendered frame.

use crate::bus::{DeviceHandle, DeviceTable, MemoryDevice};
use crate::disasm;
use crate::error::{EmuError, Result};
use crate::peripherals::Peripheral;
use log::info;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::rc::Rc;

const HISTORY_CAPACITY: usize = 128;
const BIOS_ERROR_BYTE: u32 = 0x415; // 0040:0015

/// State shared between the installed `MemoryDevice` shim and the
/// `Debugger` peripheral's REPL and single-step bookkeeping.
pub struct DebuggerState {
    pub break_now: bool,
    pub break_on_iret: bool,
    pub last_instruction: Option<(u16, u16)>,
    pub breakpoints: Vec<u16>,
    pub history: VecDeque<String>,
    pub history_lost: u32,
    pub trace_enabled: bool,
    pub code_offset: u32,
}

impl DebuggerState {
    fn new(trace_enabled: bool, break_on_start: bool) -> Self {
        Self {
            break_now: break_on_start,
            break_on_iret: false,
            last_instruction: None,
            breakpoints: Vec::new(),
            history: VecDeque::new(),
            history_lost: 0,
            trace_enabled,
            code_offset: 0,
        }
    }

    pub fn push_history(&mut self, entry: String) {
        if !self.trace_enabled {
            return;
        }
        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
            self.history_lost += 1;
        }
        self.history.push_back(entry);
    }

    pub fn clear_history(&mut self) {
        self.history_lost += self.history.len() as u32;
        self.history.clear();
    }

    /// Arm a single-step: one more instruction runs, then control returns
    /// to the REPL once `CS:IP` no longer matches `from`.
    pub fn arm_single_step(&mut self, from: (u16, u16)) {
        self.last_instruction = Some(from);
        self.break_now = false;
    }

    /// Called at the top of every step; re-arms `break_now` once the
    /// armed single-step instruction has retired.
    pub fn check_single_step(&mut self, current: (u16, u16)) {
        if let Some(from) = self.last_instruction {
            if current != from {
                self.break_now = true;
                self.last_instruction = None;
            }
        }
    }

    /// Breakpoints match `IP` only, not `CS:IP` — preserved from the
    /// source this is ported from; flagged as a likely bug in §9.
    pub fn hits_breakpoint(&self, ip: u16) -> bool {
        self.breakpoints.contains(&ip)
    }
}

struct OverlayDevice {
    devices: DeviceTable,
    owners: Vec<u16>,
    state: Rc<RefCell<DebuggerState>>,
}

impl MemoryDevice for OverlayDevice {
    fn read_byte(&self, addr: u32) -> u8 {
        let slot = self.owners[(addr as usize) % self.owners.len()];
        self.devices.borrow()[slot as usize].borrow().read_byte(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        let slot = self.owners[(addr as usize) % self.owners.len()];
        let dev: DeviceHandle = Rc::clone(&self.devices.borrow()[slot as usize]);
        dev.borrow_mut().write_byte(addr, value);

        if addr == BIOS_ERROR_BYTE && value != 0 {
            self.state.borrow_mut().break_now = true;
        }
    }
}

/// The debugger peripheral: installs the overlay, then drives an
/// interactive REPL whenever `state.break_now` is set.
///
/// Cheap to clone: a clone shares the same underlying state, so the
/// processor can keep a typed handle for step-time hooks (`poll`,
/// `record_instruction`, `on_iret`) alongside the `Box<dyn Peripheral>`
/// handle it registers for generic lifecycle management.
#[derive(Clone)]
pub struct Debugger {
    state: Rc<RefCell<DebuggerState>>,
    /// Device table plus the pre-overlay owner snapshot, captured once at
    /// install time — the `p` command's source for the installed-device
    /// memory map, since the live bus's owners all point at the overlay.
    installed: Rc<RefCell<Option<(DeviceTable, Vec<u16>)>>>,
}

impl Debugger {
    pub fn new(trace_enabled: bool, break_on_start: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(DebuggerState::new(trace_enabled, break_on_start))),
            installed: Rc::new(RefCell::new(None)),
        }
    }

    pub fn state(&self) -> Rc<RefCell<DebuggerState>> {
        Rc::clone(&self.state)
    }

    /// Contiguous `(start, end, device name)` ranges from the pre-overlay
    /// owner snapshot, in address order. Empty if the overlay isn't
    /// installed yet.
    fn memory_map(&self) -> Vec<(u32, u32, String)> {
        let installed = self.installed.borrow();
        let Some((devices, owners)) = installed.as_ref() else {
            return Vec::new();
        };
        let mut ranges = Vec::new();
        let mut start = 0usize;
        while start < owners.len() {
            let slot = owners[start];
            let mut end = start;
            while end + 1 < owners.len() && owners[end + 1] == slot {
                end += 1;
            }
            if slot != 0 {
                let name = devices.borrow()[slot as usize].borrow().device_name().to_string();
                ranges.push((start as u32, end as u32, name));
            }
            start = end + 1;
        }
        ranges
    }

    /// Format and record one executed instruction, per the
    /// `"[CS-name:IP] opcode-name (opcode-hex)"` convention (§4.7).
    pub fn record_instruction(&self, cs: u16, ip: u16, opcode: u8) {
        let mut state = self.state.borrow_mut();
        if state.trace_enabled {
            let entry = disasm::format_history_entry(cs, ip, opcode);
            state.push_history(entry);
        }
    }

    /// Called at instruction boundaries before fetch (§4.1 step 1):
    /// re-arm single-step, check breakpoints, and run the REPL if armed.
    pub fn poll<R: BufRead, W: Write>(
        &self,
        cs: u16,
        ip: u16,
        registers_dump: impl Fn() -> String,
        memory: &mut impl FnMut(u32, u32) -> Vec<u8>,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            state.check_single_step((cs, ip));
            if state.hits_breakpoint(ip) {
                state.break_now = true;
            }
        }
        if self.state.borrow().break_now {
            self.repl(cs, ip, registers_dump, memory, reader, writer)?;
        }
        Ok(())
    }

    pub fn on_iret(&self) {
        let mut state = self.state.borrow_mut();
        if state.break_on_iret {
            state.break_on_iret = false;
            state.break_now = true;
        }
    }

    fn repl<R: BufRead, W: Write>(
        &self,
        cs: u16,
        ip: u16,
        registers_dump: impl Fn() -> String,
        memory: &mut impl FnMut(u32, u32) -> Vec<u8>,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<()> {
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                return Err(EmuError::DebugQuit);
            }
            let line = line.trim();
            let mut state = self.state.borrow_mut();
            match line.split_once(' ').unwrap_or((line, "")) {
                ("", _) | ("s", _) => {
                    state.arm_single_step((cs, ip));
                    return Ok(());
                }
                ("c", _) => {
                    state.break_now = false;
                    return Ok(());
                }
                ("i", _) => {
                    state.break_on_iret = true;
                    state.break_now = false;
                    return Ok(());
                }
                ("q", _) => return Err(EmuError::DebugQuit),
                ("r", _) => {
                    drop(state);
                    let _ = writeln!(writer, "{}", registers_dump());
                }
                ("t", rest) => {
                    let n: usize = if rest.is_empty() {
                        16
                    } else {
                        rest.trim().parse().unwrap_or(0)
                    };
                    let count = if n == 0 { state.history.len() } else { n.min(state.history.len()) };
                    for entry in state.history.iter().rev().take(count).collect::<Vec<_>>().iter().rev() {
                        let _ = writeln!(writer, "{}", entry);
                    }
                }
                ("ct", _) => {
                    state.clear_history();
                }
                ("@", _) => {
                    let offset = state.code_offset;
                    drop(state);
                    let bytes = memory(crate::addr::Pointer::from_segment_offset(cs, ip).linear(), 1);
                    let opcode = bytes.first().copied().unwrap_or(0);
                    let _ = writeln!(
                        writer,
                        "{:#06x} {} ({:#04x})",
                        (ip as u32).wrapping_sub(offset),
                        disasm::opcode_name(opcode),
                        opcode
                    );
                }
                ("b", rest) if !rest.is_empty() => {
                    if let Ok(off) = u16::from_str_radix(rest.trim().trim_start_matches("0x"), 16) {
                        state.breakpoints.push(off);
                    }
                }
                ("b", _) => {
                    for (i, bp) in state.breakpoints.iter().enumerate() {
                        let _ = writeln!(writer, "{}: {:#06x}", i, bp);
                    }
                }
                ("rb", rest) => {
                    if let Ok(idx) = rest.trim().parse::<usize>() {
                        if idx < state.breakpoints.len() {
                            state.breakpoints.remove(idx);
                        }
                    }
                }
                ("cb", _) => state.breakpoints.clear(),
                ("o", rest) => {
                    if let Ok(off) = u32::from_str_radix(rest.trim().trim_start_matches("0x"), 16) {
                        state.code_offset = off;
                    }
                }
                ("m", rest) => {
                    drop(state);
                    handle_memory_dump(rest, memory, writer);
                }
                ("v", _) => {
                    drop(state);
                    handle_video_dump(memory, writer);
                }
                ("p", _) => {
                    drop(state);
                    let map = self.memory_map();
                    if map.is_empty() {
                        let _ = writeln!(writer, "(no installed devices)");
                    } else {
                        for (start, end, name) in &map {
                            let _ = writeln!(writer, "{:#07x}-{:#07x}: {}", start, end, name);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn handle_memory_dump(rest: &str, memory: &mut impl FnMut(u32, u32) -> Vec<u8>, writer: &mut impl Write) {
    let rest = rest.trim();
    if let Some((from, to)) = rest.split_once(',') {
        if let (Ok(from), Ok(to)) = (
            u32::from_str_radix(from.trim().trim_start_matches("0x"), 16),
            u32::from_str_radix(to.trim().trim_start_matches("0x"), 16),
        ) {
            let bytes = memory(from, to.saturating_sub(from) + 1);
            for (i, chunk) in bytes.chunks(16).enumerate() {
                let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
                let _ = writeln!(writer, "{:#07x}: {}", from as usize + i * 16, hex.join(" "));
            }
        }
    } else if let Ok(addr) = u32::from_str_radix(rest.trim_start_matches("0x"), 16) {
        let byte = memory(addr, 1).first().copied().unwrap_or(0xFF);
        let _ = writeln!(writer, "{:#07x}: {:02x}", addr, byte);
    }
}

/// Trailing magic sequence (§6) that tells a front-end to suppress the line
/// terminator on this write, so a sequence of row writes composes into one
/// rendered frame instead of 25 separate lines.
const LINE_SUPPRESS_MAGIC: &str = "<<<!";

fn handle_video_dump(memory: &mut impl FnMut(u32, u32) -> Vec<u8>, writer: &mut impl Write) {
    let bytes = memory(0xB8000, 80 * 25 * 2);
    for row in 0..25 {
        let mut line = String::with_capacity(80);
        for col in 0..80 {
            let ch = bytes[(row * 80 + col) * 2];
            let printable = if (0x20..0x7F).contains(&ch) { ch as char } else { ' ' };
            line.push(printable);
        }
        let _ = writeln!(writer, "{}{}", line, LINE_SUPPRESS_MAGIC);
    }
}

impl Peripheral for Debugger {
    fn name(&self) -> &'static str {
        "debugger"
    }

    fn install(&mut self, bus: &mut crate::bus::MemoryBus, _io: &mut crate::bus::IoBus) -> Result<()> {
        // Built with an empty delegation table, then patched in place once
        // `install_overlay` hands back the shared device list and the
        // snapshot of prior owners — chicken-and-egg, since the overlay
        // must already be a registered device before the bus can tell it
        // who it is shadowing.
        let concrete = Rc::new(RefCell::new(OverlayDevice {
            devices: Rc::new(RefCell::new(Vec::new())),
            owners: Vec::new(),
            state: Rc::clone(&self.state),
        }));
        let handle: DeviceHandle = concrete.clone();
        let (devices, owners) = bus.install_overlay(handle);
        *self.installed.borrow_mut() = Some((Rc::clone(&devices), owners.clone()));
        {
            let mut overlay = concrete.borrow_mut();
            overlay.devices = devices;
            overlay.owners = owners;
        }
        info!("debugger: overlay installed over full address range");
        Ok(())
    }

    fn reset(&mut self) {
        let mut state = self.state.borrow_mut();
        state.break_on_iret = false;
        state.last_instruction = None;
    }

    fn step(&mut self, _cycles: u32) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{IoBus, MemoryBus};
    use std::io::Cursor;

    fn installed() -> (Debugger, MemoryBus, IoBus) {
        let mut dbg = Debugger::new(true, false);
        let mut bus = MemoryBus::new();
        let mut io = IoBus::new();
        let ram: DeviceHandle = Rc::new(RefCell::new(crate::memory::Ram::new(0x1000)));
        bus.install(ram, 0, 0xFFF).unwrap();
        dbg.install(&mut bus, &mut io).unwrap();
        (dbg, bus, io)
    }

    #[test]
    fn overlay_delegates_reads_and_writes_transparently() {
        let (_dbg, mut bus, _io) = installed();
        bus.write_byte(0x10, 0x42);
        assert_eq!(bus.read_byte(0x10), 0x42);
    }

    #[test]
    fn write_to_bios_error_byte_triggers_break() {
        let (dbg, mut bus, _io) = installed();
        assert!(!dbg.state().borrow().break_now);
        bus.write_byte(BIOS_ERROR_BYTE, 1);
        assert!(dbg.state().borrow().break_now);
    }

    #[test]
    fn single_step_rearms_after_ip_changes() {
        let (dbg, _bus, _io) = installed();
        dbg.state().borrow_mut().arm_single_step((0, 0x100));
        dbg.state().borrow_mut().check_single_step((0, 0x100));
        assert!(!dbg.state().borrow().break_now);
        dbg.state().borrow_mut().check_single_step((0, 0x102));
        assert!(dbg.state().borrow().break_now);
    }

    #[test]
    fn breakpoint_matches_ip_only_not_segment() {
        let (dbg, _bus, _io) = installed();
        dbg.state().borrow_mut().breakpoints.push(0x200);
        assert!(dbg.state().borrow().hits_breakpoint(0x200));
    }

    #[test]
    fn repl_single_step_command_returns_immediately() {
        let (dbg, _bus, mut io) = installed();
        let mut input = Cursor::new(b"s\n".to_vec());
        let mut output = Vec::new();
        dbg.state().borrow_mut().break_now = true;
        let mut mem = |_addr: u32, len: u32| vec![0u8; len as usize];
        dbg.poll(0xF000, 0x0000, || "regs".to_string(), &mut mem, &mut input, &mut output).unwrap();
        assert!(!dbg.state().borrow().break_now);
        let _ = &mut io;
    }

    #[test]
    fn repl_quit_command_returns_debug_quit() {
        let (dbg, _bus, _io) = installed();
        let mut input = Cursor::new(b"q\n".to_vec());
        let mut output = Vec::new();
        dbg.state().borrow_mut().break_now = true;
        let mut mem = |_addr: u32, len: u32| vec![0u8; len as usize];
        let result = dbg.poll(0xF000, 0x0000, || "regs".to_string(), &mut mem, &mut input, &mut output);
        assert!(matches!(result, Err(EmuError::DebugQuit)));
    }

    #[test]
    fn repl_v_command_logs_video_text() {
        let (dbg, _bus, _io) = installed();
        let mut input = Cursor::new(b"v\nc\n".to_vec());
        let mut output = Vec::new();
        dbg.state().borrow_mut().break_now = true;
        let mut mem = |addr: u32, len: u32| {
            let mut v = vec![0x20u8; len as usize];
            if addr == 0xB8000 {
                v[0] = b'A';
            }
            v
        };
        dbg.poll(0xF000, 0x0000, || "regs".to_string(), &mut mem, &mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let first_line = text.lines().next().unwrap();
        assert!(first_line.starts_with('A'));
        assert!(first_line.ends_with(LINE_SUPPRESS_MAGIC));
    }
}
