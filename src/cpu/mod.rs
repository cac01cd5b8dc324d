//! 8088/V20-class processor core.
//!
//! # Module organization
//!
//! - `flags`: FLAGS register bit constants and the canonical add/sub/logic
//!   flag-update rules.
//! - `helpers`: register access, ModR/M decode and effective-address
//!   computation, stack push/pop, and operand read/write.
//! - `execute`: the opcode dispatch table and per-instruction semantics.
//!
//! # Registers
//!
//! `AX`/`BX`/`CX`/`DX` are stored as plain `u16`s; the low/high byte
//! accessors compute the alias rather than overlaying a union, so "writing
//! the word mutates both halves" holds by construction instead of by
//! `unsafe` trickery.

mod execute;
pub mod flags;
mod helpers;

#[cfg(test)]
mod tests;

use crate::addr::Pointer;
use crate::bus::{DeviceHandle, IoBus, IoHandle, MemoryBus};
use crate::error::{EmuError, Result};
use crate::peripherals::{Debugger, Peripheral};
use crate::pic::Pic;
use log::warn;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

/// Which segment register an instruction's memory operand uses, decided at
/// decode time (§9: a local variable, never hidden state on `Registers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Es,
    Cs,
    Ss,
    Ds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepKind {
    Rep,
    Repe,
    Repne,
}

/// A software-interrupt handler installed ahead of the IVT for a given
/// vector. Takes the pieces of processor state a DOS-level shim needs
/// rather than the whole `Processor`, so installers never have to solve
/// the self-referential-handle problem `Peripheral` avoids the same way.
pub trait InterruptHandler {
    fn handle(&mut self, regs: &mut Registers, bus: &mut MemoryBus, io: &mut IoBus);
}

type HandlerHandle = Rc<RefCell<dyn InterruptHandler>>;

/// The architectural 8088 register file.
#[derive(Debug, Clone, Copy)]
pub struct Registers {
    pub ax: u16,
    pub bx: u16,
    pub cx: u16,
    pub dx: u16,
    pub si: u16,
    pub di: u16,
    pub bp: u16,
    pub sp: u16,
    pub cs: u16,
    pub ds: u16,
    pub es: u16,
    pub ss: u16,
    pub ip: u16,
    pub flags: u16,
}

impl Registers {
    /// Reset vector state: `CS:IP = F000:FFF0`, as on a real PC/XT.
    pub fn new() -> Self {
        Self {
            ax: 0,
            bx: 0,
            cx: 0,
            dx: 0,
            si: 0,
            di: 0,
            bp: 0,
            sp: 0,
            cs: 0xF000,
            ds: 0,
            es: 0,
            ss: 0,
            ip: 0xFFF0,
            flags: flags::sanitize(0),
        }
    }

    pub fn al(&self) -> u8 {
        self.ax as u8
    }
    pub fn ah(&self) -> u8 {
        (self.ax >> 8) as u8
    }
    pub fn set_al(&mut self, v: u8) {
        self.ax = (self.ax & 0xFF00) | v as u16;
    }
    pub fn set_ah(&mut self, v: u8) {
        self.ax = (self.ax & 0x00FF) | ((v as u16) << 8);
    }
    pub fn bl(&self) -> u8 {
        self.bx as u8
    }
    pub fn bh(&self) -> u8 {
        (self.bx >> 8) as u8
    }
    pub fn set_bl(&mut self, v: u8) {
        self.bx = (self.bx & 0xFF00) | v as u16;
    }
    pub fn set_bh(&mut self, v: u8) {
        self.bx = (self.bx & 0x00FF) | ((v as u16) << 8);
    }
    pub fn cl(&self) -> u8 {
        self.cx as u8
    }
    pub fn ch(&self) -> u8 {
        (self.cx >> 8) as u8
    }
    pub fn set_cl(&mut self, v: u8) {
        self.cx = (self.cx & 0xFF00) | v as u16;
    }
    pub fn set_ch(&mut self, v: u8) {
        self.cx = (self.cx & 0x00FF) | ((v as u16) << 8);
    }
    pub fn dl(&self) -> u8 {
        self.dx as u8
    }
    pub fn dh(&self) -> u8 {
        (self.dx >> 8) as u8
    }
    pub fn set_dl(&mut self, v: u8) {
        self.dx = (self.dx & 0xFF00) | v as u16;
    }
    pub fn set_dh(&mut self, v: u8) {
        self.dx = (self.dx & 0x00FF) | ((v as u16) << 8);
    }

    pub fn flag(&self, mask: u16) -> bool {
        self.flags & mask != 0
    }

    pub fn set_flag(&mut self, mask: u16, value: bool) {
        if value {
            self.flags |= mask;
        } else {
            self.flags &= !mask;
        }
        self.flags = flags::sanitize(self.flags);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters surfaced by `get_stats`, reset along with everything else on
/// `reset()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub instructions_executed: u64,
    pub cycles: u64,
}

/// Outcome of a single `step()`, beyond the cycle count already returned
/// via `Result`'s `Ok` arm (kept as a plain integer rather than a struct
/// since the driver only ever needs the number).
pub type StepCycles = u32;

/// The processor: registers, the two bus tables it owns, the interrupt
/// controller, every installed peripheral, and the (optional) debugger
/// overlay it polls at each instruction boundary.
pub struct Processor {
    pub regs: Registers,
    bus: MemoryBus,
    io: IoBus,
    pic: Rc<RefCell<Pic>>,
    peripherals: Vec<Box<dyn Peripheral>>,
    debugger: Option<Debugger>,
    interrupt_handlers: HashMap<u8, HandlerHandle>,
    v20_support: bool,
    halted: bool,
    stats: Stats,
}

const PIC_COMMAND_PORT: u16 = 0x20;
const PIC_DATA_PORT: u16 = 0x21;

impl Processor {
    pub fn new() -> Self {
        let mut io = IoBus::new();
        let pic = Rc::new(RefCell::new(Pic::new()));
        let pic_handle: IoHandle = Rc::clone(&pic) as IoHandle;
        io.install(pic_handle, PIC_COMMAND_PORT, PIC_DATA_PORT)
            .expect("PIC port range is claimed exactly once at construction");

        Self {
            regs: Registers::new(),
            bus: MemoryBus::new(),
            io,
            pic,
            peripherals: Vec::new(),
            debugger: None,
            interrupt_handlers: HashMap::new(),
            v20_support: false,
            halted: false,
            stats: Stats::default(),
        }
    }

    pub fn install_memory_device(&mut self, device: DeviceHandle, start: u32, end: u32) -> Result<()> {
        self.bus.install(device, start, end)
    }

    pub fn install_io_device(&mut self, device: IoHandle, start: u16, end: u16) -> Result<()> {
        self.io.install(device, start, end)
    }

    pub fn install_interrupt_handler(&mut self, vector: u8, handler: HandlerHandle) {
        self.interrupt_handlers.insert(vector, handler);
    }

    /// Install a peripheral: runs its `install` hook against this
    /// processor's buses, then keeps it for `reset`/`step`/`close`. The
    /// debugger must be installed last (§4.2, §4.7) so its shadow table
    /// captures every other device's prior ownership; this is the caller's
    /// responsibility, not enforced here.
    pub fn install_peripheral(&mut self, mut peripheral: Box<dyn Peripheral>) -> Result<()> {
        peripheral.install(&mut self.bus, &mut self.io)?;
        self.peripherals.push(peripheral);
        Ok(())
    }

    /// Install the debugger specifically, keeping a typed clone for the
    /// per-instruction `poll`/`record_instruction`/`on_iret` hooks alongside
    /// the generic `Peripheral` handle.
    pub fn install_debugger(&mut self, mut debugger: Debugger) -> Result<()> {
        debugger.install(&mut self.bus, &mut self.io)?;
        self.debugger = Some(debugger.clone());
        self.peripherals.push(Box::new(debugger));
        Ok(())
    }

    pub fn set_v20_support(&mut self, enabled: bool) {
        self.v20_support = enabled;
    }

    pub fn v20_support(&self) -> bool {
        self.v20_support
    }

    pub fn reset(&mut self) {
        self.regs = Registers::new();
        self.halted = false;
        self.stats = Stats::default();
        self.pic.borrow_mut().reset();
        for peripheral in &mut self.peripherals {
            peripheral.reset();
        }
    }

    pub fn close(&mut self) {
        for peripheral in &mut self.peripherals {
            peripheral.close();
        }
    }

    pub fn read_byte(&self, addr: u32) -> u8 {
        self.bus.read_byte(addr)
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        self.bus.write_byte(addr, value);
    }

    pub fn read_word(&self, addr: u32) -> u16 {
        self.bus.read_word(addr)
    }

    pub fn write_word(&mut self, addr: u32, value: u16) {
        self.bus.write_word(addr, value);
    }

    pub fn get_registers(&self) -> Registers {
        self.regs
    }

    pub fn get_stats(&self) -> Stats {
        self.stats
    }

    pub fn get_mapped_memory_device(&self, addr: u32) -> DeviceHandle {
        self.bus.device_at(addr)
    }

    pub fn raise_irq(&self, irq: u8) {
        self.pic.borrow_mut().raise(irq);
    }

    fn format_registers(&self) -> String {
        let r = &self.regs;
        format!(
            "AX={:04x} BX={:04x} CX={:04x} DX={:04x} SI={:04x} DI={:04x} BP={:04x} SP={:04x}\n\
             CS={:04x} DS={:04x} ES={:04x} SS={:04x} IP={:04x} FLAGS={:04x}",
            r.ax, r.bx, r.cx, r.dx, r.si, r.di, r.bp, r.sp, r.cs, r.ds, r.es, r.ss, r.ip, r.flags
        )
    }

    fn poll_debugger(&mut self) -> Result<()> {
        let dbg = match &self.debugger {
            Some(d) => d.clone(),
            None => return Ok(()),
        };
        let dump = self.format_registers();
        let cs = self.regs.cs;
        let ip = self.regs.ip;
        let bus = &self.bus;
        let mut mem_fn = move |addr: u32, len: u32| (0..len).map(|i| bus.read_byte(addr.wrapping_add(i))).collect::<Vec<u8>>();
        let stdin = io::stdin();
        let mut reader = stdin.lock();
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        dbg.poll(cs, ip, move || dump.clone(), &mut mem_fn, &mut reader, &mut writer)
    }

    /// Acknowledge at most one pending, unmasked IRQ before fetch, per
    /// §4.1 step 2: push flags, clear IF/TF, push CS:IP, load CS:IP from
    /// the IVT slot `vector*4`, clear the halted sub-state.
    fn deliver_pending_interrupt(&mut self) {
        if !self.regs.flag(flags::IF) {
            return;
        }
        let pending = self.pic.borrow().next_pending();
        let Some(irq) = pending else { return };
        let vector = self.pic.borrow_mut().ack(irq);
        self.dispatch_interrupt(vector, true);
        self.halted = false;
    }

    /// Vector through the IVT: push flags, clear IF/TF, push CS:IP, load
    /// new CS:IP from `vector*4`. Shared by hardware IRQ delivery and
    /// software `INT n` (§4.1 step 5).
    fn dispatch_interrupt(&mut self, vector: u8, _hardware: bool) {
        let flags = self.regs.flags;
        helpers::push_word(self, flags);
        self.regs.set_flag(flags::IF, false);
        self.regs.set_flag(flags::TF, false);
        helpers::push_word(self, self.regs.cs);
        helpers::push_word(self, self.regs.ip);
        let ivt_addr = (vector as u32) * 4;
        self.regs.ip = self.bus.read_word(ivt_addr);
        self.regs.cs = self.bus.read_word(ivt_addr + 2);
    }

    /// Software `INT n`: if a handler is registered, call it directly and
    /// return without touching CS:IP/stack (§4.1 "software interrupt
    /// interception"); otherwise vector through the IVT normally.
    pub(crate) fn software_interrupt(&mut self, vector: u8) {
        if let Some(handler) = self.interrupt_handlers.get(&vector).cloned() {
            handler.borrow_mut().handle(&mut self.regs, &mut self.bus, &mut self.io);
            return;
        }
        self.dispatch_interrupt(vector, false);
    }

    /// Advance by exactly one instruction.
    ///
    /// Returns the instruction's cycle cost on success; `Err(CpuHalt)` once
    /// `HLT` has executed with `IF` clear and no pending IRQ;
    /// `Err(InvalidOpcode)` on an undecodable byte; `Err(DebugQuit)` if the
    /// debugger REPL received `q`.
    pub fn step(&mut self) -> Result<StepCycles> {
        self.poll_debugger()?;

        self.deliver_pending_interrupt();

        if self.halted {
            // Halted with IF=1: idle, waiting for deliver_pending_interrupt
            // to wake us on a later step. Costs a nominal idle cycle.
            self.advance_peripherals(2);
            return Ok(2);
        }

        let cs_at_fetch = self.regs.cs;
        let ip_at_fetch = self.regs.ip;

        let mut seg_override: Option<Segment> = None;
        let mut rep: Option<RepKind> = None;
        let mut opcode = helpers::fetch_byte(self);
        loop {
            match opcode {
                0x26 => seg_override = Some(Segment::Es),
                0x2E => seg_override = Some(Segment::Cs),
                0x36 => seg_override = Some(Segment::Ss),
                0x3E => seg_override = Some(Segment::Ds),
                0xF0 => {} // LOCK: no multi-CPU contention to model; accepted and ignored.
                0xF2 => rep = Some(RepKind::Repne),
                0xF3 => rep = Some(RepKind::Repe),
                _ => break,
            }
            opcode = helpers::fetch_byte(self);
        }

        if let Some(dbg) = &self.debugger {
            dbg.record_instruction(cs_at_fetch, ip_at_fetch, opcode);
        }

        let cycles = execute::execute(self, opcode, seg_override, rep)?;

        if opcode == 0xCF {
            if let Some(dbg) = &self.debugger {
                dbg.on_iret();
            }
        }

        self.stats.instructions_executed += 1;
        self.stats.cycles += cycles as u64;
        self.advance_peripherals(cycles);
        Ok(cycles)
    }

    /// Step every installed peripheral by the cycle count of the
    /// instruction just executed (§4.5, §4.8). A peripheral's step failure
    /// is a `DeviceIoError` — logged and otherwise ignored, per §7: the
    /// guest instruction that triggered it has already completed.
    fn advance_peripherals(&mut self, cycles: u32) {
        for peripheral in &mut self.peripherals {
            if let Err(e) = peripheral.step(cycles) {
                warn!("{}: step error: {}", peripheral.name(), e);
            }
        }
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}
