//! Thin orchestrator assembling a `Processor` with the standard peripheral
//! set from an `EmuConfig`: conventional RAM, an optional ROM image, the CGA
//! video adapter, and (when requested) the debugger overlay installed last
//! so its shadow table captures every other device (§4.2).

use crate::bus::DeviceHandle;
use crate::config::EmuConfig;
use crate::cpu::{Processor, StepCycles};
use crate::error::Result;
use crate::memory::{Ram, Rom};
use crate::peripherals::cga::{Cga, HostSurface};
use crate::peripherals::Debugger;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Conventional memory size below the CGA/BIOS reservation: 640 KiB.
pub const CONVENTIONAL_RAM_SIZE: usize = 0xA_0000;
/// Base linear address a ROM image is installed at (`F000:0000`), matching
/// the processor's power-on `CS:IP`.
pub const ROM_BASE: u32 = 0xF_0000;

/// Assembles a processor, its RAM, its CGA adapter, and (optionally) its
/// debugger overlay from one `EmuConfig`, in install order.
pub struct Emu {
    processor: Processor,
}

impl Emu {
    /// Install RAM and the CGA adapter, then the debugger overlay last if
    /// `config.debug` is set, then reset once (§4.8: "reset is invoked once
    /// after install").
    pub fn new(config: EmuConfig, host: Arc<dyn HostSurface>) -> Result<Self> {
        let mut processor = Processor::new();
        processor.set_v20_support(config.v20);

        let ram: DeviceHandle = Rc::new(RefCell::new(Ram::new(CONVENTIONAL_RAM_SIZE)));
        processor.install_memory_device(ram, 0, CONVENTIONAL_RAM_SIZE as u32 - 1)?;

        processor.install_peripheral(Box::new(Cga::new(host)))?;

        if config.debug {
            processor.install_debugger(Debugger::new(config.trace, config.break_on_start))?;
        }

        processor.reset();
        Ok(Self { processor })
    }

    /// Install a ROM image at `ROM_BASE`, sized to the data given.
    pub fn load_rom(&mut self, data: Vec<u8>) -> Result<()> {
        let end = ROM_BASE + data.len().max(1) as u32 - 1;
        let rom: DeviceHandle = Rc::new(RefCell::new(Rom::new(ROM_BASE, data)));
        self.processor.install_memory_device(rom, ROM_BASE, end)
    }

    pub fn reset(&mut self) {
        self.processor.reset();
    }

    pub fn step(&mut self) -> Result<StepCycles> {
        self.processor.step()
    }

    pub fn close(&mut self) {
        self.processor.close();
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut Processor {
        &mut self.processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSurface;
    impl HostSurface for NullSurface {
        fn render_graphics(&self, _pixels: &[u8], _bg: (u8, u8, u8)) {}
        fn render_text(&self, _cells: &[(u8, u8)], _blink_enabled: bool, _bg_index: u8, _cursor: Option<(u8, u8)>) {}
        fn set_title(&self, _title: &str) {}
    }

    #[test]
    fn new_installs_ram_and_resets_to_power_on_vector() {
        let emu = Emu::new(EmuConfig::default(), Arc::new(NullSurface)).unwrap();
        let regs = emu.processor().get_registers();
        assert_eq!(regs.cs, 0xF000);
        assert_eq!(regs.ip, 0xFFF0);
    }

    #[test]
    fn load_rom_is_readable_at_reset_vector() {
        let mut emu = Emu::new(EmuConfig::default(), Arc::new(NullSurface)).unwrap();
        let mut rom = vec![0x90u8; 0x10000];
        rom[0xFFF0] = 0xF4; // HLT
        emu.load_rom(rom).unwrap();
        assert_eq!(emu.processor().read_byte(0xFFFF0), 0xF4);
    }

    #[test]
    fn debug_config_installs_debugger_overlay() {
        let config = EmuConfig { debug: true, ..EmuConfig::default() };
        let emu = Emu::new(config, Arc::new(NullSurface)).unwrap();
        // The overlay becomes the owner of every byte once installed.
        let _ = emu.processor().get_mapped_memory_device(0);
    }
}
