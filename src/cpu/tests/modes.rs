use super::*;
use crate::cpu::flags::IF;

#[test]
fn segment_override_prefix_redirects_default_segment() {
    let mut cpu = boot_cpu();
    cpu.regs.es = 0x1000;
    cpu.regs.bx = 0x0010;
    cpu.write_byte(Pointer::from_segment_offset(0x1000, 0x0010).linear(), 0x5A);
    // ES: MOV AL,[BX]  (without the override this would read DS:[BX])
    load(&mut cpu, 0, &[0x26, 0x8A, 0x07]);
    step(&mut cpu);
    assert_eq!(cpu.regs.al(), 0x5A);
}

#[test]
fn lock_prefix_is_accepted_and_ignored() {
    let mut cpu = boot_cpu();
    load(&mut cpu, 0, &[0xF0, 0xB0, 0x09]); // LOCK ; MOV AL,9
    step(&mut cpu);
    assert_eq!(cpu.regs.al(), 9);
}

#[test]
fn hlt_with_interrupts_enabled_idles_until_irq() {
    let mut cpu = boot_cpu();
    cpu.regs.set_flag(IF, true);
    cpu.write_word(0x08 * 4, 0x0300);
    cpu.write_word(0x08 * 4 + 2, 0x6000);
    load(&mut cpu, 0, &[0xF4]); // HLT
    let cycles = step(&mut cpu);
    assert_eq!(cycles, 2);
    assert_eq!(cpu.regs.ip, 1); // did not re-fetch HLT
    let cycles = step(&mut cpu);
    assert_eq!(cycles, 2); // still idling, no pending IRQ yet

    cpu.raise_irq(0);
    step(&mut cpu); // this step's deliver_pending_interrupt wakes it up
    assert_eq!(cpu.regs.cs, 0x6000);
    assert_eq!(cpu.regs.ip, 0x0300);
}

#[test]
fn hlt_with_interrupts_disabled_is_a_terminal_error() {
    let mut cpu = boot_cpu();
    cpu.regs.set_flag(IF, false);
    load(&mut cpu, 0, &[0xF4]); // HLT
    let err = cpu.step().unwrap_err();
    assert_eq!(err, EmuError::CpuHalt);
}

#[test]
fn v20_mode_treats_0f_as_prefix_sentinel_not_pop_cs() {
    let mut cpu = boot_cpu();
    cpu.set_v20_support(true);
    cpu.regs.ss = 0;
    cpu.regs.sp = 0x1000;
    cpu.write_word(Pointer::from_segment_offset(0, 0x1000).linear(), 0xBEEF);
    let cs_before = cpu.regs.cs;
    load(&mut cpu, 0, &[0x0F, 0x00]); // sentinel byte, one throwaway extension byte
    step(&mut cpu);
    assert_eq!(cpu.regs.cs, cs_before); // not popped, unlike plain 8086 POP CS
    assert_eq!(cpu.regs.sp, 0x1000); // stack untouched
}

#[test]
fn without_v20_0f_pops_cs_like_undocumented_8086_behavior() {
    let mut cpu = boot_cpu();
    cpu.regs.ss = 0;
    cpu.regs.sp = 0x1000;
    cpu.write_word(Pointer::from_segment_offset(0, 0x1000).linear(), 0x9999);
    load(&mut cpu, 0, &[0x0F]);
    step(&mut cpu);
    assert_eq!(cpu.regs.cs, 0x9999);
    assert_eq!(cpu.regs.sp, 0x1002);
}
