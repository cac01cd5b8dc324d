use super::*;
use crate::cpu::flags::{CF, DF, IF, OF, SF, ZF};

#[test]
fn mov_reg_imm_and_reg_reg() {
    let mut cpu = boot_cpu();
    load(&mut cpu, 0, &[0xB8, 0x34, 0x12, 0x89, 0xC3]); // MOV AX,0x1234; MOV BX,AX
    step(&mut cpu);
    assert_eq!(cpu.regs.ax, 0x1234);
    step(&mut cpu);
    assert_eq!(cpu.regs.bx, 0x1234);
}

#[test]
fn mov_to_memory_and_back() {
    let mut cpu = boot_cpu();
    // MOV word [0x2000],AX ; MOV BX,[0x2000]
    load(&mut cpu, 0, &[0xB8, 0xEF, 0xBE, 0xA3, 0x00, 0x20, 0x8B, 0x1E, 0x00, 0x20]);
    step(&mut cpu); // MOV AX,0xBEEF
    step(&mut cpu); // MOV [0x2000],AX
    step(&mut cpu); // MOV BX,[0x2000]
    assert_eq!(cpu.regs.bx, 0xBEEF);
}

#[test]
fn add_sets_carry_and_zero() {
    let mut cpu = boot_cpu();
    // MOV AL,0xFF ; ADD AL,0x01
    load(&mut cpu, 0, &[0xB0, 0xFF, 0x04, 0x01]);
    step(&mut cpu);
    step(&mut cpu);
    assert_eq!(cpu.regs.al(), 0);
    assert!(cpu.regs.flag(CF));
    assert!(cpu.regs.flag(ZF));
}

#[test]
fn sub_sets_overflow_on_signed_wraparound() {
    let mut cpu = boot_cpu();
    // MOV AL,0x80 ; SUB AL,0x01  (min negative minus one overflows)
    load(&mut cpu, 0, &[0xB0, 0x80, 0x2C, 0x01]);
    step(&mut cpu);
    step(&mut cpu);
    assert_eq!(cpu.regs.al(), 0x7F);
    assert!(cpu.regs.flag(OF));
}

#[test]
fn inc_dec_do_not_touch_carry() {
    let mut cpu = boot_cpu();
    cpu.regs.set_flag(CF, true);
    // INC AX ; DEC AX
    load(&mut cpu, 0, &[0x40, 0x48]);
    step(&mut cpu);
    assert!(cpu.regs.flag(CF));
    step(&mut cpu);
    assert!(cpu.regs.flag(CF));
    assert_eq!(cpu.regs.ax, 0);
}

#[test]
fn push_pop_round_trips_through_stack() {
    let mut cpu = boot_cpu();
    cpu.regs.bx = 0xCAFE;
    // PUSH BX ; POP CX
    load(&mut cpu, 0, &[0x53, 0x59]);
    let sp_before = cpu.regs.sp;
    step(&mut cpu);
    assert_eq!(cpu.regs.sp, sp_before - 2);
    step(&mut cpu);
    assert_eq!(cpu.regs.cx, 0xCAFE);
    assert_eq!(cpu.regs.sp, sp_before);
}

#[test]
fn xchg_swaps_registers() {
    let mut cpu = boot_cpu();
    cpu.regs.ax = 0x1111;
    cpu.regs.dx = 0x2222;
    load(&mut cpu, 0, &[0x92]); // XCHG AX,DX
    step(&mut cpu);
    assert_eq!(cpu.regs.ax, 0x2222);
    assert_eq!(cpu.regs.dx, 0x1111);
}

#[test]
fn lea_loads_offset_not_value() {
    let mut cpu = boot_cpu();
    cpu.regs.bx = 0x1000;
    cpu.regs.si = 0x0004;
    load(&mut cpu, 0, &[0x8D, 0x00]); // LEA AX,[BX+SI]
    step(&mut cpu);
    assert_eq!(cpu.regs.ax, 0x1004);
}

#[test]
fn rep_movsb_copies_cx_bytes_and_clears_cx() {
    let mut cpu = boot_cpu();
    cpu.regs.si = 0x2000;
    cpu.regs.di = 0x3000;
    cpu.regs.cx = 4;
    for i in 0..4u32 {
        cpu.write_byte(0x2000 + i, 0xA0 + i as u8);
    }
    load(&mut cpu, 0, &[0xF3, 0xA4]); // REP MOVSB
    step(&mut cpu);
    assert_eq!(cpu.regs.cx, 0);
    for i in 0..4u32 {
        assert_eq!(cpu.read_byte(0x3000 + i), 0xA0 + i as u8);
    }
    assert_eq!(cpu.regs.si, 0x2004);
    assert_eq!(cpu.regs.di, 0x3004);
}

#[test]
fn rep_movsb_honors_direction_flag() {
    let mut cpu = boot_cpu();
    cpu.regs.set_flag(DF, true);
    cpu.regs.si = 0x2003;
    cpu.regs.di = 0x3003;
    cpu.regs.cx = 4;
    for i in 0..4u32 {
        cpu.write_byte(0x2000 + i, 0x10 + i as u8);
    }
    load(&mut cpu, 0, &[0xF3, 0xA4]);
    step(&mut cpu);
    assert_eq!(cpu.regs.si, 0x2003u16.wrapping_sub(4));
    for i in 0..4u32 {
        assert_eq!(cpu.read_byte(0x3000 + i), 0x10 + i as u8);
    }
}

#[test]
fn repne_scasb_stops_on_match() {
    let mut cpu = boot_cpu();
    cpu.regs.di = 0x4000;
    cpu.regs.cx = 5;
    cpu.regs.set_al(0x42);
    for i in 0..5u32 {
        cpu.write_byte(0x4000 + i, if i == 2 { 0x42 } else { 0x00 });
    }
    load(&mut cpu, 0, &[0xF2, 0xAE]); // REPNE SCASB
    step(&mut cpu);
    assert!(cpu.regs.flag(ZF));
    assert_eq!(cpu.regs.cx, 2); // 5 - 3 iterations consumed
    assert_eq!(cpu.regs.di, 0x4003);
}

#[test]
fn conditional_jump_taken_and_not_taken() {
    let mut cpu = boot_cpu();
    // CMP AL,AL (always equal) ; JE +3 ; MOV BX,1 ; MOV CX,2
    load(&mut cpu, 0, &[0x38, 0xC0, 0x74, 0x03, 0xBB, 0x01, 0x00, 0xB9, 0x02, 0x00]);
    step(&mut cpu); // CMP
    step(&mut cpu); // JE, taken, skips MOV BX
    step(&mut cpu); // MOV CX,2
    assert_eq!(cpu.regs.cx, 2);
    assert_eq!(cpu.regs.bx, 0);
}

#[test]
fn loop_decrements_cx_and_branches_until_zero() {
    let mut cpu = boot_cpu();
    cpu.regs.cx = 3;
    load(&mut cpu, 0, &[0xE2, 0xFE]); // LOOP $-2 (rel = -2)
    step(&mut cpu);
    assert_eq!(cpu.regs.cx, 2);
    assert_eq!(cpu.regs.ip, 0);
    step(&mut cpu);
    assert_eq!(cpu.regs.cx, 1);
    step(&mut cpu);
    assert_eq!(cpu.regs.cx, 0);
    assert_eq!(cpu.regs.ip, 2); // falls through once CX hits zero
}

#[test]
fn call_near_then_ret_restores_ip() {
    let mut cpu = boot_cpu();
    load(&mut cpu, 0, &[0xE8, 0x00, 0x00, 0xC3]); // CALL rel16=0 -> falls through to RET
    step(&mut cpu); // CALL pushes return IP (3), jumps to IP=3
    assert_eq!(cpu.regs.ip, 3);
    step(&mut cpu); // RET pops back to 3
    assert_eq!(cpu.regs.ip, 3);
}

#[test]
fn call_far_pushes_cs_and_ip_ret_far_restores_both() {
    let mut cpu = boot_cpu();
    cpu.regs.cs = 0x1000;
    cpu.regs.ip = 0;
    // at CS:0 : CALL FAR 0x2000:0x0010
    load(&mut cpu, Pointer::from_segment_offset(0x1000, 0).linear(), &[0x9A, 0x10, 0x00, 0x00, 0x20]);
    load(&mut cpu, Pointer::from_segment_offset(0x2000, 0x10).linear(), &[0xCB]); // RETF
    step(&mut cpu);
    assert_eq!(cpu.regs.cs, 0x2000);
    assert_eq!(cpu.regs.ip, 0x10);
    step(&mut cpu);
    assert_eq!(cpu.regs.cs, 0x1000);
    assert_eq!(cpu.regs.ip, 5);
}

#[test]
fn software_interrupt_vectors_through_ivt() {
    let mut cpu = boot_cpu();
    // IVT slot for vector 0x21: CS:IP = 0x3000:0x0050
    cpu.write_word(0x21 * 4, 0x0050);
    cpu.write_word(0x21 * 4 + 2, 0x3000);
    load(&mut cpu, 0, &[0xCD, 0x21]); // INT 0x21
    step(&mut cpu);
    assert_eq!(cpu.regs.cs, 0x3000);
    assert_eq!(cpu.regs.ip, 0x0050);
}

#[test]
fn iret_restores_flags_last_and_reenables_interrupts() {
    let mut cpu = boot_cpu();
    cpu.regs.set_flag(IF, true);
    cpu.write_word(0x10 * 4, 0x0100);
    cpu.write_word(0x10 * 4 + 2, 0x4000);
    load(&mut cpu, 0, &[0xCD, 0x10]); // INT 0x10
    step(&mut cpu);
    assert!(!cpu.regs.flag(IF)); // cleared on entry
    assert_eq!(cpu.regs.cs, 0x4000);
    assert_eq!(cpu.regs.ip, 0x0100);
    load(&mut cpu, Pointer::from_segment_offset(0x4000, 0x0100).linear(), &[0xCF]); // IRET
    step(&mut cpu);
    assert!(cpu.regs.flag(IF)); // restored from the pushed flags word
    assert_eq!(cpu.regs.cs, 0);
    assert_eq!(cpu.regs.ip, 2); // return address pushed by INT
}

#[test]
fn divide_by_zero_raises_interrupt_zero() {
    let mut cpu = boot_cpu();
    cpu.write_word(0, 0x0200);
    cpu.write_word(2, 0x5000);
    cpu.regs.ax = 10;
    cpu.regs.cx = 0;
    load(&mut cpu, 0x10, &[0xF7, 0xF1]); // DIV CX
    cpu.regs.ip = 0x10;
    step(&mut cpu);
    assert_eq!(cpu.regs.cs, 0x5000);
    assert_eq!(cpu.regs.ip, 0x0200);
}

#[test]
fn mul_sets_carry_and_overflow_on_high_half_nonzero() {
    let mut cpu = boot_cpu();
    cpu.regs.set_al(0x10);
    cpu.regs.bx = 0x10;
    load(&mut cpu, 0, &[0xF6, 0xE3]); // MUL BL
    step(&mut cpu);
    assert_eq!(cpu.regs.ax, 0x0100);
    assert!(cpu.regs.flag(CF));
}

#[test]
fn flag_instructions_set_and_clear() {
    let mut cpu = boot_cpu();
    load(&mut cpu, 0, &[0xF9, 0xF8, 0xFD, 0xFC, 0xFB, 0xFA]); // STC;CLC;STD;CLD;STI;CLI
    step(&mut cpu);
    assert!(cpu.regs.flag(CF));
    step(&mut cpu);
    assert!(!cpu.regs.flag(CF));
    step(&mut cpu);
    assert!(cpu.regs.flag(DF));
    step(&mut cpu);
    assert!(!cpu.regs.flag(DF));
    step(&mut cpu);
    assert!(cpu.regs.flag(IF));
    step(&mut cpu);
    assert!(!cpu.regs.flag(IF));
}

#[test]
fn lahf_sahf_move_low_flags_byte() {
    let mut cpu = boot_cpu();
    cpu.regs.set_flag(SF, true);
    cpu.regs.set_flag(CF, true);
    load(&mut cpu, 0, &[0x9F]); // LAHF
    step(&mut cpu);
    let ah = cpu.regs.ah();
    cpu.regs.set_flag(SF, false);
    cpu.regs.set_flag(CF, false);
    cpu.regs.set_ah(ah);
    load(&mut cpu, cpu.regs.ip as u32, &[0x9E]); // SAHF
    step(&mut cpu);
    assert!(cpu.regs.flag(SF));
    assert!(cpu.regs.flag(CF));
}

#[test]
fn pushf_popf_round_trip_flags_word() {
    let mut cpu = boot_cpu();
    cpu.regs.set_flag(OF, true);
    cpu.regs.set_flag(ZF, true);
    let saved = cpu.regs.flags;
    load(&mut cpu, 0, &[0x9C, 0x9D]); // PUSHF; POPF
    step(&mut cpu);
    cpu.regs.flags = flags::sanitize(0); // scramble before popping back
    step(&mut cpu);
    assert_eq!(cpu.regs.flags, saved);
}

#[test]
fn shift_left_sets_carry_from_vacated_bit() {
    let mut cpu = boot_cpu();
    cpu.regs.set_al(0x81);
    load(&mut cpu, 0, &[0xD0, 0xE0]); // SHL AL,1
    step(&mut cpu);
    assert_eq!(cpu.regs.al(), 0x02);
    assert!(cpu.regs.flag(CF));
}

#[test]
fn rotate_through_carry_is_deterministic_across_runs() {
    let mut cpu = boot_cpu();
    cpu.regs.set_al(0b1000_0000);
    cpu.regs.set_flag(CF, false);
    cpu.regs.set_cl(2);
    load(&mut cpu, 0, &[0xD2, 0xD0]); // RCL AL,CL
    step(&mut cpu);
    let first = cpu.regs.al();
    let first_cf = cpu.regs.flag(CF);

    let mut cpu2 = boot_cpu();
    cpu2.regs.set_al(0b1000_0000);
    cpu2.regs.set_flag(CF, false);
    cpu2.regs.set_cl(2);
    load(&mut cpu2, 0, &[0xD2, 0xD0]);
    step(&mut cpu2);
    assert_eq!(cpu2.regs.al(), first);
    assert_eq!(cpu2.regs.flag(CF), first_cf);
}

#[test]
fn rotate_leaves_sign_zero_parity_untouched() {
    let mut cpu = boot_cpu();
    cpu.regs.set_al(0x01); // rotates to 0x00, which would set ZF/PF if SZP were recomputed
    cpu.regs.set_flag(ZF, false);
    cpu.regs.set_flag(SF, true);
    cpu.regs.set_flag(CF, false);
    let saved_zf = cpu.regs.flag(ZF);
    let saved_sf = cpu.regs.flag(SF);
    load(&mut cpu, 0, &[0xD0, 0xC8]); // ROR AL,1 -> AL becomes 0x80
    step(&mut cpu);
    assert_eq!(cpu.regs.al(), 0x80);
    assert!(cpu.regs.flag(CF)); // bit rotated out of bit 0
    assert_eq!(cpu.regs.flag(ZF), saved_zf);
    assert_eq!(cpu.regs.flag(SF), saved_sf);
}

#[test]
fn xlat_indexes_table_with_al() {
    let mut cpu = boot_cpu();
    cpu.regs.bx = 0x5000;
    cpu.regs.set_al(3);
    cpu.write_byte(0x5003, 0x77);
    load(&mut cpu, 0, &[0xD7]); // XLAT
    step(&mut cpu);
    assert_eq!(cpu.regs.al(), 0x77);
}

#[test]
fn aam_splits_al_into_ah_quotient_and_al_remainder() {
    let mut cpu = boot_cpu();
    cpu.regs.set_al(23);
    load(&mut cpu, 0, &[0xD4, 0x0A]); // AAM base 10
    step(&mut cpu);
    assert_eq!(cpu.regs.ah(), 2);
    assert_eq!(cpu.regs.al(), 3);
}

#[test]
fn daa_adjusts_packed_bcd_after_add() {
    // 0x19 + 0x01 = 0x1A in binary; DAA corrects to BCD 0x20.
    let mut cpu = boot_cpu();
    cpu.regs.set_al(0x19);
    load(&mut cpu, 0, &[0x04, 0x01, 0x27]); // ADD AL,1 ; DAA
    step(&mut cpu);
    step(&mut cpu);
    assert_eq!(cpu.regs.al(), 0x20);
}
