//! Opcode dispatch and per-instruction semantics for the 8088/V20 core.
//!
//! Organized as one dispatch `match` over the first (post-prefix) opcode
//! byte plus a handful of shared helpers for the ALU/shift/group
//! instructions that repeat the same operation across many opcodes.

use super::flags::{self, AF, CF, DF, IF, OF, PF, SF, ZF};
use super::helpers::{self, ModRm};
use super::{Processor, RepKind, Segment};
use crate::error::{EmuError, Result};

/// Cost charged for a register-only ALU instruction. Memory operands add
/// `MEM_PENALTY`. These are approximate (§1 non-goals: no cycle-exact bus
/// timing), chosen to be in the right ballpark relative to each other.
const BASE_COST: u32 = 3;
const MEM_PENALTY: u32 = 5;
const JUMP_TAKEN_COST: u32 = 16;
const JUMP_NOT_TAKEN_COST: u32 = 4;

pub fn execute(cpu: &mut Processor, opcode: u8, seg: Option<Segment>, rep: Option<RepKind>) -> Result<u32> {
    match opcode {
        0x00..=0x3D if is_alu_opcode(opcode) => execute_alu_group(cpu, opcode, seg),

        0x06 => { push_sreg(cpu, 0); Ok(BASE_COST) }
        0x07 => { pop_sreg(cpu, 0); Ok(BASE_COST) }
        0x0E => { push_sreg(cpu, 1); Ok(BASE_COST) }
        0x0F => {
            if cpu.v20_support() {
                // NEC V20 two-byte extended opcode sentinel: documented test
                // ROMs only rely on this byte not being misdecoded as the
                // undocumented 8086 `POP CS`; the extended table itself is
                // a non-goal beyond that.
                let _ext = helpers::fetch_byte(cpu);
            } else {
                pop_sreg(cpu, 1);
            }
            Ok(BASE_COST)
        }
        0x16 => { push_sreg(cpu, 2); Ok(BASE_COST) }
        0x17 => { pop_sreg(cpu, 2); Ok(BASE_COST) }
        0x1E => { push_sreg(cpu, 3); Ok(BASE_COST) }
        0x1F => { pop_sreg(cpu, 3); Ok(BASE_COST) }

        0x27 => { daa(cpu); Ok(BASE_COST) }
        0x2F => { das(cpu); Ok(BASE_COST) }
        0x37 => { aaa(cpu); Ok(BASE_COST) }
        0x3F => { aas(cpu); Ok(BASE_COST) }

        0x40..=0x47 => { inc_dec_reg16(cpu, opcode & 0x07, true); Ok(BASE_COST) }
        0x48..=0x4F => { inc_dec_reg16(cpu, opcode & 0x07, false); Ok(BASE_COST) }

        0x50..=0x57 => {
            let value = helpers::read_reg16(&cpu.regs, opcode & 0x07);
            helpers::push_word(cpu, value);
            Ok(BASE_COST)
        }
        0x58..=0x5F => {
            let value = helpers::pop_word(cpu);
            helpers::write_reg16(&mut cpu.regs, opcode & 0x07, value);
            Ok(BASE_COST)
        }

        0x70..=0x7F => Ok(conditional_jump(cpu, opcode)),

        0x80 | 0x81 | 0x82 | 0x83 => execute_group1(cpu, opcode, seg),

        0x84 | 0x85 => {
            let modrm = helpers::decode_modrm(cpu, seg);
            if opcode == 0x84 {
                let a = helpers::read_rm8(cpu, &modrm);
                let b = helpers::read_reg8(&cpu.regs, modrm.reg);
                cpu.regs.flags = flags::logic8(cpu.regs.flags, a & b);
            } else {
                let a = helpers::read_rm16(cpu, &modrm);
                let b = helpers::read_reg16(&cpu.regs, modrm.reg);
                cpu.regs.flags = flags::logic16(cpu.regs.flags, a & b);
            }
            Ok(mem_cost(&modrm))
        }

        0x86 | 0x87 => {
            let modrm = helpers::decode_modrm(cpu, seg);
            if opcode == 0x86 {
                let a = helpers::read_rm8(cpu, &modrm);
                let b = helpers::read_reg8(&cpu.regs, modrm.reg);
                helpers::write_rm8(cpu, &modrm, b);
                helpers::write_reg8(&mut cpu.regs, modrm.reg, a);
            } else {
                let a = helpers::read_rm16(cpu, &modrm);
                let b = helpers::read_reg16(&cpu.regs, modrm.reg);
                helpers::write_rm16(cpu, &modrm, b);
                helpers::write_reg16(&mut cpu.regs, modrm.reg, a);
            }
            Ok(mem_cost(&modrm) + BASE_COST)
        }

        0x88 => { let m = helpers::decode_modrm(cpu, seg); let v = helpers::read_reg8(&cpu.regs, m.reg); helpers::write_rm8(cpu, &m, v); Ok(mem_cost(&m)) }
        0x89 => { let m = helpers::decode_modrm(cpu, seg); let v = helpers::read_reg16(&cpu.regs, m.reg); helpers::write_rm16(cpu, &m, v); Ok(mem_cost(&m)) }
        0x8A => { let m = helpers::decode_modrm(cpu, seg); let v = helpers::read_rm8(cpu, &m); helpers::write_reg8(&mut cpu.regs, m.reg, v); Ok(mem_cost(&m)) }
        0x8B => { let m = helpers::decode_modrm(cpu, seg); let v = helpers::read_rm16(cpu, &m); helpers::write_reg16(&mut cpu.regs, m.reg, v); Ok(mem_cost(&m)) }
        0x8C => { let m = helpers::decode_modrm(cpu, seg); let v = helpers::read_sreg(&cpu.regs, m.reg); helpers::write_rm16(cpu, &m, v); Ok(mem_cost(&m)) }
        0x8D => {
            let modrm = helpers::decode_modrm(cpu, seg);
            // LEA's operand must be memory; the offset part of the
            // effective address (not the linear address) is loaded.
            let offset = lea_offset(cpu, &modrm);
            helpers::write_reg16(&mut cpu.regs, modrm.reg, offset);
            Ok(BASE_COST)
        }
        0x8E => { let m = helpers::decode_modrm(cpu, seg); let v = helpers::read_rm16(cpu, &m); helpers::write_sreg(&mut cpu.regs, m.reg, v); Ok(mem_cost(&m)) }
        0x8F => {
            let modrm = helpers::decode_modrm(cpu, seg);
            let value = helpers::pop_word(cpu);
            helpers::write_rm16(cpu, &modrm, value);
            Ok(mem_cost(&modrm))
        }

        0x90 => Ok(BASE_COST), // NOP
        0x91..=0x97 => {
            let idx = opcode & 0x07;
            let tmp = cpu.regs.ax;
            cpu.regs.ax = helpers::read_reg16(&cpu.regs, idx);
            helpers::write_reg16(&mut cpu.regs, idx, tmp);
            Ok(BASE_COST)
        }
        0x98 => { cpu.regs.ax = sign_extend_byte_to_word(cpu.regs.al()); Ok(BASE_COST) } // CBW
        0x99 => { cpu.regs.dx = if cpu.regs.ax & 0x8000 != 0 { 0xFFFF } else { 0 }; Ok(BASE_COST) } // CWD
        0x9A => { call_far_direct(cpu); Ok(JUMP_TAKEN_COST) }
        0x9B => Ok(BASE_COST), // WAIT: nothing external to wait on
        0x9C => { helpers::push_word(cpu, cpu.regs.flags); Ok(BASE_COST) }
        0x9D => { let v = helpers::pop_word(cpu); cpu.regs.flags = flags::sanitize(v); Ok(BASE_COST) }
        0x9E => {
            let ah = cpu.regs.ah();
            cpu.regs.flags = flags::sanitize((cpu.regs.flags & 0xFF00) | ah as u16);
            Ok(BASE_COST)
        }
        0x9F => { cpu.regs.set_ah((cpu.regs.flags & 0xFF) as u8); Ok(BASE_COST) }

        0xA0 => { let off = helpers::fetch_word(cpu); let addr = helpers::string_addr(cpu, off, Segment::Ds, seg); let v = cpu.read_byte(addr); cpu.regs.set_al(v); Ok(BASE_COST) }
        0xA1 => { let off = helpers::fetch_word(cpu); let addr = helpers::string_addr(cpu, off, Segment::Ds, seg); cpu.regs.ax = cpu.read_word(addr); Ok(BASE_COST) }
        0xA2 => { let off = helpers::fetch_word(cpu); let addr = helpers::string_addr(cpu, off, Segment::Ds, seg); let v = cpu.regs.al(); cpu.write_byte(addr, v); Ok(BASE_COST) }
        0xA3 => { let off = helpers::fetch_word(cpu); let addr = helpers::string_addr(cpu, off, Segment::Ds, seg); let v = cpu.regs.ax; cpu.write_word(addr, v); Ok(BASE_COST) }

        0xA4 => Ok(string_op(cpu, seg, rep, StringOp::Movsb)),
        0xA5 => Ok(string_op(cpu, seg, rep, StringOp::Movsw)),
        0xA6 => Ok(string_op(cpu, seg, rep, StringOp::Cmpsb)),
        0xA7 => Ok(string_op(cpu, seg, rep, StringOp::Cmpsw)),
        0xAA => Ok(string_op(cpu, seg, rep, StringOp::Stosb)),
        0xAB => Ok(string_op(cpu, seg, rep, StringOp::Stosw)),
        0xAC => Ok(string_op(cpu, seg, rep, StringOp::Lodsb)),
        0xAD => Ok(string_op(cpu, seg, rep, StringOp::Lodsw)),
        0xAE => Ok(string_op(cpu, seg, rep, StringOp::Scasb)),
        0xAF => Ok(string_op(cpu, seg, rep, StringOp::Scasw)),

        0xA8 => { let imm = helpers::fetch_byte(cpu); let a = cpu.regs.al(); cpu.regs.flags = flags::logic8(cpu.regs.flags, a & imm); Ok(BASE_COST) }
        0xA9 => { let imm = helpers::fetch_word(cpu); let a = cpu.regs.ax; cpu.regs.flags = flags::logic16(cpu.regs.flags, a & imm); Ok(BASE_COST) }

        0xB0..=0xB7 => { let imm = helpers::fetch_byte(cpu); helpers::write_reg8(&mut cpu.regs, opcode & 0x07, imm); Ok(BASE_COST) }
        0xB8..=0xBF => { let imm = helpers::fetch_word(cpu); helpers::write_reg16(&mut cpu.regs, opcode & 0x07, imm); Ok(BASE_COST) }

        0xC0 => { let m = helpers::decode_modrm(cpu, seg); let count = helpers::fetch_byte(cpu); shift_group_byte(cpu, &m, m.reg, count); Ok(mem_cost(&m)) }
        0xC1 => { let m = helpers::decode_modrm(cpu, seg); let count = helpers::fetch_byte(cpu); shift_group_word(cpu, &m, m.reg, count); Ok(mem_cost(&m)) }
        0xC2 => { let imm = helpers::fetch_word(cpu); ret_near(cpu, imm); Ok(JUMP_TAKEN_COST) }
        0xC3 => { ret_near(cpu, 0); Ok(JUMP_TAKEN_COST) }
        0xC4 => { load_far_pointer(cpu, seg, Segment::Es); Ok(BASE_COST + MEM_PENALTY) }
        0xC5 => { load_far_pointer(cpu, seg, Segment::Ds); Ok(BASE_COST + MEM_PENALTY) }
        0xC6 => { let m = helpers::decode_modrm(cpu, seg); let imm = helpers::fetch_byte(cpu); helpers::write_rm8(cpu, &m, imm); Ok(mem_cost(&m)) }
        0xC7 => { let m = helpers::decode_modrm(cpu, seg); let imm = helpers::fetch_word(cpu); helpers::write_rm16(cpu, &m, imm); Ok(mem_cost(&m)) }
        0xC9 => { cpu.regs.sp = cpu.regs.bp; cpu.regs.bp = helpers::pop_word(cpu); Ok(BASE_COST) } // LEAVE
        0xCA => { let imm = helpers::fetch_word(cpu); ret_far(cpu, imm); Ok(JUMP_TAKEN_COST) }
        0xCB => { ret_far(cpu, 0); Ok(JUMP_TAKEN_COST) }
        0xCC => { cpu.software_interrupt(3); Ok(JUMP_TAKEN_COST) }
        0xCD => { let vector = helpers::fetch_byte(cpu); cpu.software_interrupt(vector); Ok(JUMP_TAKEN_COST) }
        0xCE => {
            if cpu.regs.flag(OF) {
                cpu.software_interrupt(4);
                Ok(JUMP_TAKEN_COST)
            } else {
                Ok(JUMP_NOT_TAKEN_COST)
            }
        }
        0xCF => { iret(cpu); Ok(JUMP_TAKEN_COST) }

        0xD0 => { let m = helpers::decode_modrm(cpu, seg); shift_group_byte(cpu, &m, m.reg, 1); Ok(mem_cost(&m)) }
        0xD1 => { let m = helpers::decode_modrm(cpu, seg); shift_group_word(cpu, &m, m.reg, 1); Ok(mem_cost(&m)) }
        0xD2 => { let m = helpers::decode_modrm(cpu, seg); let count = cpu.regs.cl(); shift_group_byte(cpu, &m, m.reg, count); Ok(mem_cost(&m)) }
        0xD3 => { let m = helpers::decode_modrm(cpu, seg); let count = cpu.regs.cl(); shift_group_word(cpu, &m, m.reg, count); Ok(mem_cost(&m)) }
        0xD4 => { let imm = helpers::fetch_byte(cpu); aam(cpu, imm); Ok(BASE_COST * 3) }
        0xD5 => { let imm = helpers::fetch_byte(cpu); aad(cpu, imm); Ok(BASE_COST * 2) }
        0xD7 => {
            let addr = helpers::string_addr(cpu, cpu.regs.bx.wrapping_add(cpu.regs.al() as u16), Segment::Ds, seg);
            let v = cpu.read_byte(addr);
            cpu.regs.set_al(v);
            Ok(BASE_COST)
        }

        0xE0 => Ok(loop_instruction(cpu, |f| !f.flag(ZF))),
        0xE1 => Ok(loop_instruction(cpu, |f| f.flag(ZF))),
        0xE2 => Ok(loop_instruction(cpu, |_| true)),
        0xE3 => {
            let rel = helpers::fetch_byte(cpu) as i8;
            if cpu.regs.cx == 0 {
                cpu.regs.ip = cpu.regs.ip.wrapping_add(rel as u16);
                Ok(JUMP_TAKEN_COST)
            } else {
                Ok(JUMP_NOT_TAKEN_COST)
            }
        }

        0xE4 => { let port = helpers::fetch_byte(cpu) as u16; let v = cpu.io.port_in(port); cpu.regs.set_al(v); Ok(BASE_COST * 2) }
        0xE5 => { let port = helpers::fetch_byte(cpu) as u16; let lo = cpu.io.port_in(port); let hi = cpu.io.port_in(port.wrapping_add(1)); cpu.regs.ax = lo as u16 | ((hi as u16) << 8); Ok(BASE_COST * 2) }
        0xE6 => { let port = helpers::fetch_byte(cpu) as u16; cpu.io.port_out(port, cpu.regs.al()); Ok(BASE_COST * 2) }
        0xE7 => { let port = helpers::fetch_byte(cpu) as u16; let v = cpu.regs.ax; cpu.io.port_out(port, v as u8); cpu.io.port_out(port.wrapping_add(1), (v >> 8) as u8); Ok(BASE_COST * 2) }
        0xE8 => { let rel = helpers::fetch_word(cpu) as i16; helpers::push_word(cpu, cpu.regs.ip); cpu.regs.ip = cpu.regs.ip.wrapping_add(rel as u16); Ok(JUMP_TAKEN_COST) }
        0xE9 => { let rel = helpers::fetch_word(cpu) as i16; cpu.regs.ip = cpu.regs.ip.wrapping_add(rel as u16); Ok(JUMP_TAKEN_COST) }
        0xEA => { jmp_far_direct(cpu); Ok(JUMP_TAKEN_COST) }
        0xEB => { let rel = helpers::fetch_byte(cpu) as i8; cpu.regs.ip = cpu.regs.ip.wrapping_add(rel as u16); Ok(JUMP_TAKEN_COST) }
        0xEC => { let port = cpu.regs.dx; let v = cpu.io.port_in(port); cpu.regs.set_al(v); Ok(BASE_COST * 2) }
        0xED => { let port = cpu.regs.dx; let lo = cpu.io.port_in(port); let hi = cpu.io.port_in(port.wrapping_add(1)); cpu.regs.ax = lo as u16 | ((hi as u16) << 8); Ok(BASE_COST * 2) }
        0xEE => { let port = cpu.regs.dx; cpu.io.port_out(port, cpu.regs.al()); Ok(BASE_COST * 2) }
        0xEF => { let port = cpu.regs.dx; let v = cpu.regs.ax; cpu.io.port_out(port, v as u8); cpu.io.port_out(port.wrapping_add(1), (v >> 8) as u8); Ok(BASE_COST * 2) }

        0xF4 => {
            if cpu.regs.flag(IF) {
                cpu.halted = true;
                Ok(BASE_COST)
            } else {
                Err(EmuError::CpuHalt)
            }
        }
        0xF5 => { cpu.regs.set_flag(CF, !cpu.regs.flag(CF)); Ok(BASE_COST) }
        0xF6 => execute_group3_byte(cpu, seg),
        0xF7 => execute_group3_word(cpu, seg),
        0xF8 => { cpu.regs.set_flag(CF, false); Ok(BASE_COST) }
        0xF9 => { cpu.regs.set_flag(CF, true); Ok(BASE_COST) }
        0xFA => { cpu.regs.set_flag(IF, false); Ok(BASE_COST) }
        0xFB => { cpu.regs.set_flag(IF, true); Ok(BASE_COST) }
        0xFC => { cpu.regs.set_flag(DF, false); Ok(BASE_COST) }
        0xFD => { cpu.regs.set_flag(DF, true); Ok(BASE_COST) }
        0xFE => execute_group4(cpu, seg),
        0xFF => execute_group5(cpu, seg),

        other => {
            let cs = cpu.regs.cs;
            let ip = cpu.regs.ip.wrapping_sub(1);
            Err(EmuError::InvalidOpcode { cs, ip, byte: other })
        }
    }
}

fn mem_cost(modrm: &ModRm) -> u32 {
    if modrm.is_mem {
        BASE_COST + MEM_PENALTY
    } else {
        BASE_COST
    }
}

fn is_alu_opcode(opcode: u8) -> bool {
    let low = opcode & 0x07;
    low <= 0x05 && (opcode >> 3) <= 0x07
}

/// The six-opcode-per-operation shape shared by `ADD`/`OR`/`ADC`/`SBB`/
/// `AND`/`SUB`/`XOR`/`CMP`: `r/m8,r8`, `r/m16,r16`, `r8,r/m8`, `r16,r/m16`,
/// `AL,imm8`, `AX,imm16`, selected by the low 3 bits of the opcode.
fn execute_alu_group(cpu: &mut Processor, opcode: u8, seg: Option<Segment>) -> Result<u32> {
    let op = (opcode >> 3) & 0x07;
    match opcode & 0x07 {
        0 => { let m = helpers::decode_modrm(cpu, seg); let a = helpers::read_rm8(cpu, &m); let b = helpers::read_reg8(&cpu.regs, m.reg); let r = alu8(cpu, op, a, b); if op != 7 { helpers::write_rm8(cpu, &m, r); } Ok(mem_cost(&m)) }
        1 => { let m = helpers::decode_modrm(cpu, seg); let a = helpers::read_rm16(cpu, &m); let b = helpers::read_reg16(&cpu.regs, m.reg); let r = alu16(cpu, op, a, b); if op != 7 { helpers::write_rm16(cpu, &m, r); } Ok(mem_cost(&m)) }
        2 => { let m = helpers::decode_modrm(cpu, seg); let a = helpers::read_reg8(&cpu.regs, m.reg); let b = helpers::read_rm8(cpu, &m); let r = alu8(cpu, op, a, b); if op != 7 { helpers::write_reg8(&mut cpu.regs, m.reg, r); } Ok(mem_cost(&m)) }
        3 => { let m = helpers::decode_modrm(cpu, seg); let a = helpers::read_reg16(&cpu.regs, m.reg); let b = helpers::read_rm16(cpu, &m); let r = alu16(cpu, op, a, b); if op != 7 { helpers::write_reg16(&mut cpu.regs, m.reg, r); } Ok(mem_cost(&m)) }
        4 => { let imm = helpers::fetch_byte(cpu); let a = cpu.regs.al(); let r = alu8(cpu, op, a, imm); if op != 7 { cpu.regs.set_al(r); } Ok(BASE_COST) }
        5 => { let imm = helpers::fetch_word(cpu); let a = cpu.regs.ax; let r = alu16(cpu, op, a, imm); if op != 7 { cpu.regs.ax = r; } Ok(BASE_COST) }
        _ => unreachable!(),
    }
}

fn execute_group1(cpu: &mut Processor, opcode: u8, seg: Option<Segment>) -> Result<u32> {
    if opcode == 0x81 {
        let m = helpers::decode_modrm(cpu, seg);
        let imm = helpers::fetch_word(cpu);
        let a = helpers::read_rm16(cpu, &m);
        let r = alu16(cpu, m.reg, a, imm);
        if m.reg != 7 {
            helpers::write_rm16(cpu, &m, r);
        }
        Ok(mem_cost(&m))
    } else {
        // 0x80 and 0x82 both take an imm8; 0x83 sign-extends imm8 to 16
        // bits against a 16-bit r/m (the common "imm8 sign-extended" form).
        let m = helpers::decode_modrm(cpu, seg);
        if opcode == 0x83 {
            let imm = helpers::fetch_byte(cpu) as i8 as i16 as u16;
            let a = helpers::read_rm16(cpu, &m);
            let r = alu16(cpu, m.reg, a, imm);
            if m.reg != 7 {
                helpers::write_rm16(cpu, &m, r);
            }
            Ok(mem_cost(&m))
        } else {
            let imm = helpers::fetch_byte(cpu);
            let a = helpers::read_rm8(cpu, &m);
            let r = alu8(cpu, m.reg, a, imm);
            if m.reg != 7 {
                helpers::write_rm8(cpu, &m, r);
            }
            Ok(mem_cost(&m))
        }
    }
}

fn alu8(cpu: &mut Processor, op: u8, a: u8, b: u8) -> u8 {
    let carry = if cpu.regs.flag(CF) { 1 } else { 0 };
    let (result, f) = match op {
        0 => flags::add8(cpu.regs.flags, a, b, 0),
        1 => (a | b, flags::logic8(cpu.regs.flags, a | b)),
        2 => flags::add8(cpu.regs.flags, a, b, carry),
        3 => flags::sub8(cpu.regs.flags, a, b, carry),
        4 => (a & b, flags::logic8(cpu.regs.flags, a & b)),
        5 | 7 => flags::sub8(cpu.regs.flags, a, b, 0),
        6 => (a ^ b, flags::logic8(cpu.regs.flags, a ^ b)),
        _ => unreachable!(),
    };
    cpu.regs.flags = f;
    result
}

fn alu16(cpu: &mut Processor, op: u8, a: u16, b: u16) -> u16 {
    let carry = if cpu.regs.flag(CF) { 1 } else { 0 };
    let (result, f) = match op {
        0 => flags::add16(cpu.regs.flags, a, b, 0),
        1 => (a | b, flags::logic16(cpu.regs.flags, a | b)),
        2 => flags::add16(cpu.regs.flags, a, b, carry),
        3 => flags::sub16(cpu.regs.flags, a, b, carry),
        4 => (a & b, flags::logic16(cpu.regs.flags, a & b)),
        5 | 7 => flags::sub16(cpu.regs.flags, a, b, 0),
        6 => (a ^ b, flags::logic16(cpu.regs.flags, a ^ b)),
        _ => unreachable!(),
    };
    cpu.regs.flags = f;
    result
}

fn push_sreg(cpu: &mut Processor, idx: u8) {
    let v = helpers::read_sreg(&cpu.regs, idx);
    helpers::push_word(cpu, v);
}

fn pop_sreg(cpu: &mut Processor, idx: u8) {
    let v = helpers::pop_word(cpu);
    helpers::write_sreg(&mut cpu.regs, idx, v);
}

fn inc_dec_reg16(cpu: &mut Processor, idx: u8, increment: bool) {
    let a = helpers::read_reg16(&cpu.regs, idx);
    // INC/DEC never touch CF, matching the real 8086 definition.
    let saved_cf = cpu.regs.flag(CF);
    let (result, f) = if increment {
        flags::add16(cpu.regs.flags, a, 1, 0)
    } else {
        flags::sub16(cpu.regs.flags, a, 1, 0)
    };
    cpu.regs.flags = f;
    cpu.regs.set_flag(CF, saved_cf);
    helpers::write_reg16(&mut cpu.regs, idx, result);
}

fn lea_offset(_cpu: &mut Processor, modrm: &ModRm) -> u16 {
    modrm.offset
}

fn conditional_jump(cpu: &mut Processor, opcode: u8) -> u32 {
    let rel = helpers::fetch_byte(cpu) as i8;
    let f = &cpu.regs;
    let taken = match opcode & 0x0F {
        0x0 => f.flag(OF),
        0x1 => !f.flag(OF),
        0x2 => f.flag(CF),
        0x3 => !f.flag(CF),
        0x4 => f.flag(ZF),
        0x5 => !f.flag(ZF),
        0x6 => f.flag(CF) || f.flag(ZF),
        0x7 => !(f.flag(CF) || f.flag(ZF)),
        0x8 => f.flag(SF),
        0x9 => !f.flag(SF),
        0xA => f.flag(PF),
        0xB => !f.flag(PF),
        0xC => f.flag(SF) != f.flag(OF),
        0xD => f.flag(SF) == f.flag(OF),
        0xE => f.flag(SF) != f.flag(OF) || f.flag(ZF),
        0xF => f.flag(SF) == f.flag(OF) && !f.flag(ZF),
        _ => unreachable!(),
    };
    if taken {
        cpu.regs.ip = cpu.regs.ip.wrapping_add(rel as u16);
        JUMP_TAKEN_COST
    } else {
        JUMP_NOT_TAKEN_COST
    }
}

fn loop_instruction(cpu: &mut Processor, condition: impl Fn(&Processor) -> bool) -> u32 {
    let rel = helpers::fetch_byte(cpu) as i8;
    cpu.regs.cx = cpu.regs.cx.wrapping_sub(1);
    if cpu.regs.cx != 0 && condition(cpu) {
        cpu.regs.ip = cpu.regs.ip.wrapping_add(rel as u16);
        JUMP_TAKEN_COST
    } else {
        JUMP_NOT_TAKEN_COST
    }
}

fn ret_near(cpu: &mut Processor, extra_pop: u16) {
    let ip = helpers::pop_word(cpu);
    cpu.regs.ip = ip;
    cpu.regs.sp = cpu.regs.sp.wrapping_add(extra_pop);
}

fn ret_far(cpu: &mut Processor, extra_pop: u16) {
    let ip = helpers::pop_word(cpu);
    let cs = helpers::pop_word(cpu);
    cpu.regs.ip = ip;
    cpu.regs.cs = cs;
    cpu.regs.sp = cpu.regs.sp.wrapping_add(extra_pop);
}

fn call_far_direct(cpu: &mut Processor) {
    let new_ip = helpers::fetch_word(cpu);
    let new_cs = helpers::fetch_word(cpu);
    helpers::push_word(cpu, cpu.regs.cs);
    helpers::push_word(cpu, cpu.regs.ip);
    cpu.regs.cs = new_cs;
    cpu.regs.ip = new_ip;
}

fn jmp_far_direct(cpu: &mut Processor) {
    let new_ip = helpers::fetch_word(cpu);
    let new_cs = helpers::fetch_word(cpu);
    cpu.regs.cs = new_cs;
    cpu.regs.ip = new_ip;
}

fn load_far_pointer(cpu: &mut Processor, seg: Option<Segment>, target_seg: Segment) {
    let modrm = helpers::decode_modrm(cpu, seg);
    let offset = helpers::read_rm16(cpu, &modrm);
    let segment = cpu.bus.read_word(modrm.addr.wrapping_add(2));
    helpers::write_reg16(&mut cpu.regs, modrm.reg, offset);
    match target_seg {
        Segment::Es => cpu.regs.es = segment,
        Segment::Ds => cpu.regs.ds = segment,
        _ => unreachable!(),
    }
}

/// Every `INT n`, whether software (`CC`/`CD`) or a guest fault
/// (divide-by-zero, `INTO` overflow), vectors identically.
fn iret(cpu: &mut Processor) {
    let ip = helpers::pop_word(cpu);
    let cs = helpers::pop_word(cpu);
    let new_flags = helpers::pop_word(cpu);
    cpu.regs.ip = ip;
    cpu.regs.cs = cs;
    cpu.regs.flags = flags::sanitize(new_flags);
}

fn sign_extend_byte_to_word(b: u8) -> u16 {
    b as i8 as i16 as u16
}

enum StringOp {
    Movsb,
    Movsw,
    Cmpsb,
    Cmpsw,
    Stosb,
    Stosw,
    Lodsb,
    Lodsw,
    Scasb,
    Scasw,
}

/// `MOVS`/`CMPS`/`SCAS`/`LODS`/`STOS`, honoring `DF` for the index-register
/// step direction and the active `REP`/`REPE`/`REPNE` prefix for counted
/// repetition on `CX`. Each call here executes one full repetition run
/// (not a single iteration) since no other device can interrupt the
/// emulation thread mid-instruction in this core; an injected interrupt
/// would only need to resume `CX` unchanged, which holds automatically
/// since we only decrement it here.
fn string_op(cpu: &mut Processor, seg: Option<Segment>, rep: Option<RepKind>, op: StringOp) -> u32 {
    let step: i64 = if cpu.regs.flag(DF) { -1 } else { 1 };
    let mut iterations: u32 = 0;

    loop {
        let continue_rep = match rep {
            None => iterations == 0,
            Some(_) => cpu.regs.cx != 0,
        };
        if !continue_rep {
            break;
        }

        match op {
            StringOp::Movsb => {
                let src = helpers::string_addr(cpu, cpu.regs.si, Segment::Ds, seg);
                let dst = helpers::string_addr(cpu, cpu.regs.di, Segment::Es, None);
                let v = cpu.read_byte(src);
                cpu.write_byte(dst, v);
                cpu.regs.si = cpu.regs.si.wrapping_add(step as u16);
                cpu.regs.di = cpu.regs.di.wrapping_add(step as u16);
            }
            StringOp::Movsw => {
                let src = helpers::string_addr(cpu, cpu.regs.si, Segment::Ds, seg);
                let dst = helpers::string_addr(cpu, cpu.regs.di, Segment::Es, None);
                let v = cpu.read_word(src);
                cpu.write_word(dst, v);
                cpu.regs.si = cpu.regs.si.wrapping_add((step * 2) as u16);
                cpu.regs.di = cpu.regs.di.wrapping_add((step * 2) as u16);
            }
            StringOp::Stosb => {
                let dst = helpers::string_addr(cpu, cpu.regs.di, Segment::Es, None);
                let v = cpu.regs.al();
                cpu.write_byte(dst, v);
                cpu.regs.di = cpu.regs.di.wrapping_add(step as u16);
            }
            StringOp::Stosw => {
                let dst = helpers::string_addr(cpu, cpu.regs.di, Segment::Es, None);
                let v = cpu.regs.ax;
                cpu.write_word(dst, v);
                cpu.regs.di = cpu.regs.di.wrapping_add((step * 2) as u16);
            }
            StringOp::Lodsb => {
                let src = helpers::string_addr(cpu, cpu.regs.si, Segment::Ds, seg);
                let v = cpu.read_byte(src);
                cpu.regs.set_al(v);
                cpu.regs.si = cpu.regs.si.wrapping_add(step as u16);
            }
            StringOp::Lodsw => {
                let src = helpers::string_addr(cpu, cpu.regs.si, Segment::Ds, seg);
                cpu.regs.ax = cpu.read_word(src);
                cpu.regs.si = cpu.regs.si.wrapping_add((step * 2) as u16);
            }
            StringOp::Cmpsb => {
                let src = helpers::string_addr(cpu, cpu.regs.si, Segment::Ds, seg);
                let dst = helpers::string_addr(cpu, cpu.regs.di, Segment::Es, None);
                let a = cpu.read_byte(src);
                let b = cpu.read_byte(dst);
                let (_, f) = flags::sub8(cpu.regs.flags, a, b, 0);
                cpu.regs.flags = f;
                cpu.regs.si = cpu.regs.si.wrapping_add(step as u16);
                cpu.regs.di = cpu.regs.di.wrapping_add(step as u16);
            }
            StringOp::Cmpsw => {
                let src = helpers::string_addr(cpu, cpu.regs.si, Segment::Ds, seg);
                let dst = helpers::string_addr(cpu, cpu.regs.di, Segment::Es, None);
                let a = cpu.read_word(src);
                let b = cpu.read_word(dst);
                let (_, f) = flags::sub16(cpu.regs.flags, a, b, 0);
                cpu.regs.flags = f;
                cpu.regs.si = cpu.regs.si.wrapping_add((step * 2) as u16);
                cpu.regs.di = cpu.regs.di.wrapping_add((step * 2) as u16);
            }
            StringOp::Scasb => {
                let dst = helpers::string_addr(cpu, cpu.regs.di, Segment::Es, None);
                let a = cpu.regs.al();
                let b = cpu.read_byte(dst);
                let (_, f) = flags::sub8(cpu.regs.flags, a, b, 0);
                cpu.regs.flags = f;
                cpu.regs.di = cpu.regs.di.wrapping_add(step as u16);
            }
            StringOp::Scasw => {
                let dst = helpers::string_addr(cpu, cpu.regs.di, Segment::Es, None);
                let a = cpu.regs.ax;
                let b = cpu.read_word(dst);
                let (_, f) = flags::sub16(cpu.regs.flags, a, b, 0);
                cpu.regs.flags = f;
                cpu.regs.di = cpu.regs.di.wrapping_add((step * 2) as u16);
            }
        }

        iterations += 1;

        if let Some(kind) = rep {
            cpu.regs.cx = cpu.regs.cx.wrapping_sub(1);
            let should_stop = match (kind, matches!(op, StringOp::Cmpsb | StringOp::Cmpsw | StringOp::Scasb | StringOp::Scasw)) {
                (RepKind::Repe, true) => !cpu.regs.flag(ZF),
                (RepKind::Repne, true) => cpu.regs.flag(ZF),
                _ => false,
            };
            if cpu.regs.cx == 0 || should_stop {
                break;
            }
        } else {
            break;
        }
    }

    BASE_COST + iterations.saturating_sub(1) * 2
}

fn shift_group_byte(cpu: &mut Processor, modrm: &ModRm, op: u8, count: u8) {
    let count = count & 0x1F;
    if count == 0 {
        return;
    }
    let mut value = helpers::read_rm8(cpu, modrm);
    let mut cf = cpu.regs.flag(CF);
    let mut of = cpu.regs.flag(OF);
    for i in 0..count {
        let last = i == count - 1;
        match op {
            0 => { cf = value & 0x80 != 0; value = value.rotate_left(1); if last { of = cf != (value & 0x80 != 0); } }
            1 => { cf = value & 0x01 != 0; value = value.rotate_right(1); if last { of = (value & 0x80 != 0) != (value & 0x40 != 0); } }
            2 => { let new_cf = value & 0x80 != 0; value = (value << 1) | (cf as u8); cf = new_cf; if last { of = cf != (value & 0x80 != 0); } }
            3 => { let new_cf = value & 0x01 != 0; value = (value >> 1) | ((cf as u8) << 7); cf = new_cf; if last { of = (value & 0x80 != 0) != (value & 0x40 != 0); } }
            4 | 6 => { cf = value & 0x80 != 0; let prev_top = value & 0x80; value <<= 1; if last { of = (value & 0x80) != prev_top; } }
            5 => { cf = value & 0x01 != 0; let prev_top = value & 0x80; value >>= 1; if last { of = prev_top != 0; } }
            7 => { cf = value & 0x01 != 0; let sign = value & 0x80; value = (value >> 1) | sign; if last { of = false; } }
            _ => {}
        }
    }
    // Rotates (0-3) touch only CF/OF; SZP (and AF) are architecturally
    // untouched. Only the shift ops (4-7) update SZP from the result.
    if op >= 4 {
        cpu.regs.flags = flags::szp(cpu.regs.flags, value as u16, 0xFF);
    }
    cpu.regs.set_flag(CF, cf);
    if count == 1 {
        cpu.regs.set_flag(OF, of);
    }
    helpers::write_rm8(cpu, modrm, value);
}

fn shift_group_word(cpu: &mut Processor, modrm: &ModRm, op: u8, count: u8) {
    let count = count & 0x1F;
    if count == 0 {
        return;
    }
    let mut value = helpers::read_rm16(cpu, modrm);
    let mut cf = cpu.regs.flag(CF);
    let mut of = cpu.regs.flag(OF);
    for i in 0..count {
        let last = i == count - 1;
        match op {
            0 => { cf = value & 0x8000 != 0; value = value.rotate_left(1); if last { of = cf != (value & 0x8000 != 0); } }
            1 => { cf = value & 0x0001 != 0; value = value.rotate_right(1); if last { of = (value & 0x8000 != 0) != (value & 0x4000 != 0); } }
            2 => { let new_cf = value & 0x8000 != 0; value = (value << 1) | (cf as u16); cf = new_cf; if last { of = cf != (value & 0x8000 != 0); } }
            3 => { let new_cf = value & 0x0001 != 0; value = (value >> 1) | ((cf as u16) << 15); cf = new_cf; if last { of = (value & 0x8000 != 0) != (value & 0x4000 != 0); } }
            4 | 6 => { cf = value & 0x8000 != 0; let prev_top = value & 0x8000; value <<= 1; if last { of = (value & 0x8000) != prev_top; } }
            5 => { cf = value & 0x0001 != 0; let prev_top = value & 0x8000; value >>= 1; if last { of = prev_top != 0; } }
            7 => { cf = value & 0x0001 != 0; let sign = value & 0x8000; value = (value >> 1) | sign; if last { of = false; } }
            _ => {}
        }
    }
    if op >= 4 {
        cpu.regs.flags = flags::szp(cpu.regs.flags, value, 0xFFFF);
    }
    cpu.regs.set_flag(CF, cf);
    if count == 1 {
        cpu.regs.set_flag(OF, of);
    }
    helpers::write_rm16(cpu, modrm, value);
}

fn execute_group3_byte(cpu: &mut Processor, seg: Option<Segment>) -> Result<u32> {
    let modrm = helpers::decode_modrm(cpu, seg);
    match modrm.reg {
        0 | 1 => {
            let imm = helpers::fetch_byte(cpu);
            let a = helpers::read_rm8(cpu, &modrm);
            cpu.regs.flags = flags::logic8(cpu.regs.flags, a & imm);
            Ok(mem_cost(&modrm))
        }
        2 => { let v = helpers::read_rm8(cpu, &modrm); helpers::write_rm8(cpu, &modrm, !v); Ok(mem_cost(&modrm)) }
        3 => {
            let v = helpers::read_rm8(cpu, &modrm);
            let (r, f) = flags::sub8(cpu.regs.flags, 0, v, 0);
            cpu.regs.flags = f;
            cpu.regs.set_flag(CF, v != 0);
            helpers::write_rm8(cpu, &modrm, r);
            Ok(mem_cost(&modrm))
        }
        4 => { mul8(cpu, &modrm, false); Ok(mem_cost(&modrm) + BASE_COST * 20) }
        5 => { mul8(cpu, &modrm, true); Ok(mem_cost(&modrm) + BASE_COST * 20) }
        6 => { div8(cpu, &modrm, false)?; Ok(mem_cost(&modrm) + BASE_COST * 25) }
        7 => { div8(cpu, &modrm, true)?; Ok(mem_cost(&modrm) + BASE_COST * 25) }
        _ => unreachable!(),
    }
}

fn execute_group3_word(cpu: &mut Processor, seg: Option<Segment>) -> Result<u32> {
    let modrm = helpers::decode_modrm(cpu, seg);
    match modrm.reg {
        0 | 1 => {
            let imm = helpers::fetch_word(cpu);
            let a = helpers::read_rm16(cpu, &modrm);
            cpu.regs.flags = flags::logic16(cpu.regs.flags, a & imm);
            Ok(mem_cost(&modrm))
        }
        2 => { let v = helpers::read_rm16(cpu, &modrm); helpers::write_rm16(cpu, &modrm, !v); Ok(mem_cost(&modrm)) }
        3 => {
            let v = helpers::read_rm16(cpu, &modrm);
            let (r, f) = flags::sub16(cpu.regs.flags, 0, v, 0);
            cpu.regs.flags = f;
            cpu.regs.set_flag(CF, v != 0);
            helpers::write_rm16(cpu, &modrm, r);
            Ok(mem_cost(&modrm))
        }
        4 => { mul16(cpu, &modrm, false); Ok(mem_cost(&modrm) + BASE_COST * 20) }
        5 => { mul16(cpu, &modrm, true); Ok(mem_cost(&modrm) + BASE_COST * 20) }
        6 => { div16(cpu, &modrm, false)?; Ok(mem_cost(&modrm) + BASE_COST * 25) }
        7 => { div16(cpu, &modrm, true)?; Ok(mem_cost(&modrm) + BASE_COST * 25) }
        _ => unreachable!(),
    }
}

fn mul8(cpu: &mut Processor, modrm: &ModRm, signed: bool) {
    let a = cpu.regs.al();
    let b = helpers::read_rm8(cpu, modrm);
    let (result, overflow) = if signed {
        let r = (a as i8 as i16) * (b as i8 as i16);
        (r as u16, r != (r as i8 as i16))
    } else {
        let r = a as u16 * b as u16;
        (r, r > 0xFF)
    };
    cpu.regs.ax = result;
    cpu.regs.set_flag(CF, overflow);
    cpu.regs.set_flag(OF, overflow);
}

fn mul16(cpu: &mut Processor, modrm: &ModRm, signed: bool) {
    let a = cpu.regs.ax;
    let b = helpers::read_rm16(cpu, modrm);
    let (dx, ax, overflow) = if signed {
        let r = (a as i16 as i32) * (b as i16 as i32);
        let ax = r as u16;
        (((r >> 16) as u16), ax, r != (ax as i16 as i32))
    } else {
        let r = a as u32 * b as u32;
        ((r >> 16) as u16, r as u16, r > 0xFFFF)
    };
    cpu.regs.dx = dx;
    cpu.regs.ax = ax;
    cpu.regs.set_flag(CF, overflow);
    cpu.regs.set_flag(OF, overflow);
}

/// `DIV`/`IDIV` raise interrupt 0 (divide error) on a zero divisor or a
/// quotient that overflows the destination register, per §4.1's failure
/// semantics — never surfaced to the host as a Rust error.
fn div8(cpu: &mut Processor, modrm: &ModRm, signed: bool) -> Result<()> {
    let divisor = helpers::read_rm8(cpu, modrm);
    if divisor == 0 {
        cpu.software_interrupt(0);
        return Ok(());
    }
    let dividend = cpu.regs.ax;
    if signed {
        let d = dividend as i16;
        let v = divisor as i8 as i16;
        let q = d / v;
        let r = d % v;
        if q > i8::MAX as i16 || q < i8::MIN as i16 {
            cpu.software_interrupt(0);
            return Ok(());
        }
        cpu.regs.set_al(q as u8);
        cpu.regs.set_ah(r as u8);
    } else {
        let v = divisor as u16;
        let q = dividend / v;
        let r = dividend % v;
        if q > u8::MAX as u16 {
            cpu.software_interrupt(0);
            return Ok(());
        }
        cpu.regs.set_al(q as u8);
        cpu.regs.set_ah(r as u8);
    }
    Ok(())
}

fn div16(cpu: &mut Processor, modrm: &ModRm, signed: bool) -> Result<()> {
    let divisor = helpers::read_rm16(cpu, modrm);
    if divisor == 0 {
        cpu.software_interrupt(0);
        return Ok(());
    }
    let dividend = ((cpu.regs.dx as u32) << 16) | cpu.regs.ax as u32;
    if signed {
        let d = dividend as i32;
        let v = divisor as i16 as i32;
        let q = d / v;
        let r = d % v;
        if q > i16::MAX as i32 || q < i16::MIN as i32 {
            cpu.software_interrupt(0);
            return Ok(());
        }
        cpu.regs.ax = q as u16;
        cpu.regs.dx = r as u16;
    } else {
        let v = divisor as u32;
        let q = dividend / v;
        let r = dividend % v;
        if q > u16::MAX as u32 {
            cpu.software_interrupt(0);
            return Ok(());
        }
        cpu.regs.ax = q as u16;
        cpu.regs.dx = r as u16;
    }
    Ok(())
}

fn execute_group4(cpu: &mut Processor, seg: Option<Segment>) -> Result<u32> {
    let modrm = helpers::decode_modrm(cpu, seg);
    let a = helpers::read_rm8(cpu, &modrm);
    let saved_cf = cpu.regs.flag(CF);
    let (result, f) = if modrm.reg == 0 {
        flags::add8(cpu.regs.flags, a, 1, 0)
    } else {
        flags::sub8(cpu.regs.flags, a, 1, 0)
    };
    cpu.regs.flags = f;
    cpu.regs.set_flag(CF, saved_cf);
    helpers::write_rm8(cpu, &modrm, result);
    Ok(mem_cost(&modrm))
}

fn execute_group5(cpu: &mut Processor, seg: Option<Segment>) -> Result<u32> {
    let modrm = helpers::decode_modrm(cpu, seg);
    match modrm.reg {
        0 | 1 => {
            let a = helpers::read_rm16(cpu, &modrm);
            let saved_cf = cpu.regs.flag(CF);
            let (result, f) = if modrm.reg == 0 {
                flags::add16(cpu.regs.flags, a, 1, 0)
            } else {
                flags::sub16(cpu.regs.flags, a, 1, 0)
            };
            cpu.regs.flags = f;
            cpu.regs.set_flag(CF, saved_cf);
            helpers::write_rm16(cpu, &modrm, result);
            Ok(mem_cost(&modrm))
        }
        2 => {
            let target = helpers::read_rm16(cpu, &modrm);
            helpers::push_word(cpu, cpu.regs.ip);
            cpu.regs.ip = target;
            Ok(JUMP_TAKEN_COST)
        }
        3 => {
            let new_ip = helpers::read_rm16(cpu, &modrm);
            let new_cs = cpu.bus.read_word(modrm.addr.wrapping_add(2));
            helpers::push_word(cpu, cpu.regs.cs);
            helpers::push_word(cpu, cpu.regs.ip);
            cpu.regs.cs = new_cs;
            cpu.regs.ip = new_ip;
            Ok(JUMP_TAKEN_COST)
        }
        4 => {
            cpu.regs.ip = helpers::read_rm16(cpu, &modrm);
            Ok(JUMP_TAKEN_COST)
        }
        5 => {
            let new_ip = helpers::read_rm16(cpu, &modrm);
            let new_cs = cpu.bus.read_word(modrm.addr.wrapping_add(2));
            cpu.regs.cs = new_cs;
            cpu.regs.ip = new_ip;
            Ok(JUMP_TAKEN_COST)
        }
        6 => {
            let v = helpers::read_rm16(cpu, &modrm);
            helpers::push_word(cpu, v);
            Ok(mem_cost(&modrm))
        }
        _ => {
            let cs = cpu.regs.cs;
            let ip = cpu.regs.ip.wrapping_sub(2);
            Err(EmuError::InvalidOpcode { cs, ip, byte: 0xFF })
        }
    }
}

fn daa(cpu: &mut Processor) {
    let mut al = cpu.regs.al();
    let mut cf = cpu.regs.flag(CF);
    let af = cpu.regs.flag(AF);
    let old_al = al;
    if (al & 0x0F) > 9 || af {
        let (r, carry) = al.overflowing_add(6);
        al = r;
        cf = cf || carry;
        cpu.regs.set_flag(AF, true);
    } else {
        cpu.regs.set_flag(AF, false);
    }
    if old_al > 0x99 || cf {
        al = al.wrapping_add(0x60);
        cf = true;
    }
    cpu.regs.flags = flags::szp(cpu.regs.flags, al as u16, 0xFF);
    cpu.regs.set_flag(CF, cf);
    cpu.regs.set_al(al);
}

fn das(cpu: &mut Processor) {
    let mut al = cpu.regs.al();
    let mut cf = cpu.regs.flag(CF);
    let af = cpu.regs.flag(AF);
    let old_al = al;
    if (al & 0x0F) > 9 || af {
        al = al.wrapping_sub(6);
        cf = cf || old_al < 6;
        cpu.regs.set_flag(AF, true);
    } else {
        cpu.regs.set_flag(AF, false);
    }
    if old_al > 0x99 || cf {
        al = al.wrapping_sub(0x60);
        cf = true;
    }
    cpu.regs.flags = flags::szp(cpu.regs.flags, al as u16, 0xFF);
    cpu.regs.set_flag(CF, cf);
    cpu.regs.set_al(al);
}

fn aaa(cpu: &mut Processor) {
    let al = cpu.regs.al();
    if (al & 0x0F) > 9 || cpu.regs.flag(AF) {
        let ah = cpu.regs.ah();
        cpu.regs.set_al(al.wrapping_add(6) & 0x0F);
        cpu.regs.set_ah(ah.wrapping_add(1));
        cpu.regs.set_flag(AF, true);
        cpu.regs.set_flag(CF, true);
    } else {
        cpu.regs.set_al(al & 0x0F);
        cpu.regs.set_flag(AF, false);
        cpu.regs.set_flag(CF, false);
    }
}

fn aas(cpu: &mut Processor) {
    let al = cpu.regs.al();
    if (al & 0x0F) > 9 || cpu.regs.flag(AF) {
        let ah = cpu.regs.ah();
        cpu.regs.set_al(al.wrapping_sub(6) & 0x0F);
        cpu.regs.set_ah(ah.wrapping_sub(1));
        cpu.regs.set_flag(AF, true);
        cpu.regs.set_flag(CF, true);
    } else {
        cpu.regs.set_al(al & 0x0F);
        cpu.regs.set_flag(AF, false);
        cpu.regs.set_flag(CF, false);
    }
}

fn aam(cpu: &mut Processor, base: u8) {
    let base = if base == 0 { 10 } else { base };
    let al = cpu.regs.al();
    let ah = al / base;
    let al = al % base;
    cpu.regs.set_ah(ah);
    cpu.regs.set_al(al);
    cpu.regs.flags = flags::szp(cpu.regs.flags, al as u16, 0xFF);
}

fn aad(cpu: &mut Processor, base: u8) {
    let base = if base == 0 { 10 } else { base };
    let al = cpu.regs.al();
    let ah = cpu.regs.ah();
    let result = ah.wrapping_mul(base).wrapping_add(al);
    cpu.regs.set_al(result);
    cpu.regs.set_ah(0);
    cpu.regs.flags = flags::szp(cpu.regs.flags, result as u16, 0xFF);
}
