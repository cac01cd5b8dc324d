//! Opcode-name lookup used by the debugger's `@` command and instruction
//! history ring (§4.7). Intentionally a name table rather than a full
//! operand-decoding disassembler: the debugger only ever needs a mnemonic
//! to print next to the raw opcode byte, never a re-parsed instruction.

/// 256-entry dispatch-table-shaped mnemonic lookup, indexed by the first
/// opcode byte (after any prefixes). Unassigned entries read `"???"`,
/// matching `InvalidOpcode` for bytes the processor's decode table also
/// rejects.
const OPCODE_NAMES: [&str; 256] = build_table();

const fn build_table() -> [&'static str; 256] {
    let mut table = ["???"; 256];
    table[0x00] = "add";
    table[0x01] = "add";
    table[0x02] = "add";
    table[0x03] = "add";
    table[0x04] = "add";
    table[0x05] = "add";
    table[0x08] = "or";
    table[0x09] = "or";
    table[0x0A] = "or";
    table[0x0B] = "or";
    table[0x0C] = "or";
    table[0x0D] = "or";
    table[0x20] = "and";
    table[0x21] = "and";
    table[0x22] = "and";
    table[0x23] = "and";
    table[0x24] = "and";
    table[0x25] = "and";
    table[0x28] = "sub";
    table[0x29] = "sub";
    table[0x2A] = "sub";
    table[0x2B] = "sub";
    table[0x2C] = "sub";
    table[0x2D] = "sub";
    table[0x30] = "xor";
    table[0x31] = "xor";
    table[0x32] = "xor";
    table[0x33] = "xor";
    table[0x34] = "xor";
    table[0x35] = "xor";
    table[0x38] = "cmp";
    table[0x39] = "cmp";
    table[0x3A] = "cmp";
    table[0x3B] = "cmp";
    table[0x3C] = "cmp";
    table[0x3D] = "cmp";
    table[0x40] = "inc";
    table[0x41] = "inc";
    table[0x42] = "inc";
    table[0x43] = "inc";
    table[0x44] = "inc";
    table[0x45] = "inc";
    table[0x46] = "inc";
    table[0x47] = "inc";
    table[0x48] = "dec";
    table[0x49] = "dec";
    table[0x4A] = "dec";
    table[0x4B] = "dec";
    table[0x4C] = "dec";
    table[0x4D] = "dec";
    table[0x4E] = "dec";
    table[0x4F] = "dec";
    table[0x50] = "push";
    table[0x51] = "push";
    table[0x52] = "push";
    table[0x53] = "push";
    table[0x54] = "push";
    table[0x55] = "push";
    table[0x56] = "push";
    table[0x57] = "push";
    table[0x58] = "pop";
    table[0x59] = "pop";
    table[0x5A] = "pop";
    table[0x5B] = "pop";
    table[0x5C] = "pop";
    table[0x5D] = "pop";
    table[0x5E] = "pop";
    table[0x5F] = "pop";
    table[0x70] = "jo";
    table[0x71] = "jno";
    table[0x72] = "jb";
    table[0x73] = "jae";
    table[0x74] = "je";
    table[0x75] = "jne";
    table[0x76] = "jbe";
    table[0x77] = "ja";
    table[0x78] = "js";
    table[0x79] = "jns";
    table[0x7A] = "jp";
    table[0x7B] = "jnp";
    table[0x7C] = "jl";
    table[0x7D] = "jge";
    table[0x7E] = "jle";
    table[0x7F] = "jg";
    table[0x80] = "grp1";
    table[0x81] = "grp1";
    table[0x83] = "grp1";
    table[0x88] = "mov";
    table[0x89] = "mov";
    table[0x8A] = "mov";
    table[0x8B] = "mov";
    table[0x8C] = "mov";
    table[0x8D] = "lea";
    table[0x8E] = "mov";
    table[0x90] = "nop";
    table[0xA0] = "movsb";
    table[0xA1] = "movsw";
    table[0xA2] = "stosb";
    table[0xA3] = "stosw";
    table[0xA4] = "movsb";
    table[0xA5] = "movsw";
    table[0xA6] = "cmpsb";
    table[0xA7] = "cmpsw";
    table[0xAA] = "stosb";
    table[0xAB] = "stosw";
    table[0xAC] = "lodsb";
    table[0xAD] = "lodsw";
    table[0xAE] = "scasb";
    table[0xAF] = "scasw";
    table[0xB0] = "mov";
    table[0xB8] = "mov";
    table[0xC2] = "ret";
    table[0xC3] = "ret";
    table[0xC6] = "mov";
    table[0xC7] = "mov";
    table[0xC9] = "leave";
    table[0xCA] = "retf";
    table[0xCB] = "retf";
    table[0xCC] = "int3";
    table[0xCD] = "int";
    table[0xCE] = "into";
    table[0xCF] = "iret";
    table[0xD0] = "shift";
    table[0xD1] = "shift";
    table[0xD2] = "shift";
    table[0xD3] = "shift";
    table[0xD4] = "aam";
    table[0xD5] = "aad";
    table[0xE2] = "loop";
    table[0xE4] = "in";
    table[0xE5] = "in";
    table[0xE6] = "out";
    table[0xE7] = "out";
    table[0xE8] = "call";
    table[0xE9] = "jmp";
    table[0xEA] = "jmp";
    table[0xEB] = "jmp";
    table[0xEC] = "in";
    table[0xED] = "in";
    table[0xEE] = "out";
    table[0xEF] = "out";
    table[0xF4] = "hlt";
    table[0xF6] = "grp3";
    table[0xF7] = "grp3";
    table[0xF8] = "clc";
    table[0xF9] = "stc";
    table[0xFA] = "cli";
    table[0xFB] = "sti";
    table[0xFC] = "cld";
    table[0xFD] = "std";
    table
}

/// Mnemonic for `byte`, `"???"` if undecoded.
pub fn opcode_name(byte: u8) -> &'static str {
    OPCODE_NAMES[byte as usize]
}

/// `CS` is named `BIOS` at `0xF000`, `BOOT` at `0x7C00`, else printed as
/// hex, matching the naming rule in §4.7.
fn segment_name(cs: u16) -> String {
    match cs {
        0xF000 => "BIOS".to_string(),
        0x7C00 => "BOOT".to_string(),
        other => format!("{:#06x}", other),
    }
}

/// `"[CS-name:IP] opcode-name (opcode-hex)"`, the history ring's entry
/// format (§4.7).
pub fn format_history_entry(cs: u16, ip: u16, opcode: u8) -> String {
    format!("[{}:{:04x}] {} ({:#04x})", segment_name(cs), ip, opcode_name(opcode), opcode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_known_opcodes() {
        assert_eq!(opcode_name(0xF4), "hlt");
        assert_eq!(opcode_name(0xCF), "iret");
        assert_eq!(opcode_name(0xFF), "???");
    }

    #[test]
    fn segment_naming_matches_special_cases() {
        assert_eq!(segment_name(0xF000), "BIOS");
        assert_eq!(segment_name(0x7C00), "BOOT");
        assert_eq!(segment_name(0x1234), "0x1234");
    }

    #[test]
    fn history_entry_has_expected_shape() {
        let entry = format_history_entry(0xF000, 0x1234, 0xF4);
        assert_eq!(entry, "[BIOS:1234] hlt (0xf4)");
    }
}
