//! Enumeration of opcodes, registers and per-mnemonic metadata.
//!
//! A mnemonic is either a base opcode — directly executed by the emulator —
//! or a pseudo opcode, which the assembler's lowering pass (see `rgasm`)
//! rewrites into one or more base instructions before a label offset is ever
//! observed by a resolver. Both halves of the catalog live here so the
//! parser and the lowerer agree on exactly one source of truth for operand
//! shapes and expanded sizes.

use num_derive::{FromPrimitive, ToPrimitive};

/// Base opcodes, directly executed by the emulator core. Numeric values are
/// the on-wire encoding written into `Instruction::opcode`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    Nop = 0x00,
    Add = 0x01,
    Sub = 0x02,
    And = 0x03,
    Orr = 0x04,
    Xor = 0x05,
    Not = 0x06,
    Lsh = 0x07,
    Ash = 0x08,
    Tcu = 0x09,
    Tcs = 0x0a,
    Set = 0x0b,
    Mov = 0x0c,
    Ldw = 0x0d,
    Stw = 0x0e,
    Ldb = 0x0f,
    Stb = 0x10,
    Brx = 0x11,
    Int = 0x12,
    Hlt = 0x13,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::And => "and",
            Opcode::Orr => "orr",
            Opcode::Xor => "xor",
            Opcode::Not => "not",
            Opcode::Lsh => "lsh",
            Opcode::Ash => "ash",
            Opcode::Tcu => "tcu",
            Opcode::Tcs => "tcs",
            Opcode::Set => "set",
            Opcode::Mov => "mov",
            Opcode::Ldw => "ldw",
            Opcode::Stw => "stw",
            Opcode::Ldb => "ldb",
            Opcode::Stb => "stb",
            Opcode::Brx => "brx",
            Opcode::Int => "int",
            Opcode::Hlt => "hlt",
        }
    }

    fn from_mnemonic(s: &str) -> Option<Opcode> {
        Some(match s {
            "nop" => Opcode::Nop,
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "and" => Opcode::And,
            "orr" => Opcode::Orr,
            "xor" => Opcode::Xor,
            "not" => Opcode::Not,
            "lsh" => Opcode::Lsh,
            "ash" => Opcode::Ash,
            "tcu" => Opcode::Tcu,
            "tcs" => Opcode::Tcs,
            "set" => Opcode::Set,
            "mov" => Opcode::Mov,
            "ldw" => Opcode::Ldw,
            "stw" => Opcode::Stw,
            "ldb" => Opcode::Ldb,
            "stb" => Opcode::Stb,
            "brx" => Opcode::Brx,
            "int" => Opcode::Int,
            "hlt" => Opcode::Hlt,
            _ => return None,
        })
    }
}

/// Mnemonics the assembler lowers into one or more base instructions before
/// any base opcode ever reaches the wire. Never appears in a `CompiledProgram`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PseudoOp {
    Jmp,
    Jmi,
    Swp,
    Adi,
    Sbi,
    Psh,
    Pop,
    Cal,
    Ret,
}

impl PseudoOp {
    fn from_mnemonic(s: &str) -> Option<PseudoOp> {
        Some(match s {
            "jmp" => PseudoOp::Jmp,
            "jmi" => PseudoOp::Jmi,
            "swp" => PseudoOp::Swp,
            "adi" => PseudoOp::Adi,
            "sbi" => PseudoOp::Sbi,
            "psh" => PseudoOp::Psh,
            "pop" => PseudoOp::Pop,
            "cal" => PseudoOp::Cal,
            "ret" => PseudoOp::Ret,
            _ => return None,
        })
    }
}

/// Either half of the catalog: what a source-level mnemonic actually names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    Base(Opcode),
    Pseudo(PseudoOp),
}

/// Bitset over operand slots. R-flags mark register operands, I-flags mark
/// immediate operands; within a slot the two are mutually exclusive.
pub mod shape {
    pub const R1: u8 = 1 << 0;
    pub const R2: u8 = 1 << 1;
    pub const R3: u8 = 1 << 2;
    /// 24-bit immediate packed little-endian into a1|a2|a3.
    pub const I1: u8 = 1 << 3;
    /// 16-bit immediate packed little-endian into a2|a3.
    pub const I2: u8 = 1 << 4;
    /// 8-bit immediate in a3.
    pub const I3: u8 = 1 << 5;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MnemonicInfo {
    pub mnemonic: Mnemonic,
    pub shape: u8,
    /// Final byte size of the instruction stream this mnemonic lowers to.
    pub expanded_size: u32,
}

/// Looks up a mnemonic's catalog entry (base or pseudo). `None` for an
/// unrecognized mnemonic. Matching is case-insensitive at the call site;
/// this function itself expects the already-lowercased mnemonic text.
pub fn info(mnem: &str) -> Option<MnemonicInfo> {
    use shape::*;

    if let Some(op) = Opcode::from_mnemonic(mnem) {
        let s = match op {
            Opcode::Nop => 0,
            Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Orr | Opcode::Xor => R1 | R2 | R3,
            Opcode::Lsh | Opcode::Ash | Opcode::Tcu | Opcode::Tcs => R1 | R2 | R3,
            Opcode::Not => R1 | R2,
            Opcode::Set => R1 | I2,
            Opcode::Mov => R1 | R2,
            Opcode::Ldw | Opcode::Ldb => R1 | R2,
            Opcode::Stw | Opcode::Stb => R1 | R2,
            Opcode::Brx => R1 | R2,
            Opcode::Int => R1,
            Opcode::Hlt => 0,
        };
        return Some(MnemonicInfo {
            mnemonic: Mnemonic::Base(op),
            shape: s,
            expanded_size: 4,
        });
    }

    if let Some(op) = PseudoOp::from_mnemonic(mnem) {
        let (s, size) = match op {
            PseudoOp::Jmp => (R1, 4),
            PseudoOp::Jmi => (I2, 4),
            PseudoOp::Swp => (R1 | R2, 12),
            PseudoOp::Adi => (R1 | I2, 8),
            PseudoOp::Sbi => (R1 | I2, 8),
            PseudoOp::Psh => (R1, 12),
            PseudoOp::Pop => (R1, 12),
            PseudoOp::Cal => (I2, 24),
            PseudoOp::Ret => (0, 16),
        };
        return Some(MnemonicInfo {
            mnemonic: Mnemonic::Pseudo(op),
            shape: s,
            expanded_size: size,
        });
    }

    None
}

/// Looks up the catalog entry of an already-decoded base opcode.
pub fn info_of(opcode: Opcode) -> MnemonicInfo {
    info(opcode.mnemonic()).expect("every Opcode variant round-trips through its mnemonic")
}

/// Packs logical operand values (in source order, one per set shape bit)
/// into the three instruction byte slots. Panics if `operands` is shorter
/// than the number of slots `shape` requires — a parser/lowerer bug, not a
/// user-facing error.
pub fn encode_operands(shape: u8, operands: &[u32]) -> (u8, u8, u8) {
    use shape::*;

    let mut bytes = [0u8, 0u8, 0u8];
    let mut next = operands.iter();

    if shape & R1 != 0 {
        bytes[0] = *next.next().expect("missing operand for R1") as u8;
    }
    if shape & R2 != 0 {
        bytes[1] = *next.next().expect("missing operand for R2") as u8;
    }
    if shape & R3 != 0 {
        bytes[2] = *next.next().expect("missing operand for R3") as u8;
    }
    if shape & I1 != 0 {
        let v = *next.next().expect("missing operand for I1");
        let le = v.to_le_bytes();
        bytes[0] = le[0];
        bytes[1] = le[1];
        bytes[2] = le[2];
    } else if shape & I2 != 0 {
        let v = *next.next().expect("missing operand for I2") as u16;
        let le = v.to_le_bytes();
        bytes[1] = le[0];
        bytes[2] = le[1];
    } else if shape & I3 != 0 {
        bytes[2] = *next.next().expect("missing operand for I3") as u8;
    }

    (bytes[0], bytes[1], bytes[2])
}

/// Inverse of `encode_operands`: recovers the logical operand values from
/// an instruction's byte slots, used by the disassembler.
pub fn decode_operands(shape: u8, a1: u8, a2: u8, a3: u8) -> Vec<u32> {
    use shape::*;

    let mut out = Vec::with_capacity(3);
    if shape & R1 != 0 {
        out.push(a1 as u32);
    }
    if shape & R2 != 0 {
        out.push(a2 as u32);
    }
    if shape & R3 != 0 {
        out.push(a3 as u32);
    }
    if shape & I1 != 0 {
        out.push(u32::from_le_bytes([a1, a2, a3, 0]));
    } else if shape & I2 != 0 {
        out.push(u16::from_le_bytes([a2, a3]) as u32);
    } else if shape & I3 != 0 {
        out.push(a3 as u32);
    }
    out
}

/// Whether a logical operand slot holds a register index or an immediate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlotKind {
    Reg,
    Imm,
}

/// The kind of each logical operand, in source order, for a shape.
pub fn operand_kinds(shape: u8) -> Vec<SlotKind> {
    use shape::*;

    let mut kinds = Vec::with_capacity(3);
    if shape & R1 != 0 {
        kinds.push(SlotKind::Reg);
    }
    if shape & R2 != 0 {
        kinds.push(SlotKind::Reg);
    }
    if shape & R3 != 0 {
        kinds.push(SlotKind::Reg);
    }
    if shape & (I1 | I2 | I3) != 0 {
        kinds.push(SlotKind::Imm);
    }
    kinds
}

/// Number of logical source-level operands a shape expects.
pub fn operand_count(shape: u8) -> usize {
    use shape::*;
    let mut n = 0;
    if shape & R1 != 0 {
        n += 1;
    }
    if shape & R2 != 0 {
        n += 1;
    }
    if shape & R3 != 0 {
        n += 1;
    }
    if shape & (I1 | I2 | I3) != 0 {
        n += 1;
    }
    n
}

pub const REG_PC: u8 = 0;
pub const REG_AD: u8 = 29;
pub const REG_AT: u8 = 30;
pub const REG_SP: u8 = 31;
/// Sentinel for "register not yet assigned" used while parsing.
pub const REG_RX: u8 = 0xFF;

/// Resolves a register name (`pc`, `r1`..`r28`, `ad`, `at`, `sp`) to its
/// 5-bit index. Case-insensitive. `rx` is deliberately not accepted here:
/// it is the parser's internal "unassigned" sentinel (`REG_RX`), not a
/// register a source program can name — accepting it would let `0xFF`
/// round-trip into an operand byte and alias `SP` once `RegisterFile`
/// masks it with `& 0x1f`.
pub fn register_code(name: &str) -> Option<u8> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "pc" => return Some(REG_PC),
        "ad" => return Some(REG_AD),
        "at" => return Some(REG_AT),
        "sp" => return Some(REG_SP),
        _ => {}
    }
    let digits = lower.strip_prefix('r')?;
    let n: u8 = digits.parse().ok()?;
    if (1..=28).contains(&n) {
        Some(n)
    } else {
        None
    }
}

/// Renders a register index back to its canonical name. `None` for indices
/// outside the 32-entry file (other than the `rx` sentinel).
pub fn register_name(code: u8) -> Option<String> {
    match code {
        REG_PC => Some("pc".to_string()),
        REG_AD => Some("ad".to_string()),
        REG_AT => Some("at".to_string()),
        REG_SP => Some("sp".to_string()),
        REG_RX => Some("rx".to_string()),
        1..=28 => Some(format!("r{}", code)),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn base_mnemonic_round_trips() {
        let i = info("add").unwrap();
        assert_eq!(i.mnemonic, Mnemonic::Base(Opcode::Add));
        assert_eq!(i.expanded_size, 4);
    }

    #[test]
    fn pseudo_expanded_sizes_match_table() {
        assert_eq!(info("jmp").unwrap().expanded_size, 4);
        assert_eq!(info("swp").unwrap().expanded_size, 12);
        assert_eq!(info("adi").unwrap().expanded_size, 8);
        assert_eq!(info("psh").unwrap().expanded_size, 12);
        assert_eq!(info("pop").unwrap().expanded_size, 12);
        assert_eq!(info("cal").unwrap().expanded_size, 24);
        assert_eq!(info("ret").unwrap().expanded_size, 16);
    }

    #[test]
    fn unknown_mnemonic_is_none() {
        assert!(info("frobnicate").is_none());
    }

    #[test]
    fn encode_decode_operands_round_trip_for_set() {
        let shape = info("set").unwrap().shape;
        let (a1, a2, a3) = encode_operands(shape, &[3, 0xbeef]);
        assert_eq!((a1, a2, a3), (3, 0xef, 0xbe));
        assert_eq!(decode_operands(shape, a1, a2, a3), vec![3, 0xbeef]);
    }

    #[test]
    fn encode_decode_operands_round_trip_for_add() {
        let shape = info("add").unwrap().shape;
        let (a1, a2, a3) = encode_operands(shape, &[1, 2, 3]);
        assert_eq!((a1, a2, a3), (1, 2, 3));
        assert_eq!(decode_operands(shape, a1, a2, a3), vec![1, 2, 3]);
    }

    #[test]
    fn register_round_trip() {
        for code in 1u8..=28 {
            let name = register_name(code).unwrap();
            assert_eq!(register_code(&name), Some(code));
        }
        assert_eq!(register_code("sp"), Some(REG_SP));
        assert_eq!(register_code("R3"), Some(3));
        assert_eq!(register_code("r29"), None);
    }

    #[test]
    fn rx_sentinel_is_not_a_source_level_register_name() {
        assert_eq!(register_code("rx"), None);
        assert_eq!(register_code("RX"), None);
    }
}
