//! Core of the `_ad` register machine: the instruction catalog, flat memory,
//! register file and decode/execute loop shared by the assembler, disassembler
//! and emulator crates.

extern crate num;
#[macro_use]
extern crate num_derive;

pub mod error;
pub mod isa;
pub mod memory;
pub mod processor;
pub mod register;

pub use error::{Error, Result};
pub use isa::Opcode;
pub use memory::{Memory, Storage};
pub use processor::{Emulator, ExitStatus, Interrupt};
pub use register::RegisterFile;

/// Memory is addressed with 32-bit words throughout the toolchain.
pub type Word = u32;

/// On-wire and in-emulator form of a single instruction: one opcode byte
/// followed by three operand bytes. Every instruction is exactly 4 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Instruction {
    pub opcode: u8,
    pub a1: u8,
    pub a2: u8,
    pub a3: u8,
}

impl Instruction {
    pub fn new(opcode: u8, a1: u8, a2: u8, a3: u8) -> Instruction {
        Instruction { opcode, a1, a2, a3 }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.opcode, self.a1, self.a2, self.a3]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Instruction {
        Instruction {
            opcode: bytes[0],
            a1: bytes[1],
            a2: bytes[2],
            a3: bytes[3],
        }
    }

    /// Packs a 16-bit immediate into the `a2|a3` slots (little-endian), used by `SET`.
    pub fn with_imm16(opcode: u8, rd: u8, imm: u16) -> Instruction {
        let bytes = imm.to_le_bytes();
        Instruction::new(opcode, rd, bytes[0], bytes[1])
    }

    /// Reads back a 16-bit immediate packed into `a2|a3`.
    pub fn imm16(self) -> u16 {
        u16::from_le_bytes([self.a2, self.a3])
    }
}

/// A fully lowered, symbol-resolved program: every opcode is a base opcode and
/// every operand is immediate. Ready for serialization by `rgfile` or direct
/// execution by `Emulator`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledProgram {
    pub instructions: Vec<Instruction>,
    pub data: Vec<u8>,
}

impl CompiledProgram {
    pub fn code_size(&self) -> usize {
        self.instructions.len() * 4
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }
}

pub const MEMORY_SIZE: u32 = 64 * 1024;
pub const REGISTER_COUNT: usize = 32;
pub const INSTRUCTION_SIZE: u32 = 4;
