//! The `Emulator` facade: loading an image, running it to completion or
//! fault, and servicing the interrupt table on top of the bare `Core` loop.

pub mod core;

pub use self::core::{Core, StepOutcome};

use std::io::BufRead;

use crate::error::{Error, Result};
use crate::isa::register_name;
use crate::memory::{Memory, Storage};
use crate::register::RegisterFile;
use crate::{CompiledProgram, MEMORY_SIZE};

/// Interrupt numbers a running program can raise via `INT`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Interrupt {
    Pause,
    DumpCpu,
    DumpMem,
    DumpStack,
    Unknown(u8),
}

impl Interrupt {
    fn from_u8(v: u8) -> Interrupt {
        match v {
            0x01 => Interrupt::Pause,
            0x02 => Interrupt::DumpCpu,
            0x03 => Interrupt::DumpMem,
            0x04 => Interrupt::DumpStack,
            other => Interrupt::Unknown(other),
        }
    }
}

/// Terminal state a run ends in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitStatus {
    Halted,
    Paused,
}

pub struct Emulator {
    pub memory: Memory,
    pub registers: RegisterFile,
    pub debug: bool,
    pub onestep: bool,
    ticks: u64,
}

impl Emulator {
    /// Lays out `program` at address zero (data, then code) in a fresh
    /// memory image sized to `MEMORY_SIZE` and seeds the register file.
    pub fn load(program: &CompiledProgram) -> Result<Emulator> {
        Self::load_sized(program, MEMORY_SIZE)
    }

    pub fn load_sized(program: &CompiledProgram, mem_size: u32) -> Result<Emulator> {
        let mut code = Vec::with_capacity(program.code_size());
        for instr in &program.instructions {
            code.extend_from_slice(&instr.to_bytes());
        }
        let memory = Memory::from_image(&program.data, &code, mem_size)?;
        let registers = RegisterFile::new(mem_size);
        Ok(Emulator {
            memory,
            registers,
            debug: false,
            onestep: false,
            ticks: 0,
        })
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs until `HLT`, a `PAUSE` interrupt, or a fault. `input` feeds the
    /// onestep prompt when `self.onestep` is set; tests pass an in-memory
    /// buffer instead of stdin.
    pub fn run<R: BufRead>(&mut self, input: &mut R) -> Result<ExitStatus> {
        loop {
            if self.onestep {
                self.await_step(input)?;
            }
            let outcome = Core::step(&mut self.memory, &mut self.registers)?;
            if self.debug {
                self.dump_abbreviated();
            }
            match outcome {
                StepOutcome::Continue => {}
                StepOutcome::Halted => return Ok(ExitStatus::Halted),
                StepOutcome::Interrupt(code) => {
                    if let Some(status) = self.service_interrupt(code)? {
                        return Ok(status);
                    }
                }
            }
            self.ticks += 1;
        }
    }

    fn await_step<R: BufRead>(&self, input: &mut R) -> Result<()> {
        let mut line = String::new();
        input.read_line(&mut line)?;
        Ok(())
    }

    /// Returns `Some(status)` when the interrupt ends the run, `None` to
    /// keep executing.
    fn service_interrupt(&mut self, code: u8) -> Result<Option<ExitStatus>> {
        match Interrupt::from_u8(code) {
            Interrupt::Pause => Ok(Some(ExitStatus::Paused)),
            Interrupt::DumpCpu => {
                self.dump_cpu();
                Ok(None)
            }
            Interrupt::DumpMem => {
                self.dump_mem();
                Ok(None)
            }
            Interrupt::DumpStack => {
                self.dump_stack();
                Ok(None)
            }
            Interrupt::Unknown(n) => {
                log::warn!("unhandled interrupt {:#04x}", n);
                Ok(None)
            }
        }
    }

    /// One-line per-instruction trace: PC and tick count, at `log::trace!`
    /// so it stays quiet unless verbosity is cranked past the full dumps.
    fn dump_abbreviated(&self) {
        log::trace!("tick {}: pc=${:04x}", self.ticks, self.registers.pc());
    }

    /// Formats every register as `{name:>5}: ${value:08x}` via `log::debug!`.
    pub fn dump_cpu(&self) {
        for (index, value) in self.registers.iter() {
            let name = register_name(index).unwrap_or_else(|| format!("r{}", index));
            log::debug!("{:>5}: ${:08x}", name, value);
        }
    }

    pub fn dump_mem(&self) {
        for (addr, byte) in self.memory.as_slice().iter().enumerate() {
            if addr % 16 == 0 {
                log::debug!("{:04x}:", addr);
            }
            log::trace!("  {:02x}", byte);
        }
    }

    /// Formats every stacked word from the current `SP` up to the initial
    /// top-of-stack as `${addr:04x}: ${word:08x}`.
    pub fn dump_stack(&self) {
        let sp = self.registers.sp();
        let top = self.memory.length().saturating_sub(4);
        let mut addr = sp;
        while addr <= top {
            if let Ok(word) = self.memory.read_word(addr) {
                log::debug!("${:04x}: ${:08x}", addr, word);
            }
            addr += 4;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isa::Opcode;
    use crate::Instruction;
    use std::io::Cursor;

    fn program(instrs: Vec<Instruction>) -> CompiledProgram {
        CompiledProgram {
            instructions: instrs,
            data: vec![],
        }
    }

    #[test]
    fn halts_on_hlt() {
        let prog = program(vec![Instruction::new(Opcode::Hlt as u8, 0, 0, 0)]);
        let mut emu = Emulator::load(&prog).unwrap();
        let mut input = Cursor::new(Vec::new());
        assert_eq!(emu.run(&mut input).unwrap(), ExitStatus::Halted);
    }

    #[test]
    fn pause_interrupt_suspends_run() {
        let prog = program(vec![
            Instruction::new(Opcode::Set as u8, 1, 0x01, 0x00),
            Instruction::new(Opcode::Int as u8, 1, 0, 0),
            Instruction::new(Opcode::Hlt as u8, 0, 0, 0),
        ]);
        let mut emu = Emulator::load(&prog).unwrap();
        let mut input = Cursor::new(Vec::new());
        assert_eq!(emu.run(&mut input).unwrap(), ExitStatus::Paused);
    }

    #[test]
    fn unknown_interrupt_is_logged_and_ignored() {
        let prog = program(vec![
            Instruction::new(Opcode::Set as u8, 1, 0xff, 0x00),
            Instruction::new(Opcode::Int as u8, 1, 0, 0),
            Instruction::new(Opcode::Hlt as u8, 0, 0, 0),
        ]);
        let mut emu = Emulator::load(&prog).unwrap();
        let mut input = Cursor::new(Vec::new());
        assert_eq!(emu.run(&mut input).unwrap(), ExitStatus::Halted);
    }

    #[test]
    fn invalid_opcode_is_a_fatal_trap() {
        let prog = program(vec![Instruction::new(0xfe, 0, 0, 0)]);
        let mut emu = Emulator::load(&prog).unwrap();
        let mut input = Cursor::new(Vec::new());
        match emu.run(&mut input) {
            Err(Error::Execute { .. }) => {}
            other => panic!("expected Execute error, got {:?}", other),
        }
    }
}
