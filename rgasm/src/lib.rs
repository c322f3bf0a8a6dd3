//! Assembler for the `rg` register machine.
//!
//! `assemble` takes a source string through five stages — lex, parse, lower
//! (pseudo opcodes into base instructions), resolve (labels into addresses),
//! encode (into instruction bytes) — and produces a [`rg::CompiledProgram`]
//! ready to be written out by `rgfile`.
//!
//! ## Source language
//!
//! A program is a sequence of statements separated by whitespace. Comments
//! start with `;` and run to end of line.
//!
//! - `name:` defines a label at the current address.
//! - `:name`, optionally followed by `$hexoffset` or `.decoffset`, references
//!   a label's address.
//! - `#entry :name` marks the label execution should start at; the
//!   assembler emits the jump that gets there as the very first instruction.
//! - `#d \x <hex>` appends raw bytes decoded from a hex string to the data
//!   blob; `#d \' <token>` appends a token's literal bytes.
//! - `name @ param... : body... ::` defines a macro. Each parameter starting
//!   with `r` stands for a register, otherwise a value; invoking the macro
//!   substitutes call-site text for matching parameter names in the body.
//! - Anything else is `mnemonic operand operand operand`, either a base
//!   opcode or a pseudo opcode the lowering pass expands.
//!
//! Registers are named `pc`, `r1`..`r28`, `ad`, `at`, `sp`. Numeric constants
//! are `$hex` or `.decimal`.

mod ast;
mod lexer;
mod lower;
mod parser;
mod resolve;
mod value;

pub use ast::{MacroDef, ParamKind, RawStatement, SourceProgram, SourceStatement};
pub use lexer::{lex, Token};
pub use value::ValueSource;

use rg::error::{Error, Result};
use rg::{CompiledProgram, Instruction};

/// Runs the full pipeline: lex, parse, lower, resolve, encode.
///
/// Parsing itself never aborts on a bad statement — it logs, skips, and
/// keeps going so a caller dumping `debug_tokens`/partial diagnostics still
/// sees as much of the program as possible. `assemble` is the point that
/// turns an accumulated nonzero `status` into the hard failure callers
/// (the `asm` binary, `tests/end_to_end.rs`) actually see.
pub fn assemble(input: &str) -> Result<CompiledProgram> {
    let tokens = lex(input);
    let mut program = parser::parse(&tokens)?;
    if program.status != 0 {
        return Err(Error::Parse {
            line: 0,
            col: 0,
            message: format!("{} statement(s) failed to parse", program.status),
        });
    }

    resolve::patch_entry(&mut program.statements, program.entry_label.as_deref());
    let lowered = lower::lower(program.statements);
    let resolved = resolve::resolve(lowered, &program.labels);
    let encoded = resolve::encode(&resolved);

    let instructions = encoded
        .into_iter()
        .map(|(opcode, a1, a2, a3)| Instruction::new(opcode, a1, a2, a3))
        .collect();

    Ok(CompiledProgram { instructions, data: program.data })
}

/// Lexes `input` and returns its tokens without parsing further, for
/// `asm --debug-tokens`.
pub fn debug_tokens(input: &str) -> Vec<Token> {
    lex(input)
}

#[cfg(test)]
mod test {
    use super::*;
    use rg::isa::Opcode;

    #[test]
    fn assembles_a_halt_program() {
        let prog = assemble("hlt").unwrap();
        assert_eq!(prog.instructions.len(), 2);
        assert_eq!(prog.instructions[1].opcode, Opcode::Hlt as u8);
    }

    #[test]
    fn assembles_unconditional_jump_with_entry() {
        let src = "#entry :loop\nloop: jmi :loop";
        let prog = assemble(src).unwrap();
        // statement 0: jmi :loop -> set pc, loop_addr
        assert_eq!(prog.instructions[0].opcode, Opcode::Set as u8);
    }

    #[test]
    fn assembles_push_pop_round_trip() {
        let src = "psh r1\npop r2";
        let prog = assemble(src).unwrap();
        // entry placeholder (nop) + psh (3) + pop (3)
        assert_eq!(prog.instructions.len(), 1 + 3 + 3);
    }

    #[test]
    fn assembles_swap() {
        let prog = assemble("swp r1 r2").unwrap();
        assert_eq!(prog.instructions.len(), 1 + 3);
        assert!(prog.instructions[1..].iter().all(|i| i.opcode == Opcode::Mov as u8));
    }

    #[test]
    fn assembles_call_and_return() {
        let src = "start: cal :callee\nhlt\ncallee: ret";
        let prog = assemble(src).unwrap();
        assert!(prog.instructions.len() > 1);
    }

    #[test]
    fn assembles_macro_expansion() {
        let src = "inc @ ra : adi ra .1 ::\ninc r1";
        let prog = assemble(src).unwrap();
        // entry placeholder + set at,1 + add r1,r1,at
        assert_eq!(prog.instructions.len(), 1 + 2);
        assert_eq!(prog.instructions[1].opcode, Opcode::Set as u8);
        assert_eq!(prog.instructions[2].opcode, Opcode::Add as u8);
    }

    #[test]
    fn assembles_hex_data_directive() {
        let prog = assemble("#d \\x cafe\nhlt").unwrap();
        assert_eq!(prog.data, vec![0xca, 0xfe]);
    }

    #[test]
    fn fails_assembly_when_a_statement_did_not_parse() {
        assert!(assemble("bogus r1\nhlt").is_err());
    }
}
