//! Rewrites pseudo opcodes into the base-instruction sequences they stand
//! for. `cal`/`ret` expand into further pseudo opcodes (`psh`/`jmi`/`jmp`),
//! so this runs to a fixed point rather than in a single pass; the
//! catalog's deepest chain is two levels, so two passes always suffice.

use rg::isa::{self, Mnemonic, Opcode, PseudoOp};

use crate::ast::SourceStatement;
use crate::value::ValueSource;

const MAX_PASSES: usize = 2;

pub fn lower(statements: Vec<SourceStatement>) -> Vec<SourceStatement> {
    let mut current = statements;

    for _ in 0..MAX_PASSES {
        let mut next = Vec::with_capacity(current.len());
        let mut changed = false;

        for stmt in current {
            match stmt.mnemonic {
                Mnemonic::Pseudo(op) => {
                    changed = true;
                    next.extend(expand(op, &stmt.operands, stmt.line));
                }
                Mnemonic::Base(_) => next.push(stmt),
            }
        }

        current = next;
        if !changed {
            break;
        }
    }

    debug_assert!(
        current.iter().all(|s| matches!(s.mnemonic, Mnemonic::Base(_))),
        "pseudo opcode survived lowering"
    );
    current
}

fn reg(code: u8) -> ValueSource {
    ValueSource::Immediate(code as u32)
}

fn base(opcode: Opcode, operands: Vec<ValueSource>, line: u32) -> SourceStatement {
    SourceStatement { mnemonic: Mnemonic::Base(opcode), operands, line }
}

fn pseudo(op: PseudoOp, operands: Vec<ValueSource>, line: u32) -> SourceStatement {
    SourceStatement { mnemonic: Mnemonic::Pseudo(op), operands, line }
}

fn expand(op: PseudoOp, ops: &[ValueSource], line: u32) -> Vec<SourceStatement> {
    use isa::{REG_AD, REG_AT, REG_PC, REG_SP};

    match op {
        PseudoOp::Jmp => vec![base(Opcode::Mov, vec![reg(REG_PC), ops[0].clone()], line)],
        PseudoOp::Jmi => vec![base(Opcode::Set, vec![reg(REG_PC), ops[0].clone()], line)],
        PseudoOp::Swp => {
            let (ra, rb) = (ops[0].clone(), ops[1].clone());
            vec![
                base(Opcode::Mov, vec![reg(REG_AT), ra.clone()], line),
                base(Opcode::Mov, vec![ra.clone(), rb.clone()], line),
                base(Opcode::Mov, vec![rb, reg(REG_AT)], line),
            ]
        }
        PseudoOp::Adi => {
            let (ra, imm) = (ops[0].clone(), ops[1].clone());
            vec![
                base(Opcode::Set, vec![reg(REG_AT), imm], line),
                base(Opcode::Add, vec![ra.clone(), ra, reg(REG_AT)], line),
            ]
        }
        PseudoOp::Sbi => {
            let (ra, imm) = (ops[0].clone(), ops[1].clone());
            vec![
                base(Opcode::Set, vec![reg(REG_AT), imm], line),
                base(Opcode::Sub, vec![ra.clone(), ra, reg(REG_AT)], line),
            ]
        }
        PseudoOp::Psh => {
            let ra = ops[0].clone();
            vec![
                base(Opcode::Set, vec![reg(REG_AT), ValueSource::Immediate(4)], line),
                base(Opcode::Sub, vec![reg(REG_SP), reg(REG_SP), reg(REG_AT)], line),
                base(Opcode::Stw, vec![reg(REG_SP), ra], line),
            ]
        }
        PseudoOp::Pop => {
            let ra = ops[0].clone();
            vec![
                base(Opcode::Set, vec![reg(REG_AT), ValueSource::Immediate(4)], line),
                base(Opcode::Ldw, vec![ra, reg(REG_SP)], line),
                base(Opcode::Add, vec![reg(REG_SP), reg(REG_SP), reg(REG_AT)], line),
            ]
        }
        PseudoOp::Cal => {
            // The call target is a label/immediate address, not a register
            // (it reaches the lowerer as a `ValueSource::Label` or
            // `Immediate`), so the final jump is `jmi`, not `jmp`.
            let target = ops[0].clone();
            vec![
                base(Opcode::Set, vec![reg(REG_AT), ValueSource::Immediate(16)], line),
                base(Opcode::Add, vec![reg(REG_AD), reg(REG_AT), reg(REG_PC)], line),
                pseudo(PseudoOp::Psh, vec![reg(REG_AD)], line),
                pseudo(PseudoOp::Jmi, vec![target], line),
            ]
        }
        PseudoOp::Ret => vec![
            pseudo(PseudoOp::Pop, vec![reg(REG_AD)], line),
            pseudo(PseudoOp::Jmp, vec![reg(REG_AD)], line),
        ],
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rg::isa::info;

    fn stmt(mnem: &str, operands: Vec<ValueSource>) -> SourceStatement {
        SourceStatement { mnemonic: info(mnem).unwrap().mnemonic, operands, line: 1 }
    }

    #[test]
    fn jmp_lowers_to_a_single_mov() {
        let out = lower(vec![stmt("jmp", vec![reg(3)])]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].mnemonic, Mnemonic::Base(Opcode::Mov));
        assert_eq!(out[0].operands, vec![reg(isa::REG_PC), reg(3)]);
    }

    #[test]
    fn swp_lowers_to_three_movs() {
        let out = lower(vec![stmt("swp", vec![reg(1), reg(2)])]);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| s.mnemonic == Mnemonic::Base(Opcode::Mov)));
    }

    #[test]
    fn cal_lowers_fully_to_base_opcodes_in_two_passes() {
        let out = lower(vec![stmt("cal", vec![reg(4)])]);
        assert!(out.iter().all(|s| matches!(s.mnemonic, Mnemonic::Base(_))));
        // set at 16; add ad at pc; (psh ad -> set/sub/stw); (jmp r4 -> mov)
        assert_eq!(out.len(), 2 + 3 + 1);
    }

    #[test]
    fn ret_lowers_fully_to_base_opcodes() {
        let out = lower(vec![stmt("ret", vec![])]);
        assert!(out.iter().all(|s| matches!(s.mnemonic, Mnemonic::Base(_))));
        // pop ad -> set/ldw/add; jmp ad -> mov
        assert_eq!(out.len(), 3 + 1);
    }
}
