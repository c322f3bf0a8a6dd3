//! Label resolution: an out-of-band pass over already-lowered statements
//! that replaces every `ValueSource::Label` with the immediate it resolves
//! to. Kept separate from parsing so the label table can be complete (every
//! `name:` seen) before any reference is resolved, and separate from
//! lowering so pseudo-expansion never needs to know whether an operand is
//! symbolic yet.

use std::collections::HashMap;

use rg::isa::{self, Mnemonic, PseudoOp};

use crate::ast::SourceStatement;
use crate::value::ValueSource;

/// Rewrites the reserved statement 0 into the entry jump once the entry
/// label (if any) is known. With no `#entry` directive the slot stays a
/// `nop` and execution simply falls through into whatever follows it.
pub fn patch_entry(statements: &mut [SourceStatement], entry_label: Option<&str>) {
    if let Some(name) = entry_label {
        statements[0].mnemonic = Mnemonic::Pseudo(PseudoOp::Jmi);
        statements[0].operands = vec![ValueSource::Label { name: name.to_string(), offset: 0 }];
    }
}

/// Replaces every label reference with its resolved address. An unknown
/// label is logged and resolves to 0 rather than aborting assembly.
pub fn resolve(mut statements: Vec<SourceStatement>, labels: &HashMap<String, u32>) -> Vec<SourceStatement> {
    for stmt in &mut statements {
        for operand in &mut stmt.operands {
            if let ValueSource::Label { name, offset } = operand {
                let base = match labels.get(name) {
                    Some(addr) => *addr as i64,
                    None => {
                        log::warn!("{}:{}: unresolved label {:?}", stmt.line, 0, name);
                        0
                    }
                };
                let resolved = (base + *offset as i64).max(0) as u32;
                *operand = ValueSource::Immediate(resolved);
            }
        }
    }
    statements
}

/// Packs resolved statements into `(opcode, a1, a2, a3)` instruction bytes.
pub fn encode(statements: &[SourceStatement]) -> Vec<(u8, u8, u8, u8)> {
    statements
        .iter()
        .map(|stmt| {
            let opcode = match stmt.mnemonic {
                Mnemonic::Base(op) => op,
                Mnemonic::Pseudo(_) => unreachable!("pseudo opcode survived lowering"),
            };
            let info = isa::info_of(opcode);
            let values: Vec<u32> = stmt
                .operands
                .iter()
                .map(|o| o.clone().immediate().expect("label survived resolution"))
                .collect();
            let (a1, a2, a3) = isa::encode_operands(info.shape, &values);
            (opcode as u8, a1, a2, a3)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use rg::isa::{info, Opcode};

    #[test]
    fn resolves_known_label() {
        let mut labels = HashMap::new();
        labels.insert("start".to_string(), 8u32);
        let stmts = vec![SourceStatement {
            mnemonic: info("jmi").unwrap().mnemonic,
            operands: vec![ValueSource::Label { name: "start".to_string(), offset: 4 }],
            line: 1,
        }];
        let resolved = resolve(stmts, &labels);
        assert_eq!(resolved[0].operands[0], ValueSource::Immediate(12));
    }

    #[test]
    fn unknown_label_resolves_to_zero() {
        let labels = HashMap::new();
        let stmts = vec![SourceStatement {
            mnemonic: info("jmi").unwrap().mnemonic,
            operands: vec![ValueSource::Label { name: "missing".to_string(), offset: 0 }],
            line: 1,
        }];
        let resolved = resolve(stmts, &labels);
        assert_eq!(resolved[0].operands[0], ValueSource::Immediate(0));
    }

    #[test]
    fn patch_entry_rewrites_placeholder() {
        let mut stmts = vec![SourceStatement {
            mnemonic: info("nop").unwrap().mnemonic,
            operands: vec![],
            line: 0,
        }];
        patch_entry(&mut stmts, Some("start"));
        assert!(matches!(stmts[0].mnemonic, Mnemonic::Pseudo(_)));
    }

    #[test]
    fn encode_packs_base_instructions() {
        let stmts = vec![SourceStatement {
            mnemonic: info("hlt").unwrap().mnemonic,
            operands: vec![],
            line: 0,
        }];
        let bytes = encode(&stmts);
        assert_eq!(bytes, vec![(Opcode::Hlt as u8, 0, 0, 0)]);
    }
}
