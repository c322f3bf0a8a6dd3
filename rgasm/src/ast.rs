//! The shapes the parser builds and the lowering/resolution passes consume.

use rg::isa::Mnemonic;
use std::collections::HashMap;

use crate::value::ValueSource;

/// A single instruction line, resolved to a concrete mnemonic but with
/// operands still possibly symbolic.
#[derive(Clone, Debug)]
pub struct SourceStatement {
    pub mnemonic: Mnemonic,
    pub operands: Vec<ValueSource>,
    pub line: u32,
}

/// Whether a macro's formal parameter stands for a register or a value,
/// decided by the first letter of its name (`r...` vs `v...`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Reg,
    Val,
}

impl ParamKind {
    pub fn from_name(name: &str) -> ParamKind {
        match name.chars().next() {
            Some('r') => ParamKind::Reg,
            _ => ParamKind::Val,
        }
    }
}

/// One line of a macro body, captured verbatim as text so it can be
/// re-parsed once formal parameters are substituted with call-site text.
#[derive(Clone, Debug)]
pub struct RawStatement {
    pub mnemonic: String,
    pub args: Vec<String>,
    pub line: u32,
}

#[derive(Clone, Debug)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<(String, ParamKind)>,
    pub body: Vec<RawStatement>,
}

/// The parser's output: an ordered instruction stream, the data blob
/// accumulated from `#d` directives, and the label table built while
/// walking the source. Statement 0 is always the reserved entry-jump slot.
#[derive(Clone, Debug, Default)]
pub struct SourceProgram {
    pub statements: Vec<SourceStatement>,
    pub data: Vec<u8>,
    pub labels: HashMap<String, u32>,
    pub macros: HashMap<String, MacroDef>,
    pub entry_label: Option<String>,
    pub status: i32,
}

impl SourceProgram {
    pub fn new() -> SourceProgram {
        SourceProgram::default()
    }
}
