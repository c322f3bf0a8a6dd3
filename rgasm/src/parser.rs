//! Turns a token stream into a `SourceProgram`: statements with operands
//! that may still be label references, a resolved data blob, and a label
//! table recording the offset each `name:` definition was seen at.
//!
//! Offsets are tracked as a single running counter (bytes of `#d` data plus
//! expanded instruction sizes emitted so far) exactly as described for the
//! statement-offset pass — callers are expected to put their data directives
//! before the code that references them, the same convention the reference
//! toolchain's examples follow.

use rg::error::{Error, Result};
use rg::isa::{self, SlotKind};

use crate::ast::{MacroDef, ParamKind, RawStatement, SourceProgram, SourceStatement};
use crate::lexer::{class, Token};
use crate::value::ValueSource;

struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(tokens: &'a [Token]) -> TokenCursor<'a> {
        TokenCursor { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_any(&mut self, line: u32) -> Result<&'a Token> {
        self.advance().ok_or(Error::Parse {
            line,
            col: 0,
            message: "unexpected end of input".to_string(),
        })
    }

    fn expect_class(&mut self, mask: u16, what: &str) -> Result<&'a Token> {
        let (line, col) = self.peek().map(|t| (t.line, t.col)).unwrap_or((0, 0));
        let tok = self.expect_any(line)?;
        if tok.class & mask == 0 {
            return Err(Error::Parse {
                line,
                col,
                message: format!("expected {}, found {:?}", what, tok.text),
            });
        }
        Ok(tok)
    }

    fn expect_mark(&mut self, text: &str) -> Result<&'a Token> {
        let (line, col) = self.peek().map(|t| (t.line, t.col)).unwrap_or((0, 0));
        let tok = self.expect_any(line)?;
        if tok.class != class::MARK || tok.text != text {
            return Err(Error::Parse {
                line,
                col,
                message: format!("expected {:?}, found {:?}", text, tok.text),
            });
        }
        Ok(tok)
    }
}

/// Parses a full token stream into a `SourceProgram`.
pub fn parse(tokens: &[Token]) -> Result<SourceProgram> {
    let mut prog = SourceProgram::new();
    let mut offset: u32 = 0;

    // Statement 0 is reserved for the entry jump; finalize() below rewrites
    // it once the entry label's address is known.
    let entry_mnemonic = isa::info("nop").expect("nop is always in the catalog").mnemonic;
    prog.statements.push(SourceStatement {
        mnemonic: entry_mnemonic,
        operands: Vec::new(),
        line: 0,
    });
    offset += 4;

    let mut cur = TokenCursor::new(tokens);

    while let Some(tok) = cur.peek() {
        let start_line = tok.line;

        let result = if tok.class & class::DIRECTIVE != 0 {
            parse_directive(&mut cur, &mut prog, &mut offset)
        } else if tok.class & class::IDENTIFIER != 0 {
            let next = cur.peek_at(1);
            match next {
                Some(n) if n.class == class::MARK && n.text == ":" => {
                    parse_label(&mut cur, &mut prog, offset)
                }
                Some(n) if n.class == class::BIND => parse_macro_def(&mut cur, &mut prog),
                _ => parse_statement(&mut cur, &mut prog, &mut offset),
            }
        } else {
            Err(Error::Parse {
                line: tok.line,
                col: tok.col,
                message: format!("unexpected token {:?}", tok.text),
            })
        };

        // A recoverable parse error is logged and the offending statement is
        // skipped rather than aborting the whole parse; `status` tells the
        // caller the program didn't assemble cleanly.
        if let Err(err) = result {
            log::warn!("{}", err);
            prog.status += 1;
            skip_to_next_line(&mut cur, start_line);
        }
    }

    Ok(prog)
}

/// Advances past every remaining token on `line`, guaranteeing forward
/// progress even when the failed statement consumed nothing — this is what
/// lets `parse` resync at the next statement instead of looping forever.
fn skip_to_next_line(cur: &mut TokenCursor, line: u32) {
    while let Some(tok) = cur.peek() {
        if tok.line != line {
            break;
        }
        cur.advance();
    }
}

fn parse_label(cur: &mut TokenCursor, prog: &mut SourceProgram, offset: u32) -> Result<()> {
    let name_tok = cur.advance().expect("peeked");
    let name = name_tok.text.clone();
    cur.expect_mark(":")?;
    if prog.labels.contains_key(&name) {
        return Err(Error::Parse {
            line: name_tok.line,
            col: name_tok.col,
            message: format!("label {:?} defined more than once", name),
        });
    }
    prog.labels.insert(name, offset);
    Ok(())
}

fn parse_directive(cur: &mut TokenCursor, prog: &mut SourceProgram, offset: &mut u32) -> Result<()> {
    let tok = cur.advance().expect("peeked");
    match tok.text.as_str() {
        "#entry" => {
            cur.expect_mark(":")?;
            let name = cur.expect_class(class::IDENTIFIER, "label name")?;
            prog.entry_label = Some(name.text.clone());
        }
        "#d" => {
            cur.expect_class(class::PACK_START, "`\\`")?;
            let escape = cur.expect_any(tok.line)?;
            if escape.class == class::QUOT {
                let lit = cur.expect_any(tok.line)?;
                prog.data.extend_from_slice(lit.text.as_bytes());
                *offset += lit.text.len() as u32;
            } else if escape.class == class::ALPHA && escape.text == "x" {
                let hex_tok = cur.expect_any(tok.line)?;
                let bytes = util::hex::decode(&hex_tok.text).ok_or_else(|| Error::Parse {
                    line: hex_tok.line,
                    col: hex_tok.col,
                    message: format!("invalid hex data {:?}", hex_tok.text),
                })?;
                *offset += bytes.len() as u32;
                prog.data.extend(bytes);
            } else {
                return Err(Error::Parse {
                    line: escape.line,
                    col: escape.col,
                    message: format!("expected `\\x` or `\\'`, found {:?}", escape.text),
                });
            }
        }
        other => {
            return Err(Error::Parse {
                line: tok.line,
                col: tok.col,
                message: format!("unknown directive {:?}", other),
            })
        }
    }
    Ok(())
}

fn parse_macro_def(cur: &mut TokenCursor, prog: &mut SourceProgram) -> Result<()> {
    let name_tok = cur.advance().expect("peeked");
    let name = name_tok.text.clone();
    cur.expect_class(class::BIND, "`@`")?;

    let mut params = Vec::new();
    loop {
        match cur.peek() {
            Some(t) if t.class == class::MARK && t.text == ":" => {
                cur.advance();
                break;
            }
            Some(t) if t.class & class::IDENTIFIER != 0 => {
                let pname = t.text.clone();
                cur.advance();
                params.push((pname.clone(), ParamKind::from_name(&pname)));
            }
            _ => {
                return Err(Error::Parse {
                    line: name_tok.line,
                    col: name_tok.col,
                    message: format!("malformed macro header for {:?}", name),
                })
            }
        }
    }

    let mut body = Vec::new();
    loop {
        match cur.peek() {
            Some(t) if t.class == class::MARK && t.text == "::" => {
                cur.advance();
                break;
            }
            Some(t) if t.class & class::IDENTIFIER != 0 => {
                let mnem_tok = cur.advance().expect("peeked");
                let mnemonic = mnem_tok.text.to_ascii_lowercase();
                let info = isa::info(&mnemonic).ok_or_else(|| Error::Parse {
                    line: mnem_tok.line,
                    col: mnem_tok.col,
                    message: format!("unknown mnemonic {:?} in macro body", mnemonic),
                })?;
                let n = isa::operand_count(info.shape);
                let mut args = Vec::with_capacity(n);
                for _ in 0..n {
                    args.push(read_operand_raw(cur, mnem_tok.line)?);
                }
                body.push(RawStatement { mnemonic, args, line: mnem_tok.line });
            }
            Some(t) => {
                return Err(Error::Parse {
                    line: t.line,
                    col: t.col,
                    message: format!("unexpected token {:?} in macro body", t.text),
                })
            }
            None => {
                return Err(Error::Parse {
                    line: name_tok.line,
                    col: name_tok.col,
                    message: format!("macro {:?} never closed with `::`", name),
                })
            }
        }
    }

    if prog.macros.contains_key(&name) {
        log::warn!("macro {:?} redefined, last definition wins", name);
    }
    prog.macros.insert(name.clone(), MacroDef { name, params, body });
    Ok(())
}

fn parse_statement(cur: &mut TokenCursor, prog: &mut SourceProgram, offset: &mut u32) -> Result<()> {
    let mnem_tok = cur.advance().expect("peeked");
    let mnemonic = mnem_tok.text.to_ascii_lowercase();

    if let Some(info) = isa::info(&mnemonic) {
        let kinds = isa::operand_kinds(info.shape);
        let mut operands = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let raw = read_operand_raw(cur, mnem_tok.line)?;
            operands.push(parse_value(kind, &raw, mnem_tok.line)?);
        }
        prog.statements.push(SourceStatement {
            mnemonic: info.mnemonic,
            operands,
            line: mnem_tok.line,
        });
        *offset += info.expanded_size;
        return Ok(());
    }

    if let Some(macro_def) = prog.macros.get(&mnemonic).cloned() {
        let mut call_args = Vec::with_capacity(macro_def.params.len());
        for _ in 0..macro_def.params.len() {
            call_args.push(read_operand_raw(cur, mnem_tok.line)?);
        }

        for raw_stmt in &macro_def.body {
            let substituted: Vec<String> = raw_stmt
                .args
                .iter()
                .map(|a| {
                    macro_def
                        .params
                        .iter()
                        .position(|(n, _)| n == a)
                        .map(|idx| call_args[idx].clone())
                        .unwrap_or_else(|| a.clone())
                })
                .collect();

            let info = isa::info(&raw_stmt.mnemonic).ok_or_else(|| Error::Parse {
                line: raw_stmt.line,
                col: 0,
                message: format!("unknown mnemonic {:?} in macro body", raw_stmt.mnemonic),
            })?;
            let kinds = isa::operand_kinds(info.shape);
            let mut operands = Vec::with_capacity(kinds.len());
            for (kind, raw) in kinds.iter().zip(substituted.iter()) {
                operands.push(parse_value(*kind, raw, raw_stmt.line)?);
            }
            prog.statements.push(SourceStatement {
                mnemonic: info.mnemonic,
                operands,
                line: raw_stmt.line,
            });
            *offset += info.expanded_size;
        }
        return Ok(());
    }

    Err(Error::Parse {
        line: mnem_tok.line,
        col: mnem_tok.col,
        message: format!("unknown mnemonic {:?}", mnem_tok.text),
    })
}

/// Reads one operand's worth of tokens and renders it back to canonical
/// text: a label reference (`:name` plus an optional immediately-following
/// numeric offset) collapses to one string, anything else is just the
/// token's own text. This is the form both live parsing and macro-body
/// substitution work with.
fn read_operand_raw(cur: &mut TokenCursor, line: u32) -> Result<String> {
    let tok = cur.expect_any(line)?;
    if tok.class == class::MARK && tok.text == ":" {
        let name_tok = cur.expect_class(class::IDENTIFIER, "label name")?;
        let mut s = format!(":{}", name_tok.text);
        if let Some(off) = cur.peek() {
            if off.class == class::NUMERIC_CONSTANT {
                s.push_str(&off.text);
                cur.advance();
            }
        }
        Ok(s)
    } else {
        Ok(tok.text.clone())
    }
}

fn parse_value(kind: SlotKind, raw: &str, line: u32) -> Result<ValueSource> {
    match kind {
        SlotKind::Reg => {
            let code = isa::register_code(raw).ok_or_else(|| Error::Parse {
                line,
                col: 0,
                message: format!("unknown register {:?}", raw),
            })?;
            Ok(ValueSource::Immediate(code as u32))
        }
        SlotKind::Imm => {
            if let Some(rest) = raw.strip_prefix(':') {
                let (name, offset) = split_label_offset(rest, line)?;
                Ok(ValueSource::Label { name, offset })
            } else {
                Ok(ValueSource::Immediate(parse_numeric(raw, line)?))
            }
        }
    }
}

fn split_label_offset(rest: &str, line: u32) -> Result<(String, i32)> {
    match rest.find(|c| c == '$' || c == '.') {
        Some(idx) => {
            let name = rest[..idx].to_string();
            let offset = parse_numeric(&rest[idx..], line)? as i32;
            Ok((name, offset))
        }
        None => Ok((rest.to_string(), 0)),
    }
}

fn parse_numeric(raw: &str, line: u32) -> Result<u32> {
    if let Some(hex) = raw.strip_prefix('$') {
        u32::from_str_radix(hex, 16).map_err(|_| Error::Parse {
            line,
            col: 0,
            message: format!("invalid hex constant {:?}", raw),
        })
    } else if let Some(dec) = raw.strip_prefix('.') {
        dec.parse::<u32>().map_err(|_| Error::Parse {
            line,
            col: 0,
            message: format!("invalid decimal constant {:?}", raw),
        })
    } else {
        Err(Error::Parse {
            line,
            col: 0,
            message: format!("expected a numeric constant, found {:?}", raw),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::lex;
    use rg::isa::{Mnemonic, Opcode, PseudoOp};

    fn parse_src(src: &str) -> SourceProgram {
        parse(&lex(src)).unwrap()
    }

    #[test]
    fn reserves_entry_slot() {
        let prog = parse_src("hlt");
        assert_eq!(prog.statements[0].mnemonic, Mnemonic::Base(Opcode::Nop));
        assert_eq!(prog.statements[1].mnemonic, Mnemonic::Base(Opcode::Hlt));
    }

    #[test]
    fn parses_label_definition_and_reference() {
        let prog = parse_src("start: jmi :start");
        assert_eq!(prog.labels.get("start"), Some(&4));
        match &prog.statements[1].operands[0] {
            ValueSource::Label { name, offset } => {
                assert_eq!(name, "start");
                assert_eq!(*offset, 0);
            }
            other => panic!("expected label, got {:?}", other),
        }
    }

    #[test]
    fn parses_entry_directive() {
        let prog = parse_src("#entry :start\nstart: hlt");
        assert_eq!(prog.entry_label.as_deref(), Some("start"));
    }

    #[test]
    fn parses_hex_data_directive() {
        let prog = parse_src("#d \\x cafe");
        assert_eq!(prog.data, vec![0xca, 0xfe]);
    }

    #[test]
    fn parses_string_data_directive() {
        let prog = parse_src("#d \\' hi");
        assert_eq!(prog.data, b"hi".to_vec());
    }

    #[test]
    fn parses_register_and_immediate_operands() {
        let prog = parse_src("set r1 $cafe");
        assert_eq!(prog.statements[1].mnemonic, Mnemonic::Base(Opcode::Set));
        assert_eq!(prog.statements[1].operands[0], ValueSource::Immediate(1));
        assert_eq!(prog.statements[1].operands[1], ValueSource::Immediate(0xcafe));
    }

    #[test]
    fn odd_length_hex_pack_is_skipped_not_fatal() {
        let prog = parse_src("#d \\x caf\nhlt");
        assert_eq!(prog.status, 1);
        assert!(prog.data.is_empty());
        // The `hlt` statement on the next line still parsed.
        assert_eq!(prog.statements[1].mnemonic, Mnemonic::Base(Opcode::Hlt));
    }

    #[test]
    fn unknown_mnemonic_is_skipped_not_fatal() {
        let prog = parse_src("bogus r1\nhlt");
        assert_eq!(prog.status, 1);
        assert_eq!(prog.statements[1].mnemonic, Mnemonic::Base(Opcode::Hlt));
    }

    #[test]
    fn expands_macro_invocation() {
        let src = "inc @ ra : adi ra .1 :: \n inc r2";
        let prog = parse_src(src);
        assert_eq!(prog.statements[1].mnemonic, Mnemonic::Pseudo(PseudoOp::Adi));
        assert_eq!(prog.statements[1].operands[0], ValueSource::Immediate(2));
        assert_eq!(prog.statements[1].operands[1], ValueSource::Immediate(1));
    }
}
