//! Disassembles an `rg` binary image: header summary followed by one line
//! per instruction, mnemonic and operands rendered the way `rgasm` would
//! have written them (register names, `$hex` immediates).

#[macro_use]
extern crate clap;

use clap::Arg;
use num_traits::FromPrimitive;
use rg::isa::{self, Opcode, SlotKind};
use std::path::Path;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the binary image file to disassemble")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("raw")
                .long("raw")
                .help("Suppresses the leading address on each line"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Increases logging verbosity"),
        )
        .get_matches();

    let level = match matches.occurrences_of("v") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let input_path = Path::new(matches.value_of("INPUT").unwrap());
    let raw = matches.is_present("raw");

    let image = match rgfile::read_file(input_path) {
        Ok(img) => img,
        Err(err) => {
            eprintln!("reading {}: {}", input_path.display(), err);
            std::process::exit(1);
        }
    };

    println!("entry:      ${:04x}", image.entry());
    println!("code size:  ${:04x}", image.code.len());
    println!("data size:  ${:04x}", image.data.len());

    if image.code.len() % 4 != 0 {
        eprintln!("code size {} is not a multiple of 4", image.code.len());
        std::process::exit(2);
    }

    for (i, chunk) in image.code.chunks_exact(4).enumerate() {
        let addr = image.entry() + (i as u32) * 4;
        let line = match disassemble_one(chunk[0], chunk[1], chunk[2], chunk[3]) {
            Some(text) => text,
            None => format!("<invalid opcode ${:02x}>", chunk[0]),
        };
        if raw {
            println!("{}", line);
        } else {
            println!("${:04x}: {}", addr, line);
        }
    }
}

fn disassemble_one(op: u8, a1: u8, a2: u8, a3: u8) -> Option<String> {
    let opcode = Opcode::from_u8(op)?;
    let info = isa::info_of(opcode);
    let values = isa::decode_operands(info.shape, a1, a2, a3);
    let kinds = isa::operand_kinds(info.shape);

    let mut parts = vec![opcode.mnemonic().to_string()];
    for (kind, value) in kinds.iter().zip(values.iter()) {
        let text = match kind {
            SlotKind::Reg => isa::register_name(*value as u8).unwrap_or_else(|| format!("r?{}", value)),
            SlotKind::Imm => format!("${:x}", value),
        };
        parts.push(text);
    }
    Some(parts.join(" "))
}
