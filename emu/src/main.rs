#[macro_use]
extern crate clap;

use clap::Arg;
use rg::{CompiledProgram, Emulator, Instruction};
use std::io;
use std::path::Path;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the binary image file to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("step")
                .long("step")
                .help("Pauses after every instruction for one line of input"),
        )
        .arg(
            Arg::with_name("nodbg")
                .long("nodbg")
                .help("Suppresses per-instruction trace dumps"),
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
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let input_path = Path::new(matches.value_of("INPUT").unwrap());

    let image = match rgfile::read_file(input_path) {
        Ok(img) => img,
        Err(err) => {
            eprintln!("reading {}: {}", input_path.display(), err);
            std::process::exit(1);
        }
    };

    let instructions = image
        .code
        .chunks_exact(4)
        .map(|c| Instruction::from_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let entry = image.entry();
    let program = CompiledProgram { instructions, data: image.data };

    let mut emu = match Emulator::load(&program) {
        Ok(e) => e,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };
    emu.registers.set_pc(entry);
    emu.onestep = matches.is_present("step");
    emu.debug = !matches.is_present("nodbg");

    let stdin = io::stdin();
    let mut input = stdin.lock();

    match emu.run(&mut input) {
        Ok(status) => {
            println!("exit status: {:?}", status);
            println!("ticks: {}", emu.ticks());
        }
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    }
}
