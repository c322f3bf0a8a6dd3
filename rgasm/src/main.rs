#[macro_use]
extern crate clap;

use clap::Arg;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::{Path, PathBuf};

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input source file to use")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .help("Sets the output image file to write to")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("compat")
                .long("compat")
                .help("Omits the header, writing a bare data+code blob"),
        )
        .arg(
            Arg::with_name("debug_tokens")
                .long("debug-tokens")
                .help("Dumps the lexed token stream to stderr and exits"),
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
    let output_path = PathBuf::from(matches.value_of("OUTPUT").unwrap());
    let compat = matches.is_present("compat");

    let source = match read_source(input_path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("reading {}: {}", input_path.display(), err);
            std::process::exit(1);
        }
    };

    if matches.is_present("debug_tokens") {
        for tok in rgasm::debug_tokens(&source) {
            eprintln!("{}:{}: {:?} {:?}", tok.line, tok.col, tok.class, tok.text);
        }
        return;
    }

    let program = match rgasm::assemble(&source) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };

    let code: Vec<u8> = program.instructions.iter().flat_map(|i| i.to_bytes()).collect();
    let image = rgfile::Image::from(program.data, code);

    if let Err(err) = rgfile::write_file(&output_path, &image, compat) {
        eprintln!("writing {}: {}", output_path.display(), err);
        std::process::exit(1);
    }
}

fn read_source(path: &Path) -> std::io::Result<String> {
    let mut buf = String::new();
    BufReader::new(File::open(path)?).read_to_string(&mut buf)?;
    Ok(buf)
}
