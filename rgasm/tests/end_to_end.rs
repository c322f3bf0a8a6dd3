//! Assembles source text and runs it through the emulator core in-process,
//! covering full lex→parse→lower→resolve→encode→execute round trips.

use std::io::Cursor;

use rg::processor::Core;
use rg::Emulator;

fn run_to_completion(src: &str) -> Emulator {
    let program = rgasm::assemble(src).expect("assembly failed");
    let mut emu = Emulator::load(&program).expect("load failed");
    let mut input = Cursor::new(Vec::new());
    emu.run(&mut input).expect("run failed");
    emu
}

#[test]
fn simple_add() {
    let emu = run_to_completion("set r1 .5 ; set r2 .7 ; add r3 r1 r2 ; hlt");
    assert_eq!(emu.registers.get(1), 5);
    assert_eq!(emu.registers.get(2), 7);
    assert_eq!(emu.registers.get(3), 12);
}

#[test]
fn unconditional_jump_loops_and_one_step_sets_r1() {
    let src = "#entry :start\nstart: set r1 .1\njmi :start";
    let program = rgasm::assemble(src).expect("assembly failed");
    let mut emu = Emulator::load(&program).expect("load failed");

    // The entry jump lands on `start`; one more step runs `set r1 .1`.
    Core::step(&mut emu.memory, &mut emu.registers).unwrap();
    Core::step(&mut emu.memory, &mut emu.registers).unwrap();
    assert_eq!(emu.registers.get(1), 1);
}

#[test]
fn push_pop_round_trip_restores_stack_pointer() {
    let sp_before = {
        let program = rgasm::assemble("hlt").unwrap();
        Emulator::load(&program).unwrap().registers.sp()
    };
    let emu = run_to_completion("set r1 .$cafe ; psh r1 ; set r1 .0 ; pop r2 ; hlt");
    assert_eq!(emu.registers.get(2), 0xcafe);
    assert_eq!(emu.registers.sp(), sp_before);
}

#[test]
fn swap_exchanges_two_registers() {
    let emu = run_to_completion("set r1 .3 ; set r2 .9 ; swp r1 r2 ; hlt");
    assert_eq!(emu.registers.get(1), 9);
    assert_eq!(emu.registers.get(2), 3);
}

#[test]
fn call_and_return_restores_stack_pointer() {
    let sp_before = {
        let program = rgasm::assemble("hlt").unwrap();
        Emulator::load(&program).unwrap().registers.sp()
    };
    let src = "start: cal :sub\nhlt\nsub: set r1 .42\nret";
    let emu = run_to_completion(src);
    assert_eq!(emu.registers.get(1), 42);
    assert_eq!(emu.registers.sp(), sp_before);
}

#[test]
fn macro_expansion_increments_register() {
    let src = "inc @ ra : adi ra .1 ::\nset r1 .5 ; inc r1 ; hlt";
    let emu = run_to_completion(src);
    assert_eq!(emu.registers.get(1), 6);
}
