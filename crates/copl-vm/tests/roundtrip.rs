// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Property tests for the bytecode round-trip and arithmetic-promotion
//! laws of §8: `load(save(compile(P)))` disassembles identically to
//! `compile(P)`, every constant pool round-trips losslessly, and integer
//! vs. float promotion in `+ - * /` matches the stated rules.

use copl_core::bytecode::{read_program, write_program};
use copl_core::{Chunk, FunctionBody, FunctionDef, Program};
use copl_vm::disassemble::disassemble_program;
use copl_vm::{BufferIo, Vm};
use proptest::prelude::*;

fn cell_strategy() -> impl Strategy<Value = copl_core::value::Cell> {
    use copl_core::value::Cell;
    prop_oneof![
        any::<i32>().prop_map(Cell::Int),
        // NaN disassembles to a string that never compares equal to
        // itself; restrict to finite, non-NaN doubles so the round-trip
        // assertion is meaningful.
        (-1e12..1e12).prop_map(Cell::Float),
        any::<bool>().prop_map(Cell::Bool),
        "[a-zA-Z0-9_ ]{0,16}".prop_map(Cell::Str),
        Just(Cell::Null),
    ]
}

fn program_with_constants(constants: Vec<copl_core::value::Cell>) -> Program {
    let chunk = Chunk {
        code: vec![copl_core::Opcode::Leave as i32],
        constants,
        names: Vec::new(),
    };
    Program {
        functions: vec![FunctionDef {
            name: "main".to_string(),
            id: 0,
            arg_count: 0,
            is_lambda: false,
            body: FunctionBody::Script(chunk),
        }],
    }
}

proptest! {
    /// *Bytecode round-trip*: `load(save(P))` disassembles identically to `P`.
    #[test]
    fn bytecode_round_trip_preserves_disassembly(constants in prop::collection::vec(cell_strategy(), 0..12)) {
        let program = program_with_constants(constants);
        let before = disassemble_program(&program);

        let mut bytes = Vec::new();
        write_program(&mut bytes, &program).expect("program serializes");
        let reloaded = read_program(&mut &bytes[..]).expect("program deserializes");
        let after = disassemble_program(&reloaded);

        prop_assert_eq!(before, after);
    }

    /// *Constant-pool preservation*: every constant appears, in order,
    /// with the same tag and payload after a round trip.
    #[test]
    fn constant_pool_preserves_order_and_count(constants in prop::collection::vec(cell_strategy(), 0..12)) {
        let program = program_with_constants(constants.clone());

        let mut bytes = Vec::new();
        write_program(&mut bytes, &program).expect("program serializes");
        let reloaded = read_program(&mut &bytes[..]).expect("program deserializes");

        let FunctionBody::Script(chunk) = &reloaded.functions[0].body else {
            panic!("main should still be a script");
        };
        prop_assert_eq!(chunk.constants.len(), constants.len());
        for (before, after) in constants.iter().zip(chunk.constants.iter()) {
            prop_assert_eq!(format!("{before:?}"), format!("{after:?}"));
        }
    }

    /// `int + int = int`; if either operand is a double the result is a
    /// double (§8's arithmetic semantics).
    #[test]
    fn integer_arithmetic_stays_integer(a in -1_000_000i32..1_000_000, b in -1_000_000i32..1_000_000) {
        let src = format!("def main() {{ println({a} + {b}); }}");
        let ast = copl_parser::parse(&src).expect("source parses");
        let output = copl_compiler::compile(&ast).expect("source compiles");
        let mut vm = Vm::new(output.program);
        let mut io = BufferIo::new();
        vm.run(&mut io).expect("program runs");
        prop_assert_eq!(io.output, format!("{}\n", a.wrapping_add(b)));
    }

    /// Mixing a float operand promotes the whole expression to a double,
    /// rendered with the builtin's fixed six decimal places.
    #[test]
    fn mixed_float_operand_promotes_to_double(a in -1000i32..1000) {
        let src = format!("def main() {{ println({a} + 0.0); }}");
        let ast = copl_parser::parse(&src).expect("source parses");
        let output = copl_compiler::compile(&ast).expect("source compiles");
        let mut vm = Vm::new(output.program);
        let mut io = BufferIo::new();
        vm.run(&mut io).expect("program runs");
        prop_assert_eq!(io.output, format!("{:.6}\n", f64::from(a)));
    }
}
