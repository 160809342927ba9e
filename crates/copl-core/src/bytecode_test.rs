// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::{read_program, write_program, LoadError};
use crate::chunk::Chunk;
use crate::program::{FunctionBody, FunctionDef, Program};
use crate::value::Cell;
use std::io::Cursor;

fn sample_program() -> Program {
    let mut chunk = Chunk::new();
    chunk.emit(1);
    chunk.emit(2);
    chunk.add_name("x");
    chunk.add_constant(Cell::Int(7));
    chunk.add_constant(Cell::Float(1.5));
    chunk.add_constant(Cell::Str("hi".into()));
    chunk.add_constant(Cell::Bool(true));
    chunk.add_constant(Cell::Null);

    Program {
        functions: vec![
            FunctionDef {
                name: "main".to_string(),
                id: 0,
                arg_count: 0,
                is_lambda: false,
                body: FunctionBody::Script(chunk),
            },
            FunctionDef {
                name: "print".to_string(),
                id: 1,
                arg_count: 1,
                is_lambda: false,
                body: FunctionBody::Builtin,
            },
        ],
    }
}

#[test]
fn round_trip_preserves_every_field() {
    let program = sample_program();
    let mut buf = Vec::new();
    write_program(&mut buf, &program).unwrap();

    let loaded = read_program(&mut Cursor::new(buf)).unwrap();
    assert_eq!(loaded.functions.len(), 2);

    let main = loaded.find_by_name("main").unwrap();
    let FunctionBody::Script(chunk) = &main.body else {
        panic!("expected a script body");
    };
    assert_eq!(chunk.code, vec![1, 2]);
    assert_eq!(chunk.names, vec!["x"]);
    assert_eq!(chunk.constants.len(), 5);
    assert!(matches!(chunk.constants[0], Cell::Int(7)));
    assert!(matches!(chunk.constants[1], Cell::Float(v) if (v - 1.5).abs() < f64::EPSILON));
    assert!(matches!(&chunk.constants[2], Cell::Str(s) if s == "hi"));
    assert!(matches!(chunk.constants[3], Cell::Bool(true)));
    assert!(matches!(chunk.constants[4], Cell::Null));

    let print = loaded.find_by_name("print").unwrap();
    assert!(print.is_builtin());
}

#[test]
fn builtins_serialize_as_zero_length_stubs() {
    let program = sample_program();
    let mut buf = Vec::new();
    write_program(&mut buf, &program).unwrap();
    let loaded = read_program(&mut Cursor::new(buf)).unwrap();
    let print = loaded.find_by_name("print").unwrap();
    let FunctionBody::Builtin = &print.body else {
        panic!("expected a builtin stub");
    };
}

#[test]
fn bad_magic_is_rejected() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    let err = read_program(&mut Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, LoadError::BadMagic { found: 0xDEAD_BEEF }));
}
