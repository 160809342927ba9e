// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::{FunctionBody, FunctionDef, Program};
use crate::chunk::Chunk;

fn script_fn(name: &str, id: u32) -> FunctionDef {
    FunctionDef {
        name: name.to_string(),
        id,
        arg_count: 0,
        is_lambda: false,
        body: FunctionBody::Script(Chunk::new()),
    }
}

#[test]
fn find_by_id_and_name_both_work() {
    let program = Program {
        functions: vec![script_fn("main", 0), script_fn("helper", 1)],
    };
    assert_eq!(program.find_by_id(1).unwrap().name, "helper");
    assert_eq!(program.find_by_name("main").unwrap().id, 0);
    assert!(program.find_by_id(2).is_none());
}

#[test]
fn is_builtin_reflects_the_function_body() {
    let builtin = FunctionDef {
        name: "print".to_string(),
        id: 0,
        arg_count: 1,
        is_lambda: false,
        body: FunctionBody::Builtin,
    };
    assert!(builtin.is_builtin());
    assert!(!script_fn("main", 0).is_builtin());
}
