// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::Frame;
use crate::chunk::Chunk;
use crate::program::{FunctionBody, FunctionDef};
use std::rc::Rc;

fn script_func() -> Rc<FunctionDef> {
    Rc::new(FunctionDef {
        name: "main".to_string(),
        id: 0,
        arg_count: 2,
        is_lambda: false,
        body: FunctionBody::Script(Chunk::new()),
    })
}

fn builtin_func() -> Rc<FunctionDef> {
    Rc::new(FunctionDef {
        name: "print".to_string(),
        id: 1,
        arg_count: 1,
        is_lambda: false,
        body: FunctionBody::Builtin,
    })
}

#[test]
fn new_picks_the_right_frame_kind() {
    assert!(matches!(Frame::new(script_func()), Frame::Script(_)));
    assert!(matches!(Frame::new(builtin_func()), Frame::Builtin(_)));
}

#[test]
fn script_frame_starts_with_an_empty_stack_and_pc_zero() {
    let Frame::Script(frame) = Frame::new(script_func()) else {
        panic!("expected a script frame");
    };
    assert!(frame.stack.is_empty());
    assert!(frame.locals.is_empty());
    assert_eq!(frame.pc, 0);
}

#[test]
fn meta_reports_the_shared_function_metadata() {
    let frame = Frame::new(script_func());
    let meta = frame.meta();
    assert_eq!(meta.name, "main");
    assert_eq!(meta.arg_count, 2);
}
