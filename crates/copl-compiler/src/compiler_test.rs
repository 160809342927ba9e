// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::{compile, CompileError, CompileOutput};
use copl_core::{Chunk, FunctionBody, Opcode};
use copl_parser::parse;

fn compile_src(src: &str) -> CompileOutput {
    let ast = parse(src).expect("source parses");
    compile(&ast).expect("source compiles")
}

fn chunk_of<'a>(output: &'a CompileOutput, name: &str) -> &'a Chunk {
    let def = output
        .program
        .functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no function named '{name}'"));
    match &def.body {
        FunctionBody::Script(chunk) => chunk,
        FunctionBody::Builtin => panic!("'{name}' is a builtin, not a script"),
    }
}

#[test]
fn builtins_occupy_the_first_function_ids() {
    let output = compile_src("def main() {}");
    let names: Vec<&str> = output.program.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names[..9].to_vec(),
        vec!["print", "println", "input", "debug", "append", "size", "str2int", "not_null", "read_file"]
    );
    assert_eq!(names.last(), Some(&"main"));
}

#[test]
fn parameters_are_bound_by_name_before_the_body_runs() {
    let output = compile_src("def add(a: int, b: int) -> int { return a + b; }");
    let chunk = chunk_of(&output, "add");
    // SET_NAME a, SET_NAME b, then the body.
    assert_eq!(chunk.code[0], Opcode::SetName as i32);
    let a_name_idx = chunk.code[1];
    assert_eq!(chunk.code[2], Opcode::SetName as i32);
    let b_name_idx = chunk.code[3];
    assert_ne!(a_name_idx, b_name_idx);
    assert_eq!(chunk.names[a_name_idx as usize], "a");
    assert_eq!(chunk.names[b_name_idx as usize], "b");
}

#[test]
fn constructor_binds_this_before_its_declared_parameters() {
    let src = "class Point { x: int; y: int; def constructor(x: int, y: int) { this.x = x; this.y = y; } } \
               def main() { let p: Point = new Point(1, 2); }";
    let output = compile_src(src);
    let chunk = chunk_of(&output, "Point$constructor");
    assert_eq!(chunk.code[0], Opcode::SetName as i32);
    assert_eq!(chunk.names[chunk.code[1] as usize], "this");
    assert_eq!(chunk.code[2], Opcode::SetName as i32);
    assert_eq!(chunk.names[chunk.code[3] as usize], "x");
}

#[test]
fn plain_methods_are_not_qualified_by_class_name() {
    let src = "class Point { x: int; def move(dx: int) { this.x += dx; } } \
               def main() { let p: Point = new Point(); p.move(5); }";
    let output = compile_src(src);
    assert!(output.program.functions.iter().any(|f| f.name == "move"));
    assert!(!output.program.functions.iter().any(|f| f.name == "Point$move"));
}

#[test]
fn a_true_method_call_pushes_the_receiver_and_calls_by_id() {
    let src = "class Point { x: int; def get_x() -> int { return this.x; } } \
               def main() { let p: Point = new Point(); let v: int = p.get_x(); }";
    let output = compile_src(src);
    let main_chunk = chunk_of(&output, "main");
    assert!(main_chunk.code.contains(&(Opcode::Call as i32)));
    assert!(!main_chunk.code.contains(&(Opcode::SpecialCall as i32)));
}

#[test]
fn member_read_of_a_primitive_field_is_followed_by_a_copy() {
    let src = "class Point { x: int; def constructor() {} } \
               def main() { let p: Point = new Point(); let v: int = p.x; }";
    let output = compile_src(src);
    let main_chunk = chunk_of(&output, "main");
    let member_get_pos = main_chunk
        .code
        .iter()
        .position(|&w| w == Opcode::MemberGet as i32)
        .expect("a MEMBER_GET was emitted");
    // MEMBER_GET <offset> COPY
    assert_eq!(main_chunk.code[member_get_pos + 2], Opcode::Copy as i32);
}

#[test]
fn lambda_typed_field_calls_dispatch_through_special_call() {
    let src = "class Box { f: lambda -> int; def constructor(f: lambda -> int) { this.f = f; } } \
               def main() { let b: Box = new Box($(x: int) -> int { return x * x; }); b.f(3); }";
    let output = compile_src(src);
    let main_chunk = chunk_of(&output, "main");
    assert!(main_chunk.code.contains(&(Opcode::SpecialCall as i32)));
}

#[test]
fn appending_to_a_bare_string_local_stores_the_result_back() {
    let src = r#"def main() { let s: string = "a"; append("b", s); }"#;
    let output = compile_src(src);
    let main_chunk = chunk_of(&output, "main");
    // The append call must be followed by a SET_NAME writing the
    // concatenation result back into `s`, not just a discarded POP.
    let append_id = output
        .program
        .functions
        .iter()
        .find(|f| f.name == "append")
        .unwrap()
        .id as i32;
    assert!(main_chunk.code.windows(2).any(|w| w == [Opcode::Call as i32, append_id]));
    assert!(main_chunk.code.contains(&(Opcode::SetName as i32)));
}

#[test]
fn unknown_function_call_is_a_compile_error() {
    let src = "def main() { nonexistent(1, 2); }";
    let ast = parse(src).unwrap();
    let err = compile(&ast).unwrap_err();
    assert_eq!(err, CompileError::UnknownFunction("nonexistent".to_string()));
}

#[test]
fn this_outside_a_method_is_a_compile_error() {
    let src = "def main() { let x: int = this.foo; }";
    let ast = parse(src).unwrap();
    assert!(matches!(compile(&ast), Err(CompileError::ThisOutsideMethod)));
}

#[test]
fn duplicate_class_declarations_are_rejected() {
    let src = "class Point { x: int; } class Point { y: int; } def main() {}";
    let ast = parse(src).unwrap();
    assert_eq!(
        compile(&ast).unwrap_err(),
        CompileError::DuplicateClass("Point".to_string())
    );
}

#[test]
fn break_outside_a_loop_is_a_compile_error() {
    let src = "def main() { break; }";
    let ast = parse(src).unwrap();
    assert_eq!(compile(&ast).unwrap_err(), CompileError::BreakOutsideLoop);
}

#[test]
fn for_loop_compiles_init_condition_step_and_body_in_order() {
    let output = compile_src("def main() { for (let i: int = 0; i < 3; i = i + 1) { print(i); } }");
    let chunk = chunk_of(&output, "main");
    assert!(chunk.code.contains(&(Opcode::JumpIfFalse as i32)));
    assert!(chunk.code.contains(&(Opcode::Jump as i32)));
}

#[test]
fn module_method_calls_use_load_module_method_and_special_call() {
    let src = r#"import "math.coplc" as math; def main() { math.square(3); }"#;
    let output = compile_src(src);
    assert_eq!(output.modules.len(), 1);
    assert_eq!(output.modules[0].alias, "math");
    let chunk = chunk_of(&output, "main");
    assert!(chunk.code.contains(&(Opcode::LoadModuleMethod as i32)));
    assert!(chunk.code.contains(&(Opcode::SpecialCall as i32)));
}
