// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::parse;
use crate::ast::{BinOp, Expr, LValue, Stmt, TypeExpr};

#[test]
fn parses_a_function_with_a_return() {
    let program = parse("def fact(n: int) -> int { if (n <= 1) { return 1; } return n * fact(n - 1); }").unwrap();
    assert_eq!(program.functions.len(), 1);
    let f = &program.functions[0];
    assert_eq!(f.name, "fact");
    assert_eq!(f.params[0].ty, TypeExpr::Named("int".to_string()));
    assert_eq!(f.ret_ty, Some(TypeExpr::Named("int".to_string())));
    assert_eq!(f.body.len(), 2);
}

#[test]
fn parses_a_class_with_a_constructor() {
    let program = parse(
        "class Point { x: int; y: int; def constructor(x: int, y: int) { this.x = x; this.y = y; } }",
    )
    .unwrap();
    let class = &program.classes[0];
    assert_eq!(class.fields.len(), 2);
    assert_eq!(class.methods[0].name, "constructor");
}

#[test]
fn parses_array_literal_and_indexing() {
    let program = parse("def main() { let a: [int] = [1, 2, 3]; a[1] = 10; }").unwrap();
    let Stmt::Let { init, .. } = &program.functions[0].body[0] else {
        panic!("expected a let statement");
    };
    assert_eq!(*init, Expr::ArrayLit(vec![Expr::Int(1), Expr::Int(2), Expr::Int(3)]));

    let Stmt::Expr(Expr::Assign { target, .. }) = &program.functions[0].body[1] else {
        panic!("expected an assignment");
    };
    assert!(matches!(target, LValue::Index { .. }));
}

#[test]
fn parses_lambda_literal_and_call() {
    let program = parse("def main() { let f: lambda -> int = $(x: int) -> int { return x * x; }; f(6); }").unwrap();
    let Stmt::Let { ty, init, .. } = &program.functions[0].body[0] else {
        panic!("expected a let statement");
    };
    assert!(matches!(ty, TypeExpr::Lambda(_)));
    assert!(matches!(init, Expr::Lambda { .. }));
}

#[test]
fn parses_compound_assignment_as_binop_plus_store() {
    let program = parse("def main() { let x: int = 1; x += 2; }").unwrap();
    let Stmt::Expr(Expr::Assign { op, .. }) = &program.functions[0].body[1] else {
        panic!("expected an assignment");
    };
    assert_eq!(*op, Some(BinOp::Add));
}

#[test]
fn parses_for_loop_with_break() {
    let program = parse("def main() { for (let i: int = 0; i < 10; i++) { break; } }").unwrap();
    assert!(matches!(program.functions[0].body[0], Stmt::For { .. }));
}

#[test]
fn rejects_assignment_to_a_non_lvalue() {
    let err = parse("def main() { 1 + 1 = 2; }").unwrap_err();
    assert!(format!("{err}").contains("invalid assignment target"));
}
