// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! End-to-end seed scenarios (§8): source -> compile -> save -> load -> run
//! -> assert stdout, for every concrete example the specification names.

use copl_core::bytecode::{read_program, write_program};
use copl_vm::{BufferIo, Vm};

/// Run `source` through the full pipeline (mirroring what `copl -c` then
/// `copl -r` would do) and return everything written through `print`/
/// `println`/`debug`.
fn run(source: &str) -> String {
    run_with_input(source, &[])
}

fn run_with_input(source: &str, input_lines: &[&str]) -> String {
    let ast = copl_parser::parse(source).expect("source parses");
    let output = copl_compiler::compile(&ast).expect("source compiles");

    let mut bytes = Vec::new();
    write_program(&mut bytes, &output.program).expect("program serializes");
    let program = read_program(&mut &bytes[..]).expect("program deserializes");

    let mut vm = Vm::new(program);
    let mut io = BufferIo::new();
    for line in input_lines {
        io.feed_line(*line);
    }
    vm.run(&mut io).expect("program runs to completion");
    io.output
}

#[test]
fn factorial() {
    let src = "
        def fact(n: int) -> int {
            if (n <= 1) { return 1; }
            return n * fact(n - 1);
        }
        def main() {
            println(fact(5));
        }
    ";
    assert_eq!(run(src), "120\n");
}

#[test]
fn class_with_constructor_and_field_sum() {
    let src = "
        class Point {
            x: int;
            y: int;
            def constructor(x: int, y: int) {
                this.x = x;
                this.y = y;
            }
        }
        def main() {
            let p: Point = new Point(3, 4);
            println(p.x + p.y);
        }
    ";
    assert_eq!(run(src), "7\n");
}

#[test]
fn array_mutation() {
    let src = "
        def main() {
            let a: [int] = [1, 2, 3];
            a[1] = 10;
            println(a[0] + a[1] + a[2]);
        }
    ";
    assert_eq!(run(src), "14\n");
}

#[test]
fn lambda_call() {
    let src = "
        def main() {
            let f: lambda -> int = $(x: int) -> int { return x * x; };
            println(f(6));
        }
    ";
    assert_eq!(run(src), "36\n");
}

#[test]
fn for_loop_with_break() {
    let src = "
        def main() {
            let sum: int = 0;
            for (let i: int = 1; i <= 10; i = i + 1) {
                if (i == 7) { break; }
                sum = sum + i;
            }
            println(sum);
        }
    ";
    assert_eq!(run(src), "21\n");
}

#[test]
fn string_concat_via_append() {
    let src = r#"
        def main() {
            let s: string = "a";
            append("b", s);
            println(s);
        }
    "#;
    assert_eq!(run(src), "ab\n");
}

#[test]
fn input_builtin_reads_a_line() {
    let src = r#"
        def main() {
            let name: string = input("name? ");
            println(name);
        }
    "#;
    assert_eq!(run_with_input(src, &["Ada"]), "name? Ada\n");
}
