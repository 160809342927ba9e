// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Native implementations of the eight builtins `spec.md` §6 lists plus
//! the supplemented `read_file` (§4.E), grounded in
//! `original_source/running/native_proc.hpp`.
//!
//! Every builtin here receives its arguments already transferred from the
//! caller in declared-parameter order (`BuiltinFrame::args`), a mutable
//! handle to the heap for allocating boxed results, and the VM's I/O
//! channel for `print`/`println`/`input`/`debug`.

use crate::io::VmIo;
use crate::vm::RuntimeError;
use copl_core::heap::{Heap, HeapObject};
use copl_core::value::Cell;

/// Dispatch a builtin by name to its native implementation.
pub fn dispatch(name: &str, args: Vec<Cell>, heap: &mut Heap, io: &mut dyn VmIo) -> Result<Cell, RuntimeError> {
    match name {
        "print" => print(&args, io),
        "println" => println(&args, io),
        "input" => input(&args, io),
        "debug" => debug(&args, io),
        "append" => append(&args, heap),
        "size" => size(&args),
        "str2int" => str2int(&args),
        "not_null" => not_null(&args),
        "read_file" => read_file(&args),
        other => Err(RuntimeError::UnknownBuiltin(other.to_string())),
    }
}

/// Render a cell the way `print`/`append`/`str2int` all stringify their
/// argument, matching `get_string` for each `STACK_VALUE`/`OPL_BasicValue`
/// kind.
fn display_cell(cell: &Cell) -> String {
    match cell {
        Cell::Int(i) => i.to_string(),
        Cell::Float(f) => format!("{f:.6}"),
        Cell::Bool(b) => b.to_string(),
        Cell::Null => "null".to_string(),
        Cell::Str(s) => s.clone(),
        Cell::Func(_) => "<function>".to_string(),
        Cell::Heap(r) => display_heap(&r.value.borrow()),
    }
}

fn display_heap(obj: &HeapObject) -> String {
    match obj {
        HeapObject::Integer(i) => i.to_string(),
        HeapObject::Float(f) => format!("{f:.6}"),
        HeapObject::Boolean(b) => b.to_string(),
        HeapObject::String(s) => s.clone(),
        HeapObject::Array(elements) => {
            let mut out = String::from("[");
            for element in elements {
                out.push_str(&display_heap(&element.value.borrow()));
                out.push_str(", ");
            }
            out.push(']');
            out
        }
        HeapObject::Object(_) => "<object>".to_string(),
        HeapObject::Null => "null".to_string(),
        HeapObject::RawPointer(_) => "<function>".to_string(),
    }
}

fn print(args: &[Cell], io: &mut dyn VmIo) -> Result<Cell, RuntimeError> {
    for arg in args {
        io.write(&display_cell(arg));
    }
    Ok(Cell::Null)
}

fn println(args: &[Cell], io: &mut dyn VmIo) -> Result<Cell, RuntimeError> {
    print(args, io)?;
    io.write("\n");
    Ok(Cell::Null)
}

fn input(args: &[Cell], io: &mut dyn VmIo) -> Result<Cell, RuntimeError> {
    print(args, io)?;
    let line = io.read_line()?;
    Ok(Cell::Str(line))
}

/// `debug` (`get_id_info` in the original): reports the kind of `args[0]`
/// rather than dumping raw pointer/address bits that don't exist in a
/// managed runtime.
fn debug(args: &[Cell], io: &mut dyn VmIo) -> Result<Cell, RuntimeError> {
    let Some(value) = args.first() else {
        return Ok(Cell::Null);
    };
    io.write(&format!(
        "- the info of args[0]:\n- type: {}\n- is heap ref: {}\n",
        value.type_name(),
        matches!(value, Cell::Heap(_)),
    ));
    Ok(Cell::Null)
}

/// `append(value, target)`: mutate `target` in place when it's heap-boxed
/// (array push, boxed-string concatenation), or return the concatenated
/// string when `target` is a bare local — the compiler's call-site
/// desugaring (`copl_compiler::compiler::compile_call`'s case 0) stores
/// whichever cell this returns back into `target`, so the heap-boxed
/// branches must return `target`'s own (unchanged-identity) cell rather
/// than `Null`, or the store-back would wipe the binding.
fn append(args: &[Cell], heap: &mut Heap) -> Result<Cell, RuntimeError> {
    let [value, target] = args else {
        return Err(RuntimeError::WrongArgumentCount { builtin: "append", expected: 2, found: args.len() });
    };
    match target {
        Cell::Str(s) => {
            let mut joined = s.clone();
            joined.push_str(&display_cell(value));
            Ok(Cell::Str(joined))
        }
        Cell::Heap(r) => {
            let mut obj = r.value.borrow_mut();
            match &mut *obj {
                HeapObject::Array(elements) => {
                    elements.push(value.clone().into_heap_ref(heap));
                }
                HeapObject::String(s) => {
                    s.push_str(&display_cell(value));
                }
                other => {
                    return Err(RuntimeError::TypeMismatch {
                        op: "append",
                        expected: "array or string",
                        found: other.type_name(),
                    });
                }
            }
            drop(obj);
            Ok(target.clone())
        }
        other => Err(RuntimeError::TypeMismatch {
            op: "append",
            expected: "string, array, or boxed string",
            found: other.type_name(),
        }),
    }
}

/// `size` (`length` in the original): byte length of a string, element
/// count of an array. Non-string/array heap kinds warn and report `0`
/// rather than error, matching the original's `length()` fallback.
fn size(args: &[Cell]) -> Result<Cell, RuntimeError> {
    let Some(target) = args.first() else {
        return Err(RuntimeError::WrongArgumentCount { builtin: "size", expected: 1, found: 0 });
    };
    match target {
        Cell::Str(s) => Ok(Cell::Int(i32::try_from(s.len()).unwrap_or(i32::MAX))),
        Cell::Heap(r) => match &*r.value.borrow() {
            HeapObject::String(s) => Ok(Cell::Int(i32::try_from(s.len()).unwrap_or(i32::MAX))),
            HeapObject::Array(elements) => Ok(Cell::Int(i32::try_from(elements.len()).unwrap_or(i32::MAX))),
            other => {
                tracing::warn!(kind = other.type_name(), "size() called on non-string/array heap object, returning 0");
                Ok(Cell::Int(0))
            }
        },
        other => {
            tracing::warn!(kind = other.type_name(), "size() called on a non-string stack value, returning 0");
            Ok(Cell::Int(0))
        }
    }
}

fn str2int(args: &[Cell]) -> Result<Cell, RuntimeError> {
    let Some(value) = args.first() else {
        return Err(RuntimeError::WrongArgumentCount { builtin: "str2int", expected: 1, found: 0 });
    };
    let text = display_cell(value);
    text.trim()
        .parse::<i32>()
        .map(Cell::Int)
        .map_err(|_| RuntimeError::InvalidIntLiteral(text))
}

fn not_null(args: &[Cell]) -> Result<Cell, RuntimeError> {
    let Some(value) = args.first() else {
        return Err(RuntimeError::WrongArgumentCount { builtin: "not_null", expected: 1, found: 0 });
    };
    let is_null = match value {
        Cell::Null => true,
        Cell::Heap(r) => matches!(&*r.value.borrow(), HeapObject::Null),
        _ => false,
    };
    Ok(Cell::Bool(!is_null))
}

/// `read_file(path)`: read the whole file into a string, normalizing line
/// endings the way the original's `getline` loop does (each line plus a
/// trailing `\n`, including the last).
fn read_file(args: &[Cell]) -> Result<Cell, RuntimeError> {
    let Some(path) = args.first() else {
        return Err(RuntimeError::WrongArgumentCount { builtin: "read_file", expected: 1, found: 0 });
    };
    let path = display_cell(path);
    let contents = std::fs::read_to_string(&path)?;
    let mut normalized = String::with_capacity(contents.len());
    for line in contents.lines() {
        normalized.push_str(line);
        normalized.push('\n');
    }
    Ok(Cell::Str(normalized))
}
