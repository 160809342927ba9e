// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! On-disk bytecode format: `write_program`/`read_program` over anything
//! `Read`/`Write`.
//!
//! Layout, unchanged from the original (`original_source/running/program_loader.hpp`,
//! `front/code_writer.hpp`): a `u32` magic, then one function record per
//! function. Every multi-byte field is little-endian. A function record is:
//!
//! ```text
//! name_len: u32, name: [u8; name_len]
//! id: u32
//! arg_count: u32
//! is_lambda: u8
//! code_len: u32, code: [i32; code_len]
//! name_count: u32, names: [ (u32, [u8]) ; name_count ]
//! const_count: u32, constants: [ tagged constant ; const_count ]
//! ```
//!
//! A tagged constant is a `u8` tag (`INT`=0, `FLOAT`=1, `STRING`=2,
//! `BOOL`=3, `NULL`=4) followed by its payload. Builtins are written with
//! `code_len`, `name_count` and `const_count` all zero — a zero-length
//! stub that the loader re-binds to a native implementation by name
//! instead of replaying as bytecode.

#[cfg(test)]
mod bytecode_test;

use crate::chunk::Chunk;
use crate::program::{FunctionBody, FunctionDef, Program};
use crate::value::Cell;
use crate::MAGIC;
use std::io::{self, Read, Write};
use thiserror::Error;

const TAG_INT: u8 = 0;
const TAG_FLOAT: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_NULL: u8 = 4;

/// Errors reading or writing a `.copl` bytecode file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying I/O failure.
    #[error("bytecode I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file didn't start with the expected magic number.
    #[error("not a copl bytecode file: expected magic {MAGIC:#010x}, found {found:#010x}")]
    BadMagic {
        /// The magic number actually read.
        found: u32,
    },
    /// A constant's tag byte wasn't one of the five known kinds.
    #[error("unknown constant tag {0}")]
    BadConstantTag(u8),
    /// A string length or count would require more memory than is
    /// plausible for a hand-compiled source file; guards against a
    /// corrupt or truncated file causing an enormous allocation.
    #[error("implausible length {0} while reading bytecode")]
    ImplausibleLength(u64),
    /// A function's contents can't be decoded as UTF-8.
    #[error("invalid UTF-8 in bytecode: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

const MAX_PLAUSIBLE_LEN: u64 = 64 * 1024 * 1024;

fn checked_len(raw: u32) -> Result<usize, LoadError> {
    let len = u64::from(raw);
    if len > MAX_PLAUSIBLE_LEN {
        return Err(LoadError::ImplausibleLength(len));
    }
    Ok(len as usize)
}

fn write_u32(w: &mut impl Write, v: u32) -> Result<(), LoadError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_u32(r: &mut impl Read) -> Result<u32, LoadError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn write_i32(w: &mut impl Write, v: i32) -> Result<(), LoadError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_i32(r: &mut impl Read) -> Result<i32, LoadError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn write_f64(w: &mut impl Write, v: f64) -> Result<(), LoadError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_f64(r: &mut impl Read) -> Result<f64, LoadError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn write_string(w: &mut impl Write, s: &str) -> Result<(), LoadError> {
    write_u32(w, u32::try_from(s.len()).unwrap_or(u32::MAX))?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string(r: &mut impl Read) -> Result<String, LoadError> {
    let len = checked_len(read_u32(r)?)?;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn write_constant(w: &mut impl Write, value: &Cell) -> Result<(), LoadError> {
    match value {
        Cell::Int(i) => {
            w.write_all(&[TAG_INT])?;
            write_i32(w, *i)?;
        }
        Cell::Float(f) => {
            w.write_all(&[TAG_FLOAT])?;
            write_f64(w, *f)?;
        }
        Cell::Str(s) => {
            w.write_all(&[TAG_STRING])?;
            write_string(w, s)?;
        }
        Cell::Bool(b) => {
            w.write_all(&[TAG_BOOL])?;
            w.write_all(&[u8::from(*b)])?;
        }
        Cell::Null => {
            w.write_all(&[TAG_NULL])?;
        }
        // Only scalar literals ever appear in a constant pool; the compiler
        // never emits a heap reference or function pointer as a LOAD_CONST
        // operand.
        Cell::Func(_) | Cell::Heap(_) => {
            w.write_all(&[TAG_NULL])?;
        }
    }
    Ok(())
}

fn read_constant(r: &mut impl Read) -> Result<Cell, LoadError> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)?;
    match tag[0] {
        TAG_INT => Ok(Cell::Int(read_i32(r)?)),
        TAG_FLOAT => Ok(Cell::Float(read_f64(r)?)),
        TAG_STRING => Ok(Cell::Str(read_string(r)?)),
        TAG_BOOL => {
            let mut b = [0u8; 1];
            r.read_exact(&mut b)?;
            Ok(Cell::Bool(b[0] != 0))
        }
        TAG_NULL => Ok(Cell::Null),
        other => Err(LoadError::BadConstantTag(other)),
    }
}

fn write_function(w: &mut impl Write, func: &FunctionDef) -> Result<(), LoadError> {
    write_string(w, &func.name)?;
    write_u32(w, func.id)?;
    write_u32(w, func.arg_count)?;
    w.write_all(&[u8::from(func.is_lambda)])?;
    match &func.body {
        FunctionBody::Script(chunk) => {
            write_u32(w, u32::try_from(chunk.code.len()).unwrap_or(u32::MAX))?;
            for word in &chunk.code {
                write_i32(w, *word)?;
            }
            write_u32(w, u32::try_from(chunk.names.len()).unwrap_or(u32::MAX))?;
            for name in &chunk.names {
                write_string(w, name)?;
            }
            write_u32(w, u32::try_from(chunk.constants.len()).unwrap_or(u32::MAX))?;
            for constant in &chunk.constants {
                write_constant(w, constant)?;
            }
        }
        FunctionBody::Builtin => {
            // A zero-length stub: the loader recognises this and re-binds
            // the name to a native implementation instead of executing it.
            write_u32(w, 0)?;
            write_u32(w, 0)?;
            write_u32(w, 0)?;
        }
    }
    Ok(())
}

fn read_function(r: &mut impl Read) -> Result<FunctionDef, LoadError> {
    let name = read_string(r)?;
    let id = read_u32(r)?;
    let arg_count = read_u32(r)?;
    let mut is_lambda = [0u8; 1];
    r.read_exact(&mut is_lambda)?;
    let is_lambda = is_lambda[0] != 0;

    let code_len = checked_len(read_u32(r)?)?;
    let mut code = Vec::with_capacity(code_len);
    for _ in 0..code_len {
        code.push(read_i32(r)?);
    }
    let name_count = checked_len(read_u32(r)?)?;
    let mut names = Vec::with_capacity(name_count);
    for _ in 0..name_count {
        names.push(read_string(r)?);
    }
    let const_count = checked_len(read_u32(r)?)?;
    let mut constants = Vec::with_capacity(const_count);
    for _ in 0..const_count {
        constants.push(read_constant(r)?);
    }

    let body = if code_len == 0 && name_count == 0 && const_count == 0 {
        FunctionBody::Builtin
    } else {
        FunctionBody::Script(Chunk {
            code,
            constants,
            names,
        })
    };

    Ok(FunctionDef {
        name,
        id,
        arg_count,
        is_lambda,
        body,
    })
}

/// Serialize `program` to `w` in the on-disk format described above.
pub fn write_program(w: &mut impl Write, program: &Program) -> Result<(), LoadError> {
    write_u32(w, MAGIC)?;
    write_u32(w, u32::try_from(program.functions.len()).unwrap_or(u32::MAX))?;
    for func in &program.functions {
        write_function(w, func)?;
    }
    Ok(())
}

/// Deserialize a [`Program`] from `r`, checking the magic number first.
pub fn read_program(r: &mut impl Read) -> Result<Program, LoadError> {
    let magic = read_u32(r)?;
    if magic != MAGIC {
        return Err(LoadError::BadMagic { found: magic });
    }
    let count = checked_len(read_u32(r)?)?;
    let mut functions = Vec::with_capacity(count);
    for _ in 0..count {
        functions.push(read_function(r)?);
    }
    Ok(Program { functions })
}
