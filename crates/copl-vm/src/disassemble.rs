// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode disassembler for debugging (`copl -d`).

use copl_core::{Chunk, Opcode, Program};
use std::fmt::Write;

/// Disassemble one chunk's instruction stream to a string, one line per
/// instruction, each address followed by its mnemonic and operands.
#[must_use]
pub fn disassemble_chunk(chunk: &Chunk) -> String {
    let mut out = String::new();
    let mut pc = 0usize;

    while pc < chunk.code.len() {
        let raw = chunk.code[pc];
        let _ = write!(out, "{pc:04}: ");

        let Ok(opcode) = Opcode::try_from(raw) else {
            let _ = writeln!(out, "??? opcode={raw}");
            pc += 1;
            continue;
        };

        let n = opcode.operand_count();
        let operands = &chunk.code[pc + 1..(pc + 1 + n).min(chunk.code.len())];

        match opcode {
            Opcode::LoadConst if operands.len() == 1 => {
                let idx = operands[0] as usize;
                let value = chunk.constants.get(idx).map_or_else(|| "?".to_string(), |c| format!("{c:?}"));
                let _ = writeln!(out, "LOAD_CONST K{idx} ({value})");
            }
            Opcode::LoadName | Opcode::SetName | Opcode::LoadModuleMethod if operands.len() == 1 => {
                let idx = operands[0] as usize;
                let name = chunk.names.get(idx).map_or("?", String::as_str);
                let _ = writeln!(out, "{} N{idx} ({name})", opcode.mnemonic());
            }
            Opcode::LoadModule if operands.len() == 2 => {
                let path_idx = operands[0] as usize;
                let alias_idx = operands[1] as usize;
                let path = chunk.constants.get(path_idx).map_or_else(|| "?".to_string(), |c| format!("{c:?}"));
                let alias = chunk.constants.get(alias_idx).map_or_else(|| "?".to_string(), |c| format!("{c:?}"));
                let _ = writeln!(out, "LOAD_MODULE K{path_idx} ({path}) K{alias_idx} ({alias})");
            }
            _ if n == 0 => {
                let _ = writeln!(out, "{}", opcode.mnemonic());
            }
            _ => {
                let _ = writeln!(out, "{} {}", opcode.mnemonic(), operands[0]);
            }
        }

        pc += 1 + n;
    }

    if !chunk.constants.is_empty() {
        let _ = writeln!(out, "\nConstants:");
        for (i, c) in chunk.constants.iter().enumerate() {
            let _ = writeln!(out, "  K{i}: {c:?}");
        }
    }

    if !chunk.names.is_empty() {
        let _ = writeln!(out, "\nNames:");
        for (i, name) in chunk.names.iter().enumerate() {
            let _ = writeln!(out, "  N{i}: {name}");
        }
    }

    out
}

/// Disassemble every function in a program, in table order.
#[must_use]
pub fn disassemble_program(program: &Program) -> String {
    let mut out = String::new();
    for func in &program.functions {
        let _ = writeln!(out, "function {} (id={}, arg_count={}, lambda={})", func.name, func.id, func.arg_count, func.is_lambda);
        match &func.body {
            copl_core::FunctionBody::Script(chunk) => {
                out.push_str(&disassemble_chunk(chunk));
            }
            copl_core::FunctionBody::Builtin => {
                out.push_str("  <builtin>\n");
            }
        }
        out.push('\n');
    }
    out
}
