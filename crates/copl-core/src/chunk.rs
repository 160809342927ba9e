// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! A compiled function body: its opcode stream, constant pool and name
//! table.

#[cfg(test)]
mod chunk_test;

use crate::value::Cell;

/// One function's compiled bytecode, plus the two tables its instructions
/// index into.
///
/// `code` holds the linear opcode stream (§4.B): each instruction is one
/// opcode word, optionally followed by operand words, exactly as the
/// original `asm.hpp` enumeration and `vm.hpp` dispatch loop expect. Jump
/// targets are absolute offsets into `code`, resolved by the compiler's
/// backpatch pass (§4.C) — there are no relative jumps to keep consistent
/// under future code motion.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// The opcode stream.
    pub code: Vec<i32>,
    /// Literal values referenced by `LOAD_CONST`.
    pub constants: Vec<Cell>,
    /// Names referenced by `LOAD_NAME`/`SET_NAME`/`LOAD_MODULE_METHOD` and
    /// friends, resolved to an index at compile time.
    pub names: Vec<String>,
}

impl Chunk {
    /// An empty chunk.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one instruction word (an opcode or an operand) and return
    /// its offset in `code`, used by the compiler to remember patch sites.
    pub fn emit(&mut self, word: i32) -> usize {
        self.code.push(word);
        self.code.len() - 1
    }

    /// Overwrite a previously emitted word, used by the backpatch pass to
    /// resolve a forward jump once its target address is known.
    pub fn patch(&mut self, at: usize, word: i32) {
        self.code[at] = word;
    }

    /// Current end of the opcode stream, i.e. the address the next
    /// `emit` will land at.
    #[must_use]
    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Intern a constant, returning its index in the constant pool.
    ///
    /// Unlike name interning, constants are not deduplicated: two
    /// occurrences of the same literal get two pool entries, matching the
    /// original compiler's `add_const` (`original_source/front/compiler.hpp`).
    pub fn add_constant(&mut self, value: Cell) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Intern a name, reusing an existing entry if the name was already
    /// referenced by this chunk.
    pub fn add_name(&mut self, name: &str) -> usize {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            return pos;
        }
        self.names.push(name.to_string());
        self.names.len() - 1
    }
}
