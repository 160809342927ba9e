// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Deferred emission with symbolic labels (§4.C).
//!
//! Instructions are appended to an [`Emitter`] as they're visited, with
//! forward-jump operands carrying a symbolic [`Label`] instead of a
//! concrete address. Once a function body is fully visited, [`Emitter::finish`]
//! walks the buffer once to assign every label its final address, then
//! walks it again to flatten into the `i32` word stream a [`copl_core::Chunk`]
//! stores.

use copl_core::Opcode;

/// A symbolic jump target, resolved to a concrete address by [`Emitter::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

enum Item {
    Word(i32),
    LabelOperand(Label),
    LabelDef(Label),
}

/// Accumulates one function body's instruction stream before it is
/// flattened into a chunk's `code` array.
#[derive(Default)]
pub struct Emitter {
    items: Vec<Item>,
    next_label: u32,
}

impl Emitter {
    /// A fresh, empty emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new, as-yet-unplaced label.
    pub fn new_label(&mut self) -> Label {
        let id = Label(self.next_label);
        self.next_label += 1;
        id
    }

    /// Mark the current position as `label`'s address.
    pub fn mark_label(&mut self, label: Label) {
        self.items.push(Item::LabelDef(label));
    }

    /// Emit an opcode with no operands.
    pub fn op(&mut self, opcode: Opcode) {
        self.items.push(Item::Word(opcode.into()));
    }

    /// Emit an opcode followed by one literal operand word.
    pub fn op_operand(&mut self, opcode: Opcode, operand: i32) {
        self.op(opcode);
        self.items.push(Item::Word(operand));
    }

    /// Emit an opcode followed by two literal operand words (`LOAD_MODULE`'s
    /// path and alias constant indices).
    pub fn op_operand2(&mut self, opcode: Opcode, a: i32, b: i32) {
        self.op(opcode);
        self.items.push(Item::Word(a));
        self.items.push(Item::Word(b));
    }

    /// Emit an opcode followed by one operand that is a not-yet-resolved
    /// jump target.
    pub fn op_label(&mut self, opcode: Opcode, target: Label) {
        self.op(opcode);
        self.items.push(Item::LabelOperand(target));
    }

    /// The address the next emitted word would land at, were one emitted
    /// now.
    pub fn current_address(&self) -> i32 {
        self.items
            .iter()
            .filter(|i| !matches!(i, Item::LabelDef(_)))
            .count() as i32
    }

    /// Resolve every label and flatten the buffer into a chunk's opcode
    /// stream.
    pub fn finish(self) -> Vec<i32> {
        let mut addresses = std::collections::HashMap::new();
        let mut addr = 0i32;
        for item in &self.items {
            match item {
                Item::LabelDef(label) => {
                    addresses.insert(label.0, addr);
                }
                Item::Word(_) | Item::LabelOperand(_) => addr += 1,
            }
        }

        self.items
            .into_iter()
            .filter_map(|item| match item {
                Item::Word(w) => Some(w),
                Item::LabelOperand(label) => Some(addresses[&label.0]),
                Item::LabelDef(_) => None,
            })
            .collect()
    }
}
