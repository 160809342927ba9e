// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Call stack activations.
//!
//! A [`Frame`] is what the VM pushes on `CALL` and pops on `LEAVE`/`RETURN`.
//! Each call gets a fresh activation: the chunk and its metadata are shared
//! (via [`FuncRef`]) with every other activation of the same function, but
//! the operand stack, local-name table and program counter are private to
//! this one.

#[cfg(test)]
mod frame_test;

use crate::program::FuncRef;
use crate::value::Cell;
use std::collections::HashMap;

/// Metadata common to every activation of a function, independent of its
/// body.
#[derive(Debug, Clone)]
pub struct FrameMeta {
    /// The function's name, for diagnostics and `SPECIAL_CALL`-by-name
    /// dispatch.
    pub name: String,
    /// The function's compiled id.
    pub id: u32,
    /// Declared parameter count.
    pub arg_count: u32,
    /// True if this activation is of a lambda rather than a named
    /// function.
    pub is_lambda: bool,
}

/// An activation of a user-defined, bytecode-backed function.
#[derive(Debug, Clone)]
pub struct ScriptFrame {
    /// Shared metadata and bytecode.
    pub func: FuncRef,
    /// This activation's operand stack.
    pub stack: Vec<Cell>,
    /// This activation's local variables, keyed by name — mirroring the
    /// original's name-keyed locals map, which is what lets a builtin like
    /// `append` mutate a local's heap-boxed contents through an alias
    /// rather than through a fresh copy.
    pub locals: HashMap<String, Cell>,
    /// Program counter: offset of the next instruction to fetch from the
    /// function's chunk.
    pub pc: usize,
}

impl ScriptFrame {
    /// A fresh activation of `func`, with an empty stack and no bound
    /// locals yet — the caller binds parameters immediately after this is
    /// pushed.
    #[must_use]
    pub fn new(func: FuncRef) -> Self {
        Self {
            func,
            stack: Vec::new(),
            locals: HashMap::new(),
            pc: 0,
        }
    }
}

/// An activation of a native intrinsic. Builtins don't execute bytecode,
/// so this only carries enough metadata for the VM to find and invoke the
/// matching Rust function, the arguments already transferred from the
/// caller (in declared order, unlike a script frame's reversed stack), and
/// a place for diagnostics to name it.
#[derive(Debug, Clone)]
pub struct BuiltinFrame {
    /// Shared metadata.
    pub func: FuncRef,
    /// Arguments transferred from the caller, in declared-parameter order.
    pub args: Vec<Cell>,
}

/// One call stack activation: either a script frame or a builtin frame.
#[derive(Debug, Clone)]
pub enum Frame {
    /// A user-defined function executing bytecode.
    Script(ScriptFrame),
    /// A native intrinsic.
    Builtin(BuiltinFrame),
}

impl Frame {
    /// Construct the right kind of frame for `func`, based on its body,
    /// with no arguments transferred yet.
    #[must_use]
    pub fn new(func: FuncRef) -> Self {
        if func.is_builtin() {
            Self::Builtin(BuiltinFrame { func, args: Vec::new() })
        } else {
            Self::Script(ScriptFrame::new(func))
        }
    }

    /// Construct a frame for `func` with `args` (in declared-parameter
    /// order, `this` first for a method) already transferred from the
    /// caller. A builtin frame keeps them in that order for direct
    /// positional indexing; a script frame's initial stack holds them
    /// reversed, so its parameter-binding prologue's sequence of `SET_NAME`
    /// pops them off top-first in declared order (design note 6).
    #[must_use]
    pub fn new_call(func: FuncRef, args: Vec<Cell>) -> Self {
        if func.is_builtin() {
            Self::Builtin(BuiltinFrame { func, args })
        } else {
            let mut frame = ScriptFrame::new(func);
            frame.stack = args.into_iter().rev().collect();
            Self::Script(frame)
        }
    }

    /// The function this activation is running.
    #[must_use]
    pub fn func(&self) -> &FuncRef {
        match self {
            Self::Script(f) => &f.func,
            Self::Builtin(f) => &f.func,
        }
    }

    /// Metadata shared by either kind of frame.
    #[must_use]
    pub fn meta(&self) -> FrameMeta {
        let func = self.func();
        FrameMeta {
            name: func.name.clone(),
            id: func.id,
            arg_count: func.arg_count,
            is_lambda: func.is_lambda,
        }
    }
}
