// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! A program: the function table a compiler produces and a VM loads.

#[cfg(test)]
mod program_test;

use crate::chunk::Chunk;
use std::rc::Rc;

/// Shared handle to a [`FunctionDef`], stored inside a [`FuncPtr`] so a
/// lambda or imported method can be passed around as a first-class value.
pub type FuncRef = Rc<FunctionDef>;

/// A callable value as it travels on the stack: the function itself, plus
/// the module alias it was fetched through (if any).
///
/// `LOAD_FUNC_ADDR` produces one with `module: None` — the function lives
/// in the program currently executing, so `SPECIAL_CALL` pushes a frame
/// onto the same call stack as an ordinary `CALL`. `LOAD_MODULE_METHOD`
/// stamps the owning alias in, which is what tells `SPECIAL_CALL` to spawn
/// a nested VM over that module's function table instead (§4.E).
#[derive(Debug, Clone)]
pub struct FuncPtr {
    /// The target function.
    pub func: FuncRef,
    /// The module alias this pointer was resolved through, if it came
    /// from `LOAD_MODULE_METHOD` rather than `LOAD_FUNC_ADDR`.
    pub module: Option<String>,
}

impl FuncPtr {
    /// A pointer to a function local to the currently executing program
    /// (a lambda), with no module origin.
    #[must_use]
    pub fn local(func: FuncRef) -> Self {
        Self { func, module: None }
    }

    /// A pointer to a function fetched from an imported module.
    #[must_use]
    pub fn from_module(func: FuncRef, alias: impl Into<String>) -> Self {
        Self {
            func,
            module: Some(alias.into()),
        }
    }
}

/// The body of a function: either a chunk to execute, or a marker that the
/// VM should dispatch to a native intrinsic by name.
#[derive(Debug, Clone)]
pub enum FunctionBody {
    /// A user-defined function, compiled to bytecode.
    Script(Chunk),
    /// A native intrinsic (`print`, `append`, ...), resolved by the VM's
    /// builtin table at call time rather than executed as bytecode.
    Builtin,
}

/// One function record: metadata plus its body.
///
/// Mirrors the on-disk function record of §4.B: a builtin is serialized
/// with an empty chunk and an empty name table, then re-bound to the VM's
/// native implementation by name when the program is loaded.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// The function's declared name (`"main"`, `"Foo$constructor"`, ...).
    pub name: String,
    /// A compiler-assigned numeric id, stable within one program.
    pub id: u32,
    /// Number of declared parameters.
    pub arg_count: u32,
    /// True for a lambda compiled from a `lambda` expression, as opposed
    /// to a top-level or method declaration.
    pub is_lambda: bool,
    /// The function's body.
    pub body: FunctionBody,
}

impl FunctionDef {
    /// True if this record is a native intrinsic rather than bytecode.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        matches!(self.body, FunctionBody::Builtin)
    }
}

/// A whole compiled program: every function the compiler emitted, including
/// `main` and the builtin stubs it referenced.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// All function records, in compilation order.
    pub functions: Vec<FunctionDef>,
}

impl Program {
    /// An empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a function by its compiled numeric id.
    #[must_use]
    pub fn find_by_id(&self, id: u32) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.id == id)
    }

    /// Look up a function by name, as `LOAD_MODULE_METHOD` and
    /// `SPECIAL_CALL` do when dispatching on a method name rather than a
    /// pre-resolved id.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }
}
