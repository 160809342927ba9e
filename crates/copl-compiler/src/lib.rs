// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Copl Compiler
//!
//! Lowers a [`copl_parser::ast::Program`] into a [`copl_core::Program`]:
//! one [`copl_core::Chunk`] per function, a class-descriptor table, and the
//! module-alias bindings `import` declarations recorded (§4.C).

#[cfg(test)]
mod compiler_test;

mod emit;

mod compiler;

pub use compiler::{compile, CompileError, CompileOutput, ModuleBinding};
