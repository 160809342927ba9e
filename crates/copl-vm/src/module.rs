// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The module manager (§4.D): resolves `alias → bytecode path` bindings
//! that `LOAD_MODULE` carries baked into its operands, loading each
//! referenced `.copl` file at most once per running VM.
//!
//! Unlike the compiler's [`copl_compiler::ModuleBinding`], which only
//! exists to emit `LOAD_MODULE` instructions, this table is populated
//! entirely at VM runtime — the binding isn't persisted in the bytecode
//! file itself, only the instruction that re-creates it is.

use copl_core::bytecode::{self, LoadError};
use copl_core::FuncRef;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// A loaded module's function table, addressable by alias.
pub type ModuleFunctions = Rc<Vec<FuncRef>>;

/// Failures installing a module.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The bytecode file couldn't be read or didn't parse.
    #[error("failed to load module from '{path}': {source}")]
    Load {
        /// The path that was attempted.
        path: String,
        /// The underlying failure.
        #[source]
        source: LoadError,
    },
}

/// `alias → loaded function table`, populated as `LOAD_MODULE` instructions
/// execute. Re-importing the same alias twice reloads the file — imports
/// are simple enough in this language that caching by path isn't worth the
/// staleness risk.
#[derive(Default)]
pub struct ModuleManager {
    loaded: HashMap<String, ModuleFunctions>,
}

impl ModuleManager {
    /// An empty module table, as a freshly started VM has.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the bytecode file at `path` and install it under `alias`,
    /// replacing any module previously loaded under that alias.
    pub fn load(&mut self, alias: &str, path: &str) -> Result<ModuleFunctions, ModuleError> {
        let program = read_program_file(path).map_err(|source| ModuleError::Load {
            path: path.to_string(),
            source,
        })?;
        let functions: Vec<FuncRef> = program.functions.into_iter().map(Rc::new).collect();
        let functions = Rc::new(functions);
        self.loaded.insert(alias.to_string(), functions.clone());
        tracing::debug!(alias, path, functions = functions.len(), "loaded module");
        Ok(functions)
    }

    /// The function table installed under `alias`, if `LOAD_MODULE` has
    /// run for it yet.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&ModuleFunctions> {
        self.loaded.get(alias)
    }
}

fn read_program_file(path: &str) -> Result<copl_core::Program, LoadError> {
    let file = File::open(Path::new(path))?;
    let mut reader = BufReader::new(file);
    bytecode::read_program(&mut reader)
}
