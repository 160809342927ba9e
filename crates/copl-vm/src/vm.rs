// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The dispatch loop (§4.E): fetch-decode-execute over a [`Chunk`]'s
//! linear opcode stream, one call stack per running [`Vm`].
//!
//! State that the original threads through a process-global `vm` pointer
//! (`original_source/running/vm.hpp`) is instead carried explicitly on
//! `Vm` itself — its function table, heap, module table, globals and call
//! stack together play the role of design note 3's `VmContext`, just
//! without a separate wrapper type since nothing outside `Vm` ever needs
//! to borrow a subset of them.
//!
//! A call stack activation goes through four conceptual states: *Ready*
//! (just pushed by `CALL`/`SPECIAL_CALL`, locals not bound yet), *Running*
//! (its own bytecode executing), and then either *Returned* (`RETURN`,
//! carrying a value to the caller) or *Left* (`LEAVE`, no value). Builtin
//! frames skip straight from Ready to Returned in one step, since they
//! have no bytecode to run.

use crate::intrinsics;
use crate::module::{ModuleError, ModuleFunctions, ModuleManager};
use crate::io::VmIo;
use copl_core::frame::ScriptFrame;
use copl_core::heap::{Heap, HeapError, HeapRef};
use copl_core::opcode::UnknownOpcode;
use copl_core::program::{FuncPtr, FuncRef, FunctionBody};
use copl_core::{Chunk, Frame, HeapObject, Opcode, Program};
use copl_core::value::Cell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Any failure raised while executing bytecode.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An opcode word didn't decode to a known instruction.
    #[error(transparent)]
    BadOpcode(#[from] UnknownOpcode),
    /// The program counter ran past the end of a chunk's code array.
    #[error("program counter {pc} out of bounds for a chunk of length {len}")]
    PcOutOfBounds {
        /// The offending program counter.
        pc: usize,
        /// The chunk's instruction count.
        len: usize,
    },
    /// An operand stack was popped while empty.
    #[error("operand stack underflow")]
    StackUnderflow,
    /// `LOAD_NAME`/`SET_NAME` referenced a name not bound in the current
    /// frame's locals or the VM's global table.
    #[error("undefined name '{0}'")]
    UndefinedName(String),
    /// `CALL` named a function id with no matching record.
    #[error("no function with id {0}")]
    UnknownFunctionId(u32),
    /// `LOAD_MODULE_METHOD` named a function not present in the target
    /// module's function table.
    #[error("module has no function named '{0}'")]
    UnknownModuleFunction(String),
    /// `LOAD_MODULE_METHOD` referenced an alias `LOAD_MODULE` never
    /// installed.
    #[error("no module loaded under alias '{0}'")]
    UnknownModuleAlias(String),
    /// Loading a module's bytecode file failed.
    #[error(transparent)]
    Module(#[from] ModuleError),
    /// A heap capability (`element_get`, `member_set`, ...) rejected its
    /// operands.
    #[error(transparent)]
    Heap(#[from] HeapError),
    /// A builtin name with no native implementation (a corrupt or
    /// hand-edited bytecode file claiming a builtin stub that isn't one
    /// of the nine this VM knows).
    #[error("no native implementation for builtin '{0}'")]
    UnknownBuiltin(String),
    /// A builtin received the wrong number of arguments — unreachable for
    /// bytecode the compiler emitted, but checked rather than indexed
    /// blindly since a loaded `.copl` file is untrusted input.
    #[error("'{builtin}' expects {expected} argument(s), got {found}")]
    WrongArgumentCount {
        /// The builtin's name.
        builtin: &'static str,
        /// How many arguments it declares.
        expected: usize,
        /// How many it was actually called with.
        found: usize,
    },
    /// An operator or builtin received an operand of the wrong kind.
    #[error("'{op}' expects {expected}, found {found}")]
    TypeMismatch {
        /// The operator or builtin name.
        op: &'static str,
        /// What kind of value it needed.
        expected: &'static str,
        /// What kind it actually got.
        found: &'static str,
    },
    /// `GET_ELEMENT`/`SET_ELEMENT` popped a non-integer index.
    #[error("array/string index must be an integer")]
    NonIntegerIndex,
    /// Integer division or modulo by zero — undefined behaviour in the
    /// original's C++; this VM reports it instead of invoking it.
    #[error("division by zero")]
    DivisionByZero,
    /// A value that isn't callable was used as a `SPECIAL_CALL` target.
    #[error("value of type '{0}' is not callable")]
    NotCallable(&'static str),
    /// `str2int` couldn't parse its argument, matching `std::stoi` throwing
    /// on invalid input (§9, design note 9) — fatal rather than a sentinel.
    #[error("str2int: '{0}' is not a valid integer")]
    InvalidIntLiteral(String),
    /// `read_file`, or any other builtin touching the filesystem/stdio.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The loaded program has no `main` function to run.
    #[error("program has no 'main' function")]
    MissingMain,
}

fn string_constant(chunk: &Chunk, idx: usize, op: &'static str) -> Result<String, RuntimeError> {
    match chunk.constants.get(idx) {
        Some(Cell::Str(s)) => Ok(s.clone()),
        Some(other) => Err(RuntimeError::TypeMismatch { op, expected: "string constant", found: other.type_name() }),
        None => Err(RuntimeError::TypeMismatch { op, expected: "string constant", found: "nothing" }),
    }
}

fn as_string(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Str(s) => Some(s.clone()),
        Cell::Heap(r) => match &*r.value.borrow() {
            HeapObject::String(s) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn as_i32(cell: &Cell, op: &'static str) -> Result<i32, RuntimeError> {
    match cell {
        Cell::Int(i) => Ok(*i),
        Cell::Heap(r) => match &*r.value.borrow() {
            HeapObject::Integer(i) => Ok(*i),
            other => Err(RuntimeError::TypeMismatch { op, expected: "integer", found: other.type_name() }),
        },
        other => Err(RuntimeError::TypeMismatch { op, expected: "integer", found: other.type_name() }),
    }
}

fn as_bool_strict(cell: &Cell, op: &'static str) -> Result<bool, RuntimeError> {
    cell.as_bool().ok_or(RuntimeError::TypeMismatch { op, expected: "boolean", found: cell.type_name() })
}

fn as_number_strict(cell: &Cell, op: &'static str) -> Result<f64, RuntimeError> {
    cell.as_number().ok_or(RuntimeError::TypeMismatch { op, expected: "number", found: cell.type_name() })
}

fn as_func_ptr(cell: &Cell) -> Option<FuncPtr> {
    match cell {
        Cell::Func(f) => Some(f.clone()),
        Cell::Heap(r) => match &*r.value.borrow() {
            HeapObject::RawPointer(f) => Some(f.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn as_index(cell: &Cell) -> Result<i64, RuntimeError> {
    as_i32(cell, "index").map(i64::from)
}

/// A running virtual machine: one function table, one heap, its own
/// module table, globals and call stack. Cross-module calls spawn a
/// [`Vm::nested`] instance sharing the same heap, per design note 4.
pub struct Vm {
    functions: Rc<Vec<FuncRef>>,
    id_index: HashMap<u32, usize>,
    name_index: HashMap<String, usize>,
    heap: Rc<RefCell<Heap>>,
    modules: ModuleManager,
    globals: HashMap<String, Cell>,
    call_stack: Vec<Frame>,
    halted: Option<i32>,
    last_return: Option<Cell>,
}

impl Vm {
    /// A fresh VM over a freshly loaded program, with its own heap.
    #[must_use]
    pub fn new(program: Program) -> Self {
        let functions: Vec<FuncRef> = program.functions.into_iter().map(Rc::new).collect();
        Self::from_functions(Rc::new(functions), Rc::new(RefCell::new(Heap::new())))
    }

    /// A VM over `functions`, sharing `heap` with whatever VM spawned it —
    /// used for a cross-module `SPECIAL_CALL` (§4.E, §5).
    fn nested(functions: ModuleFunctions, heap: Rc<RefCell<Heap>>) -> Self {
        Self::from_functions(functions, heap)
    }

    fn from_functions(functions: Rc<Vec<FuncRef>>, heap: Rc<RefCell<Heap>>) -> Self {
        let id_index = functions.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
        let name_index = functions.iter().enumerate().map(|(i, f)| (f.name.clone(), i)).collect();
        Self {
            functions,
            id_index,
            name_index,
            heap,
            modules: ModuleManager::new(),
            globals: HashMap::new(),
            call_stack: Vec::new(),
            halted: None,
            last_return: None,
        }
    }

    /// Run `main` to completion, returning the process exit code: `0`
    /// unless `HALT` executed.
    pub fn run(&mut self, io: &mut dyn VmIo) -> Result<i32, RuntimeError> {
        let main = self.find_by_name("main").ok_or(RuntimeError::MissingMain)?;
        self.call_stack.push(Frame::new(main));
        self.run_to_completion(io)?;
        Ok(self.halted.unwrap_or(0))
    }

    fn find_by_id(&self, id: u32) -> Option<FuncRef> {
        self.id_index.get(&id).map(|&i| self.functions[i].clone())
    }

    fn find_by_name(&self, name: &str) -> Option<FuncRef> {
        self.name_index.get(name).map(|&i| self.functions[i].clone())
    }

    /// Drive the dispatch loop until the call stack empties or `HALT`
    /// fires, returning whatever value the outermost frame produced
    /// (`Null` if it only ever `LEAVE`s).
    fn run_to_completion(&mut self, io: &mut dyn VmIo) -> Result<Cell, RuntimeError> {
        while self.halted.is_none() {
            let Some(top) = self.call_stack.last() else { break };
            match top {
                Frame::Builtin(_) => self.exec_builtin(io)?,
                Frame::Script(_) => self.exec_one(io)?,
            }
        }
        Ok(self.last_return.take().unwrap_or(Cell::Null))
    }

    fn current_frame(&self) -> &ScriptFrame {
        match self.call_stack.last() {
            Some(Frame::Script(f)) => f,
            _ => unreachable!("exec_one only runs with a script frame on top"),
        }
    }

    fn current_frame_mut(&mut self) -> &mut ScriptFrame {
        match self.call_stack.last_mut() {
            Some(Frame::Script(f)) => f,
            _ => unreachable!("exec_one only runs with a script frame on top"),
        }
    }

    fn current_chunk(&self) -> &Chunk {
        match &self.current_frame().func.body {
            FunctionBody::Script(chunk) => chunk,
            FunctionBody::Builtin => unreachable!("a script frame's function is never a builtin"),
        }
    }

    fn pop(&mut self) -> Result<Cell, RuntimeError> {
        self.current_frame_mut().stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    fn push(&mut self, value: Cell) {
        self.current_frame_mut().stack.push(value);
    }

    /// Deliver a callee's result to whatever sits beneath it, or stash it
    /// as the whole VM's result if the call stack just emptied.
    fn deliver(&mut self, value: Cell) {
        if self.call_stack.is_empty() {
            self.last_return = Some(value);
        } else {
            self.push(value);
        }
    }

    fn exec_builtin(&mut self, io: &mut dyn VmIo) -> Result<(), RuntimeError> {
        let Some(Frame::Builtin(frame)) = self.call_stack.pop() else {
            unreachable!("exec_builtin only runs with a builtin frame on top")
        };
        let result = {
            let mut heap = self.heap.borrow_mut();
            intrinsics::dispatch(&frame.func.name, frame.args, &mut heap, io)?
        };
        self.deliver(result);
        Ok(())
    }

    /// Fetch the next instruction from the current script frame, advance
    /// its program counter past it, and return its opcode and operands.
    fn fetch(&mut self) -> Result<(Opcode, [i32; 2]), RuntimeError> {
        let pc = self.current_frame().pc;
        let len = self.current_chunk().code.len();
        let raw = *self
            .current_chunk()
            .code
            .get(pc)
            .ok_or(RuntimeError::PcOutOfBounds { pc, len })?;
        let opcode = Opcode::try_from(raw)?;
        let n = opcode.operand_count();
        let mut operands = [0i32; 2];
        for (i, slot) in operands.iter_mut().enumerate().take(n) {
            *slot = *self
                .current_chunk()
                .code
                .get(pc + 1 + i)
                .ok_or(RuntimeError::PcOutOfBounds { pc: pc + 1 + i, len })?;
        }
        self.current_frame_mut().pc = pc + 1 + n;
        Ok((opcode, operands))
    }

    fn exec_one(&mut self, io: &mut dyn VmIo) -> Result<(), RuntimeError> {
        let pc_before = self.current_frame().pc;
        let (opcode, operands) = self.fetch()?;
        tracing::trace!(pc = pc_before, opcode = opcode.mnemonic(), ?operands, "dispatch");
        match opcode {
            Opcode::Nop => {}
            Opcode::LoadConst => {
                let value = self.current_chunk().constants[operands[0] as usize].clone();
                self.push(value);
            }
            Opcode::LoadImmediate => {
                self.push(Cell::Int(operands[0]));
            }
            Opcode::LoadName => {
                let name = self.current_chunk().names[operands[0] as usize].clone();
                let value = self
                    .current_frame()
                    .locals
                    .get(&name)
                    .or_else(|| self.globals.get(&name))
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedName(name.clone()))?;
                self.push(value);
            }
            Opcode::SetName => {
                let name = self.current_chunk().names[operands[0] as usize].clone();
                let value = self.pop()?;
                self.current_frame_mut().locals.insert(name, value);
            }
            Opcode::Add => self.numeric_binop("+", |l, r| l + r)?,
            Opcode::Sub => self.numeric_binop("-", |l, r| l - r)?,
            Opcode::Mul => self.numeric_binop("*", |l, r| l * r)?,
            Opcode::Div => self.div()?,
            Opcode::Mod => self.rem()?,
            Opcode::Shl => self.int_binop("<<", |l, r| l.wrapping_shl(r as u32))?,
            Opcode::Shr => self.int_binop(">>", |l, r| l.wrapping_shr(r as u32))?,
            Opcode::BAnd => self.int_binop("&", |l, r| l & r)?,
            Opcode::BOr => self.int_binop("|", |l, r| l | r)?,
            Opcode::BNot => {
                let value = self.pop()?;
                let i = as_i32(&value, "~")?;
                self.push(Cell::Int(!i));
            }
            Opcode::Not => {
                let value = self.pop()?;
                let b = as_bool_strict(&value, "!")?;
                self.push(Cell::Bool(!b));
            }
            Opcode::And => self.bool_binop("&&", |l, r| l && r)?,
            Opcode::Or => self.bool_binop("||", |l, r| l || r)?,
            Opcode::Eq => self.eq(false)?,
            Opcode::Neq => self.eq(true)?,
            Opcode::Lt => self.compare("<", |l, r| l < r)?,
            Opcode::Le => self.compare("<=", |l, r| l <= r)?,
            Opcode::Gt => self.compare(">", |l, r| l > r)?,
            Opcode::Ge => self.compare(">=", |l, r| l >= r)?,
            Opcode::Jump => {
                self.current_frame_mut().pc = operands[0] as usize;
            }
            Opcode::JumpIfFalse => {
                let value = self.pop()?;
                if !as_bool_strict(&value, "if")? {
                    self.current_frame_mut().pc = operands[0] as usize;
                }
            }
            Opcode::JumpIfTrue => {
                let value = self.pop()?;
                if as_bool_strict(&value, "if")? {
                    self.current_frame_mut().pc = operands[0] as usize;
                }
            }
            Opcode::NewArray => {
                let n = operands[0] as usize;
                let mut heap = self.heap.borrow_mut();
                let elements: Vec<HeapRef> = (0..n).map(|_| heap.alloc(HeapObject::Null)).collect();
                let node = heap.alloc(HeapObject::Array(elements));
                drop(heap);
                self.push(Cell::Heap(node));
            }
            Opcode::NewObject => {
                let n = operands[0] as usize;
                let mut heap = self.heap.borrow_mut();
                let members: Vec<HeapRef> = (0..n).map(|_| heap.alloc(HeapObject::Null)).collect();
                let node = heap.alloc(HeapObject::Object(members));
                drop(heap);
                self.push(Cell::Heap(node));
            }
            Opcode::GetElement => self.get_element()?,
            Opcode::SetElement => self.set_element()?,
            Opcode::MemberGet => self.member_get(operands[0] as usize)?,
            Opcode::MemberSet => self.member_set(operands[0] as usize)?,
            Opcode::Dup => {
                let value = self.current_frame().stack.last().cloned().ok_or(RuntimeError::StackUnderflow)?;
                self.push(value);
            }
            Opcode::Swap => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(b);
                self.push(a);
            }
            Opcode::Rot => {
                let c = self.pop()?;
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(b);
                self.push(c);
                self.push(a);
            }
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Copy => {
                let value = self.pop()?;
                let mut heap = self.heap.borrow_mut();
                let copied = value.deep_copy(&mut heap);
                drop(heap);
                self.push(copied);
            }
            Opcode::Call => {
                let func = self.find_by_id(operands[0] as u32).ok_or(RuntimeError::UnknownFunctionId(operands[0] as u32))?;
                let args = self.take_args(func.arg_count as usize)?;
                self.call_stack.push(Frame::new_call(func, args));
            }
            Opcode::SpecialCall => self.special_call(io)?,
            Opcode::LoadFuncAddr => {
                let func = self.find_by_id(operands[0] as u32).ok_or(RuntimeError::UnknownFunctionId(operands[0] as u32))?;
                self.push(Cell::Func(FuncPtr::local(func)));
            }
            Opcode::LoadModuleMethod => {
                let alias_cell = self.pop()?;
                let alias = as_string(&alias_cell).ok_or(RuntimeError::TypeMismatch {
                    op: "LOAD_MODULE_METHOD",
                    expected: "string alias",
                    found: alias_cell.type_name(),
                })?;
                let method = string_constant(self.current_chunk(), operands[0] as usize, "LOAD_MODULE_METHOD")?;
                let table = self.modules.get(&alias).cloned().ok_or_else(|| RuntimeError::UnknownModuleAlias(alias.clone()))?;
                let func = table
                    .iter()
                    .find(|f| f.name == method)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UnknownModuleFunction(method.clone()))?;
                self.push(Cell::Func(FuncPtr::from_module(func, alias)));
            }
            Opcode::LoadModule => {
                let path = string_constant(self.current_chunk(), operands[0] as usize, "LOAD_MODULE")?;
                let alias = string_constant(self.current_chunk(), operands[1] as usize, "LOAD_MODULE")?;
                self.modules.load(&alias, &path)?;
            }
            Opcode::Return => {
                let value = self.pop()?;
                self.call_stack.pop();
                self.deliver(value);
            }
            Opcode::Leave => {
                self.call_stack.pop();
                self.deliver(Cell::Null);
            }
            Opcode::Halt => {
                let code = self.pop()?;
                self.halted = Some(as_i32(&code, "halt")?);
            }
        }
        Ok(())
    }

    /// Pop `n` arguments off the current frame's stack, in the order the
    /// caller pushed them (declared-parameter order).
    fn take_args(&mut self, n: usize) -> Result<Vec<Cell>, RuntimeError> {
        let stack = &mut self.current_frame_mut().stack;
        if stack.len() < n {
            return Err(RuntimeError::StackUnderflow);
        }
        let at = stack.len() - n;
        Ok(stack.split_off(at))
    }

    fn special_call(&mut self, io: &mut dyn VmIo) -> Result<(), RuntimeError> {
        let callee = self.pop()?;
        let ptr = as_func_ptr(&callee).ok_or(RuntimeError::NotCallable(callee.type_name()))?;
        let args = self.take_args(ptr.func.arg_count as usize)?;
        match ptr.module {
            None => {
                self.call_stack.push(Frame::new_call(ptr.func, args));
            }
            Some(alias) => {
                let table = self.modules.get(&alias).cloned().ok_or_else(|| RuntimeError::UnknownModuleAlias(alias.clone()))?;
                let mut nested = Vm::nested(table, self.heap.clone());
                nested.call_stack.push(Frame::new_call(ptr.func, args));
                let result = nested.run_to_completion(io)?;
                self.push(result);
            }
        }
        Ok(())
    }

    fn numeric_binop(&mut self, op: &'static str, f: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let l = as_number_strict(&left, op)?;
        let r = as_number_strict(&right, op)?;
        let result = f(l, r);
        if left.is_double() || right.is_double() {
            self.push(Cell::Float(result));
        } else {
            self.push(Cell::Int(result as i32));
        }
        Ok(())
    }

    fn div(&mut self) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let l = as_number_strict(&left, "/")?;
        let r = as_number_strict(&right, "/")?;
        let is_double = left.is_double() || right.is_double();
        if !is_double && r == 0.0 {
            return Err(RuntimeError::DivisionByZero);
        }
        if is_double {
            self.push(Cell::Float(l / r));
        } else {
            self.push(Cell::Int((l / r) as i32));
        }
        Ok(())
    }

    fn rem(&mut self) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let l = as_number_strict(&left, "%")?;
        let r = as_number_strict(&right, "%")?;
        let is_double = left.is_double() || right.is_double();
        if !is_double && r == 0.0 {
            return Err(RuntimeError::DivisionByZero);
        }
        if is_double {
            self.push(Cell::Float(l % r));
        } else {
            self.push(Cell::Int((l as i32) % (r as i32)));
        }
        Ok(())
    }

    fn int_binop(&mut self, op: &'static str, f: impl Fn(i32, i32) -> i32) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let l = as_i32(&left, op)?;
        let r = as_i32(&right, op)?;
        self.push(Cell::Int(f(l, r)));
        Ok(())
    }

    fn bool_binop(&mut self, op: &'static str, f: impl Fn(bool, bool) -> bool) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let l = as_bool_strict(&left, op)?;
        let r = as_bool_strict(&right, op)?;
        self.push(Cell::Bool(f(l, r)));
        Ok(())
    }

    fn compare(&mut self, op: &'static str, f: impl Fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let l = as_number_strict(&left, op)?;
        let r = as_number_strict(&right, op)?;
        self.push(Cell::Bool(f(l, r)));
        Ok(())
    }

    /// `EQ`/`NEQ`: string comparison if either operand is a string,
    /// numeric comparison otherwise. Unlike the original's empty-string
    /// sentinel check, a string compared against a non-string is simply
    /// unequal rather than accidentally matching an empty string.
    fn eq(&mut self, negate: bool) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = match (as_string(&left), as_string(&right)) {
            (Some(l), Some(r)) => l == r,
            (Some(_), None) | (None, Some(_)) => false,
            (None, None) => {
                let l = as_number_strict(&left, "==")?;
                let r = as_number_strict(&right, "==")?;
                l == r
            }
        };
        self.push(Cell::Bool(result != negate));
        Ok(())
    }

    fn get_element(&mut self) -> Result<(), RuntimeError> {
        let index = self.pop()?;
        let object = self.pop()?;
        let idx = as_index(&index)?;
        let value = match &object {
            Cell::Str(s) => {
                let ch = usize::try_from(idx)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .ok_or(HeapError::IndexOutOfBounds { index: idx, len: s.chars().count() })?;
                Cell::Str(ch.to_string())
            }
            Cell::Heap(r) => {
                let obj = r.value.borrow();
                let mut heap = self.heap.borrow_mut();
                obj.element_get(idx, &mut heap)?
            }
            other => return Err(RuntimeError::TypeMismatch { op: "[]", expected: "array or string", found: other.type_name() }),
        };
        self.push(value);
        Ok(())
    }

    fn set_element(&mut self) -> Result<(), RuntimeError> {
        let index = self.pop()?;
        let object = self.pop()?;
        let value = self.pop()?;
        let idx = as_index(&index)?;
        match &object {
            Cell::Heap(r) => {
                let mut obj = r.value.borrow_mut();
                let mut heap = self.heap.borrow_mut();
                obj.element_set(idx, value, &mut heap)?;
            }
            other => return Err(RuntimeError::TypeMismatch { op: "[]=", expected: "array", found: other.type_name() }),
        }
        Ok(())
    }

    fn member_get(&mut self, offset: usize) -> Result<(), RuntimeError> {
        let object = self.pop()?;
        let Cell::Heap(r) = &object else {
            return Err(RuntimeError::TypeMismatch { op: ".", expected: "object", found: object.type_name() });
        };
        let obj = r.value.borrow();
        let field = obj.member_get(offset)?;
        self.push(Cell::Heap(field));
        Ok(())
    }

    fn member_set(&mut self, offset: usize) -> Result<(), RuntimeError> {
        let object = self.pop()?;
        let value = self.pop()?;
        let Cell::Heap(r) = &object else {
            return Err(RuntimeError::TypeMismatch { op: ".=", expected: "object", found: object.type_name() });
        };
        let mut obj = r.value.borrow_mut();
        let mut heap = self.heap.borrow_mut();
        obj.member_set(offset, value, &mut heap)?;
        Ok(())
    }
}
