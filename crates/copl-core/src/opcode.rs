// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The instruction set: one opcode word optionally followed by a fixed
//! number of operand words, all stored as `i32` in a [`crate::Chunk`]'s
//! `code` array (§4.B, §4.E).

#[cfg(test)]
mod opcode_test;

use thiserror::Error;

/// An opcode read back from a chunk's code array that doesn't correspond
/// to any known instruction — a corrupt or hand-edited bytecode file.
#[derive(Debug, Error)]
#[error("unknown opcode {0}")]
pub struct UnknownOpcode(pub i32);

/// One Copl instruction.
///
/// Every variant's operand count is fixed and known at compile time, which
/// is what lets the compiler's backpatch pass compute absolute addresses
/// by simply counting emitted words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Opcode {
    /// No-op, used as a label anchor for jump targets.
    Nop = 0,
    /// Push `constants[operand]`.
    LoadConst = 1,
    /// Push a literal small integer carried directly in the operand word.
    LoadImmediate = 2,
    /// Load `names[operand]`, resolving the current frame's locals first,
    /// then falling back to the VM's global table (populated only by
    /// builtins; the grammar has no top-level variable declarations, so
    /// the fallback is reachable but never actually bound in practice).
    LoadName = 3,
    /// Pop one value and store it under `names[operand]` in the *current*
    /// frame's locals, unconditionally. This is how a fresh callee's
    /// parameter-binding prologue works: the very first `SET_NAME` for a
    /// parameter runs before that name is bound in the new frame, so
    /// "write locally if already bound, else globally" would corrupt
    /// recursive calls by spilling first-parameter bindings into a single
    /// shared global slot.
    SetName = 4,
    /// Pop two numbers, push their sum (promoted per §4.E).
    Add = 5,
    /// Pop two numbers, push their difference.
    Sub = 6,
    /// Pop two numbers, push their product.
    Mul = 7,
    /// Pop two numbers, push their quotient (integer division truncates).
    Div = 8,
    /// Pop two numbers, push the remainder (`fmod` for doubles).
    Mod = 9,
    /// Pop two integers, push the left shifted by the right.
    Shl = 10,
    /// Pop two integers, push the left shifted right by the right.
    Shr = 11,
    /// Pop two integers, push their bitwise AND.
    BAnd = 12,
    /// Pop two integers, push their bitwise OR.
    BOr = 13,
    /// Pop one integer, push its bitwise complement.
    BNot = 14,
    /// Pop one boolean, push its negation.
    Not = 15,
    /// Pop two booleans, push their logical AND.
    And = 16,
    /// Pop two booleans, push their logical OR.
    Or = 17,
    /// Pop two values, push a boolean: string equality if either operand
    /// is a string, numeric equality otherwise.
    Eq = 18,
    /// As [`Self::Eq`], negated.
    Neq = 19,
    /// Pop two numbers, push `a < b`.
    Lt = 20,
    /// Pop two numbers, push `a <= b`.
    Le = 21,
    /// Pop two numbers, push `a > b`.
    Gt = 22,
    /// Pop two numbers, push `a >= b`.
    Ge = 23,
    /// Jump unconditionally to the absolute address in the operand.
    Jump = 24,
    /// Pop a boolean; jump to the absolute address in the operand if it's
    /// `false`.
    JumpIfFalse = 25,
    /// Pop a boolean; jump to the absolute address in the operand if it's
    /// `true`.
    JumpIfTrue = 26,
    /// Allocate a fresh array of `operand` null slots, push a heap
    /// reference to it.
    NewArray = 27,
    /// Allocate a fresh object of `operand` null slots, push a heap
    /// reference to it.
    NewObject = 28,
    /// Pop the index, then the object, push the element.
    GetElement = 29,
    /// Pop the index, then the object, then the value; store `value`
    /// into `object[index]`. Pushes nothing.
    SetElement = 30,
    /// Pop `object`, push the field at the compiled offset in the
    /// operand.
    MemberGet = 31,
    /// Pop the object, then the value; store `value` into the field at
    /// the compiled offset in the operand. Pushes nothing.
    MemberSet = 32,
    /// Duplicate the top of the operand stack.
    Dup = 33,
    /// Swap the top two values of the operand stack.
    Swap = 34,
    /// Rotate the top three values of the operand stack.
    Rot = 35,
    /// Discard the top of the operand stack.
    Pop = 36,
    /// Pop a value, push a deep copy of it.
    Copy = 37,
    /// Call the function with id `operand` directly, consuming its
    /// declared argument count from the caller's operand stack.
    Call = 38,
    /// Pop a function-pointer cell and call it indirectly.
    SpecialCall = 39,
    /// Push a function-pointer cell for the lambda with id `operand`.
    LoadFuncAddr = 40,
    /// Pop a module-alias string, look up `constants[operand]` as a
    /// method name in that module, push a function-pointer cell flagged
    /// as module-originated.
    LoadModuleMethod = 41,
    /// Load and install a module: `constants[operand_0]` is the bytecode
    /// file path, `constants[operand_1]` is the alias it's installed
    /// under.
    LoadModule = 42,
    /// Pop the callee's return value, pop its frame, push the value to
    /// the caller.
    Return = 43,
    /// Pop the callee's frame with no return value.
    Leave = 44,
    /// Pop an integer exit code and terminate the process.
    Halt = 45,
}

impl Opcode {
    /// Number of `i32` operand words following this opcode in the code
    /// array.
    #[must_use]
    pub fn operand_count(self) -> usize {
        match self {
            Self::Nop
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Mod
            | Self::Shl
            | Self::Shr
            | Self::BAnd
            | Self::BOr
            | Self::BNot
            | Self::Not
            | Self::And
            | Self::Or
            | Self::Eq
            | Self::Neq
            | Self::Lt
            | Self::Le
            | Self::Gt
            | Self::Ge
            | Self::GetElement
            | Self::SetElement
            | Self::Dup
            | Self::Swap
            | Self::Rot
            | Self::Pop
            | Self::Copy
            | Self::SpecialCall
            | Self::Return
            | Self::Leave
            | Self::Halt => 0,
            Self::LoadConst
            | Self::LoadImmediate
            | Self::LoadName
            | Self::SetName
            | Self::Jump
            | Self::JumpIfFalse
            | Self::JumpIfTrue
            | Self::NewArray
            | Self::NewObject
            | Self::MemberGet
            | Self::MemberSet
            | Self::Call
            | Self::LoadFuncAddr
            | Self::LoadModuleMethod => 1,
            Self::LoadModule => 2,
        }
    }

    /// Short mnemonic used by the disassembler.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::LoadConst => "LOAD_CONST",
            Self::LoadImmediate => "LOAD_IMMEDIATE",
            Self::LoadName => "LOAD_NAME",
            Self::SetName => "SET_NAME",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::BAnd => "BAND",
            Self::BOr => "BOR",
            Self::BNot => "BNOT",
            Self::Not => "NOT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::Jump => "JUMP",
            Self::JumpIfFalse => "JUMP_IF_FALSE",
            Self::JumpIfTrue => "JUMP_IF_TRUE",
            Self::NewArray => "NEW_ARRAY",
            Self::NewObject => "NEW_OBJECT",
            Self::GetElement => "GET_ELEMENT",
            Self::SetElement => "SET_ELEMENT",
            Self::MemberGet => "MEMBER_GET",
            Self::MemberSet => "MEMBER_SET",
            Self::Dup => "DUP",
            Self::Swap => "SWAP",
            Self::Rot => "ROT",
            Self::Pop => "POP",
            Self::Copy => "COPY",
            Self::Call => "CALL",
            Self::SpecialCall => "SPECIAL_CALL",
            Self::LoadFuncAddr => "LOAD_FUNC_ADDR",
            Self::LoadModuleMethod => "LOAD_MODULE_METHOD",
            Self::LoadModule => "LOAD_MODULE",
            Self::Return => "RETURN",
            Self::Leave => "LEAVE",
            Self::Halt => "HALT",
        }
    }
}

impl TryFrom<i32> for Opcode {
    type Error = UnknownOpcode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Nop,
            1 => Self::LoadConst,
            2 => Self::LoadImmediate,
            3 => Self::LoadName,
            4 => Self::SetName,
            5 => Self::Add,
            6 => Self::Sub,
            7 => Self::Mul,
            8 => Self::Div,
            9 => Self::Mod,
            10 => Self::Shl,
            11 => Self::Shr,
            12 => Self::BAnd,
            13 => Self::BOr,
            14 => Self::BNot,
            15 => Self::Not,
            16 => Self::And,
            17 => Self::Or,
            18 => Self::Eq,
            19 => Self::Neq,
            20 => Self::Lt,
            21 => Self::Le,
            22 => Self::Gt,
            23 => Self::Ge,
            24 => Self::Jump,
            25 => Self::JumpIfFalse,
            26 => Self::JumpIfTrue,
            27 => Self::NewArray,
            28 => Self::NewObject,
            29 => Self::GetElement,
            30 => Self::SetElement,
            31 => Self::MemberGet,
            32 => Self::MemberSet,
            33 => Self::Dup,
            34 => Self::Swap,
            35 => Self::Rot,
            36 => Self::Pop,
            37 => Self::Copy,
            38 => Self::Call,
            39 => Self::SpecialCall,
            40 => Self::LoadFuncAddr,
            41 => Self::LoadModuleMethod,
            42 => Self::LoadModule,
            43 => Self::Return,
            44 => Self::Leave,
            45 => Self::Halt,
            other => return Err(UnknownOpcode(other)),
        })
    }
}

impl From<Opcode> for i32 {
    fn from(op: Opcode) -> Self {
        op as i32
    }
}
