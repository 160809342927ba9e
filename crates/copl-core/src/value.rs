// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Stack-resident values ("cells").
//!
//! A [`Cell`] is what lives on an operand stack or in a named slot: either
//! a direct scalar or a reference into the heap. Scalars are copied on
//! assignment; heap references alias, giving composite values (arrays,
//! objects) reference semantics.

#[cfg(test)]
mod value_test;

use crate::heap::{Heap, HeapObject, HeapRef};
use crate::program::FuncPtr;
use std::fmt;

/// A value cell: either a direct scalar or a reference to a heap object.
#[derive(Clone)]
pub enum Cell {
    /// 32-bit signed integer.
    Int(i32),
    /// IEEE-754 double.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// The null value.
    Null,
    /// An inline string. Stays off the heap until it is stored into a
    /// composite (array element or object field), at which point it is
    /// boxed into a [`HeapObject::String`].
    Str(String),
    /// A function pointer: either a lambda (from `LOAD_FUNC_ADDR`) or an
    /// imported module method (from `LOAD_MODULE_METHOD`). Shares storage
    /// with the "raw pointer" scalar the specification describes — the
    /// source language never needs an opaque pointer that isn't callable.
    Func(FuncPtr),
    /// A reference to a heap-allocated object.
    Heap(HeapRef),
}

impl Cell {
    /// Type name for diagnostics, matching the original `BV_*`/`S_*` kind names.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::Str(_) => "string",
            Self::Func(_) => "function",
            Self::Heap(r) => r.value.borrow().type_name(),
        }
    }

    /// Returns true if this cell holds a boolean `true`.
    ///
    /// Conditions in Copl require an actual boolean (§4.E: "no truthiness"),
    /// so this is only used after a type check, never as an implicit coercion.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Heap(r) => match &*r.value.borrow() {
                HeapObject::Boolean(b) => Some(*b),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns the numeric value as an `f64`, for arithmetic promotion.
    ///
    /// Only integers and floats (stack-resident or heap-boxed) are numeric.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Float(f) => Some(*f),
            Self::Heap(r) => match &*r.value.borrow() {
                HeapObject::Integer(i) => Some(f64::from(*i)),
                HeapObject::Float(f) => Some(*f),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns true if either operand is a double, stack-resident or heap-boxed.
    #[must_use]
    pub fn is_double(&self) -> bool {
        matches!(self, Self::Float(_))
            || matches!(self, Self::Heap(r) if matches!(&*r.value.borrow(), HeapObject::Float(_)))
    }

    /// Returns the string contents if this is an inline or heap-boxed string.
    #[must_use]
    pub fn as_str(&self) -> Option<std::cell::Ref<'_, str>> {
        match self {
            Self::Heap(r) => {
                let borrowed = r.value.borrow();
                if matches!(&*borrowed, HeapObject::String(_)) {
                    Some(std::cell::Ref::map(borrowed, |v| match v {
                        HeapObject::String(s) => s.as_str(),
                        _ => unreachable!(),
                    }))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Convert this cell into a detached [`HeapObject`] of the matching
    /// variant, boxing scalars and unwrapping (shallow-cloning) heap
    /// references. This is the "val_conv" step the original VM runs before
    /// storing a value into an object field or array element.
    #[must_use]
    pub fn to_heap_object(&self) -> HeapObject {
        match self {
            Self::Int(i) => HeapObject::Integer(*i),
            Self::Float(f) => HeapObject::Float(*f),
            Self::Bool(b) => HeapObject::Boolean(*b),
            Self::Null => HeapObject::Null,
            Self::Str(s) => HeapObject::String(s.clone()),
            Self::Func(f) => HeapObject::RawPointer(f.clone()),
            Self::Heap(r) => r.value.borrow().clone(),
        }
    }

    /// Return a heap reference for this cell, allocating a new heap node
    /// only if the cell isn't already heap-resident. Reuses an existing
    /// reference as-is, preserving identity for composite assignment.
    pub fn into_heap_ref(self, heap: &mut Heap) -> HeapRef {
        match self {
            Self::Heap(r) => r,
            other => heap.alloc(other.to_heap_object()),
        }
    }

    /// Deep copy: scalars are bit-copied, heap values are recursively
    /// cloned into fresh heap nodes. This is `OP_COPY`.
    #[must_use]
    pub fn deep_copy(&self, heap: &mut Heap) -> Self {
        match self {
            Self::Heap(r) => {
                let cloned = r.value.borrow().deep_clone(heap);
                Self::Heap(heap.alloc(cloned))
            }
            other => other.clone(),
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Null => write!(f, "Null"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Func(_) => write!(f, "Func(..)"),
            Self::Heap(r) => write!(f, "Heap({:?})", r.value.borrow()),
        }
    }
}
