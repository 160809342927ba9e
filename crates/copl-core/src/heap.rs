// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The heap: a singly-linked list of boxed objects with no reclamation.
//!
//! Every heap-resident value — arrays, objects, boxed strings and boxed
//! scalars — lives in a [`HeapNode`] threaded onto a [`Heap`]'s list. Nodes
//! are never unlinked or freed; the `marked` bit is reserved for a future
//! collector and otherwise unused (§9, design note 1/10).

#[cfg(test)]
mod heap_test;

use crate::program::FuncPtr;
use crate::value::Cell;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised by a [`HeapObject`] capability method.
#[derive(Debug, Error)]
pub enum HeapError {
    /// The operation has no meaning for this object's kind.
    #[error("unsupported operation '{op}' on a {kind} value")]
    UnsupportedOperation {
        /// The capability that was attempted (`"set"`, `"element_get"`, ...).
        op: &'static str,
        /// The heap object's kind name.
        kind: &'static str,
    },
    /// An index was outside an array's bounds.
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: i64,
        /// The array's length at the time of access.
        len: usize,
    },
}

/// A heap-resident object. Every variant corresponds to an `OPL_*` subclass
/// in the original runtime; the capability set below (`set`, `element_get`,
/// `element_set`, `member_get`, `member_set`, `deep_clone`) replaces the
/// original's virtual-dispatch overrides.
#[derive(Clone)]
pub enum HeapObject {
    /// A boxed integer, produced when an `int` is stored into a composite.
    Integer(i32),
    /// A boxed float.
    Float(f64),
    /// A boxed boolean.
    Boolean(bool),
    /// A boxed string. Distinct from [`Cell::Str`], which stays inline
    /// until it is stored into an array element or object field.
    String(String),
    /// An ordered, growable sequence of references to other heap objects.
    Array(Vec<HeapRef>),
    /// A fixed-length sequence of references, indexed by compiled field
    /// offset rather than by name.
    Object(Vec<HeapRef>),
    /// The null value, boxed. `NEW_ARRAY`/`NEW_OBJECT` fill their slots
    /// with this before the constructor or initializer runs.
    Null,
    /// An opaque callable pointer stored inside a composite (e.g. a lambda
    /// assigned to an array element).
    RawPointer(FuncPtr),
}

impl HeapObject {
    /// Kind name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "int",
            Self::Float(_) => "float",
            Self::Boolean(_) => "bool",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Null => "null",
            Self::RawPointer(_) => "function",
        }
    }

    /// In-place assignment for primitive-typed (and array) slots: mutates
    /// `self` to take on `other`'s contents without changing `self`'s
    /// identity. Returns `UnsupportedOperation` for `Object`/`Null`/
    /// `RawPointer`, whose slots are replaced by reference instead (the
    /// caller falls back to that when this returns `Err`).
    pub fn set(&mut self, other: &Self) -> Result<(), HeapError> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => {
                *a = *b;
                Ok(())
            }
            (Self::Float(a), Self::Float(b)) => {
                *a = *b;
                Ok(())
            }
            (Self::Boolean(a), Self::Boolean(b)) => {
                *a = *b;
                Ok(())
            }
            (Self::String(a), Self::String(b)) => {
                a.clone_from(b);
                Ok(())
            }
            (Self::Array(a), Self::Array(b)) => {
                // Shallow: shares the child heap nodes with `other`, same
                // as the original's `elements = other->elements`.
                a.clone_from(b);
                Ok(())
            }
            (this, _) => Err(HeapError::UnsupportedOperation {
                op: "set",
                kind: this.type_name(),
            }),
        }
    }

    /// `GET_ELEMENT`: read `object[index]`. Arrays return the stored
    /// reference (composite, aliasing semantics); heap-boxed strings
    /// allocate and return a fresh one-character string.
    pub fn element_get(&self, index: i64, heap: &mut Heap) -> Result<Cell, HeapError> {
        match self {
            Self::Array(elements) => {
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| elements.get(i))
                    .ok_or(HeapError::IndexOutOfBounds {
                        index,
                        len: elements.len(),
                    })?;
                Ok(Cell::Heap(slot.clone()))
            }
            Self::String(s) => {
                let ch = usize::try_from(index)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .ok_or(HeapError::IndexOutOfBounds {
                        index,
                        len: s.chars().count(),
                    })?;
                let boxed = heap.alloc(Self::String(ch.to_string()));
                Ok(Cell::Heap(boxed))
            }
            other => Err(HeapError::UnsupportedOperation {
                op: "element_get",
                kind: other.type_name(),
            }),
        }
    }

    /// `SET_ELEMENT`: write `object[index] = value`. Mutates the existing
    /// slot in place when it accepts `set`; otherwise replaces the slot's
    /// reference outright (composite assignment).
    pub fn element_set(&mut self, index: i64, value: Cell, heap: &mut Heap) -> Result<(), HeapError> {
        let Self::Array(elements) = self else {
            return Err(HeapError::UnsupportedOperation {
                op: "element_set",
                kind: self.type_name(),
            });
        };
        let len = elements.len();
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| elements.get_mut(i))
            .ok_or(HeapError::IndexOutOfBounds { index, len })?;
        set_or_replace(slot, value, heap);
        Ok(())
    }

    /// `MEMBER_GET`: read the field at a compiled offset.
    pub fn member_get(&self, offset: usize) -> Result<HeapRef, HeapError> {
        match self {
            Self::Object(members) => {
                members
                    .get(offset)
                    .cloned()
                    .ok_or(HeapError::IndexOutOfBounds {
                        index: offset as i64,
                        len: members.len(),
                    })
            }
            other => Err(HeapError::UnsupportedOperation {
                op: "member_get",
                kind: other.type_name(),
            }),
        }
    }

    /// `MEMBER_SET`: write the field at a compiled offset, same in-place
    /// vs. replace-by-reference rule as [`Self::element_set`].
    pub fn member_set(&mut self, offset: usize, value: Cell, heap: &mut Heap) -> Result<(), HeapError> {
        let Self::Object(members) = self else {
            return Err(HeapError::UnsupportedOperation {
                op: "member_set",
                kind: self.type_name(),
            });
        };
        let len = members.len();
        let slot = members
            .get_mut(offset)
            .ok_or(HeapError::IndexOutOfBounds {
                index: offset as i64,
                len,
            })?;
        set_or_replace(slot, value, heap);
        Ok(())
    }

    /// `OP_COPY`: recursively clone this object's contents into fresh heap
    /// nodes. Scalars clone trivially; composites clone every child too.
    #[must_use]
    pub fn deep_clone(&self, heap: &mut Heap) -> Self {
        match self {
            Self::Array(elements) => Self::Array(
                elements
                    .iter()
                    .map(|r| {
                        let cloned = r.value.borrow().deep_clone(heap);
                        heap.alloc(cloned)
                    })
                    .collect(),
            ),
            Self::Object(members) => Self::Object(
                members
                    .iter()
                    .map(|r| {
                        let cloned = r.value.borrow().deep_clone(heap);
                        heap.alloc(cloned)
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl fmt::Debug for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(e) => write!(f, "array[{}]", e.len()),
            Self::Object(m) => write!(f, "object[{}]", m.len()),
            Self::Null => write!(f, "null"),
            Self::RawPointer(_) => write!(f, "<function>"),
        }
    }
}

/// Replace `slot` in place if its current contents accept `set`; otherwise
/// swap in a new (or reused) heap reference for `value`.
fn set_or_replace(slot: &mut HeapRef, value: Cell, heap: &mut Heap) {
    let other = value.to_heap_object();
    let accepted = slot.value.borrow_mut().set(&other).is_ok();
    if !accepted {
        *slot = value.into_heap_ref(heap);
    }
}

/// One node in the heap's singly-linked allocation list.
pub struct HeapNode {
    /// The boxed value.
    pub value: RefCell<HeapObject>,
    /// Reserved for a future mark-and-sweep collector; never read or
    /// written by this specification's operations.
    pub marked: std::cell::Cell<bool>,
    next: RefCell<Option<HeapRef>>,
}

/// A shared, reference-counted handle to a [`HeapNode`].
pub type HeapRef = Rc<HeapNode>;

/// The heap: an append-only singly-linked list of [`HeapNode`]s. Nothing
/// is ever unlinked — object lifetime is governed entirely by [`HeapRef`]'s
/// reference count, and the list itself exists only to satisfy the "every
/// allocation is reachable from one root" requirement a future collector
/// would need (§9, design notes 1 and 10).
pub struct Heap {
    head: Option<HeapRef>,
    tail: Option<HeapRef>,
    len: usize,
}

impl Heap {
    /// An empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of live allocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing has been allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocate `value` as a new node, appended to the tail of the list.
    pub fn alloc(&mut self, value: HeapObject) -> HeapRef {
        let node = Rc::new(HeapNode {
            value: RefCell::new(value),
            marked: std::cell::Cell::new(false),
            next: RefCell::new(None),
        });
        match &self.tail {
            Some(tail) => *tail.next.borrow_mut() = Some(node.clone()),
            None => self.head = Some(node.clone()),
        }
        self.tail = Some(node.clone());
        self.len += 1;
        node
    }

    /// Iterate the allocation list in insertion order, for disassembly
    /// and debugging.
    pub fn iter(&self) -> HeapIter<'_> {
        HeapIter {
            next: self.head.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a [`Heap`]'s allocation list in insertion order.
pub struct HeapIter<'a> {
    next: Option<HeapRef>,
    _marker: std::marker::PhantomData<&'a Heap>,
}

impl Iterator for HeapIter<'_> {
    type Item = HeapRef;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.next.borrow().clone();
        Some(current)
    }
}
