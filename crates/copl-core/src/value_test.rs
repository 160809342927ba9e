// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::Cell;
use crate::heap::{Heap, HeapObject};

#[test]
fn scalars_report_their_type_name() {
    assert_eq!(Cell::Int(1).type_name(), "int");
    assert_eq!(Cell::Float(1.0).type_name(), "float");
    assert_eq!(Cell::Bool(true).type_name(), "bool");
    assert_eq!(Cell::Null.type_name(), "null");
    assert_eq!(Cell::Str("hi".into()).type_name(), "string");
}

#[test]
fn is_double_follows_either_operand() {
    assert!(!Cell::Int(1).is_double());
    assert!(Cell::Float(1.0).is_double());
}

#[test]
fn to_heap_object_boxes_scalars() {
    assert!(matches!(Cell::Int(3).to_heap_object(), HeapObject::Integer(3)));
    assert!(matches!(
        Cell::Str("x".into()).to_heap_object(),
        HeapObject::String(s) if s == "x"
    ));
}

#[test]
fn into_heap_ref_reuses_existing_references() {
    let mut heap = Heap::new();
    let original = heap.alloc(HeapObject::Integer(7));
    let cell = Cell::Heap(original.clone());
    let reused = cell.into_heap_ref(&mut heap);
    assert!(std::rc::Rc::ptr_eq(&original, &reused));
    assert_eq!(heap.len(), 1);
}

#[test]
fn deep_copy_of_an_array_allocates_fresh_nodes() {
    let mut heap = Heap::new();
    let inner = heap.alloc(HeapObject::Integer(1));
    let array = heap.alloc(HeapObject::Array(vec![inner.clone()]));
    let cell = Cell::Heap(array);

    let copied = cell.deep_copy(&mut heap);
    let Cell::Heap(copied_ref) = &copied else {
        panic!("expected a heap cell");
    };
    let HeapObject::Array(elements) = &*copied_ref.value.borrow() else {
        panic!("expected an array");
    };
    assert!(!std::rc::Rc::ptr_eq(&elements[0], &inner));
    assert_eq!(heap.len(), 4);
}
