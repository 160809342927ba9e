// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::{Heap, HeapError, HeapObject};
use crate::value::Cell;

#[test]
fn alloc_appends_and_grows_len() {
    let mut heap = Heap::new();
    assert!(heap.is_empty());
    heap.alloc(HeapObject::Integer(1));
    heap.alloc(HeapObject::Integer(2));
    assert_eq!(heap.len(), 2);
    let seen: Vec<_> = heap
        .iter()
        .map(|n| match &*n.value.borrow() {
            HeapObject::Integer(i) => *i,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn set_mutates_primitives_in_place() {
    let mut a = HeapObject::Integer(1);
    a.set(&HeapObject::Integer(5)).unwrap();
    assert!(matches!(a, HeapObject::Integer(5)));
}

#[test]
fn set_rejects_object_and_null() {
    let mut obj = HeapObject::Object(vec![]);
    let err = obj.set(&HeapObject::Object(vec![])).unwrap_err();
    assert!(matches!(err, HeapError::UnsupportedOperation { op: "set", .. }));

    let mut null = HeapObject::Null;
    assert!(null.set(&HeapObject::Null).is_err());
}

#[test]
fn element_get_on_array_returns_the_same_reference() {
    let mut heap = Heap::new();
    let inner = heap.alloc(HeapObject::Integer(42));
    let array = HeapObject::Array(vec![inner.clone()]);

    let Cell::Heap(got) = array.element_get(0, &mut heap).unwrap() else {
        panic!("expected heap cell");
    };
    assert!(std::rc::Rc::ptr_eq(&inner, &got));
}

#[test]
fn element_get_on_array_out_of_bounds_errors() {
    let mut heap = Heap::new();
    let array = HeapObject::Array(vec![]);
    let err = array.element_get(0, &mut heap).unwrap_err();
    assert!(matches!(err, HeapError::IndexOutOfBounds { index: 0, len: 0 }));
}

#[test]
fn element_get_on_string_allocates_one_char() {
    let mut heap = Heap::new();
    let s = HeapObject::String("hey".into());
    let Cell::Heap(ch) = s.element_get(1, &mut heap).unwrap() else {
        panic!("expected heap cell");
    };
    assert!(matches!(&*ch.value.borrow(), HeapObject::String(c) if c == "e"));
}

#[test]
fn element_set_replaces_composite_slots_but_mutates_primitive_slots() {
    let mut heap = Heap::new();
    let null_slot = heap.alloc(HeapObject::Null);
    let int_slot = heap.alloc(HeapObject::Integer(1));
    let mut array = HeapObject::Array(vec![null_slot.clone(), int_slot.clone()]);

    array.element_set(0, Cell::Int(9), &mut heap).unwrap();
    let HeapObject::Array(elements) = &array else {
        unreachable!()
    };
    assert!(!std::rc::Rc::ptr_eq(&elements[0], &null_slot));
    assert!(matches!(&*elements[0].value.borrow(), HeapObject::Integer(9)));

    array.element_set(1, Cell::Int(2), &mut heap).unwrap();
    let HeapObject::Array(elements) = &array else {
        unreachable!()
    };
    assert!(std::rc::Rc::ptr_eq(&elements[1], &int_slot));
    assert!(matches!(&*elements[1].value.borrow(), HeapObject::Integer(2)));
}

#[test]
fn member_get_and_set_use_compiled_offsets() {
    let mut heap = Heap::new();
    let mut object = HeapObject::Object(vec![heap.alloc(HeapObject::Null)]);
    object.member_set(0, Cell::Str("hi".into()), &mut heap).unwrap();
    let field = object.member_get(0).unwrap();
    assert!(matches!(&*field.value.borrow(), HeapObject::String(s) if s == "hi"));
}

#[test]
fn deep_clone_of_nested_array_produces_independent_nodes() {
    let mut heap = Heap::new();
    let leaf = heap.alloc(HeapObject::Integer(3));
    let inner = HeapObject::Array(vec![leaf]);
    let inner_ref = heap.alloc(inner);
    let outer = HeapObject::Array(vec![inner_ref.clone()]);

    let cloned = outer.deep_clone(&mut heap);
    let HeapObject::Array(outer_elems) = &cloned else {
        unreachable!()
    };
    assert!(!std::rc::Rc::ptr_eq(&outer_elems[0], &inner_ref));
}
