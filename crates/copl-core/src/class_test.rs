// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::{Access, ClassDescriptor};

#[test]
fn fields_are_assigned_offsets_in_declaration_order() {
    let mut class = ClassDescriptor::new("Point");
    let x = class.declare_field("x", "int", Access::Public);
    let y = class.declare_field("y", "int", Access::Private);
    assert_eq!(x, 0);
    assert_eq!(y, 1);
    assert_eq!(class.field_count(), 2);
}

#[test]
fn offset_of_and_type_of_resolve_by_name() {
    let mut class = ClassDescriptor::new("Point");
    class.declare_field("x", "int", Access::Public);
    class.declare_field("y", "int", Access::Public);
    assert_eq!(class.offset_of("y"), Some(1));
    assert_eq!(class.type_of("y"), Some("int"));
    assert_eq!(class.offset_of("z"), None);
}
