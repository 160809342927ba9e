// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Compile-time class layout: turns `instance.field` into an integer
//! offset the VM can index an `Object`'s member vector with.

#[cfg(test)]
mod class_test;

/// Whether a field or method was declared `public` or `private`.
///
/// Recorded for every field but not enforced anywhere in the VM (§9,
/// design note 8) — a private field is just as reachable as a public one
/// at runtime. Kept only so a future access check has somewhere to read
/// the declaration from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// `public` (the default when unspecified).
    Public,
    /// `private`.
    Private,
}

/// One declared field: its name, its declared type, its compiled offset,
/// and its declared access.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// The field's source name.
    pub name: String,
    /// Its declared type, in the compiler's textual type notation
    /// (`"int"`, `"Point"`, `"[int]"`, `"lambda"`).
    pub ty: String,
    /// Its index into the object's member vector, assigned in declaration
    /// order.
    pub offset: usize,
    /// Declared visibility.
    pub access: Access,
}

/// A compiled class: its fields in declaration order.
///
/// The compiler builds one of these per `class` declaration while
/// visiting the AST, then consults it to resolve every `a.b` reference in
/// the class's methods to a `MEMBER_GET`/`MEMBER_SET` with a numeric
/// offset rather than a name lookup.
#[derive(Debug, Clone, Default)]
pub struct ClassDescriptor {
    /// The class's source name.
    pub name: String,
    /// Declared fields, in the order `NEW_OBJECT` must allocate them.
    pub fields: Vec<FieldInfo>,
}

impl ClassDescriptor {
    /// A class with no fields yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declare the next field, assigning it the next free offset.
    pub fn declare_field(&mut self, name: impl Into<String>, ty: impl Into<String>, access: Access) -> usize {
        let offset = self.fields.len();
        self.fields.push(FieldInfo {
            name: name.into(),
            ty: ty.into(),
            offset,
            access,
        });
        offset
    }

    /// Resolve a field name to its compiled offset.
    #[must_use]
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.offset)
    }

    /// Resolve a field name to its declared type.
    #[must_use]
    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.ty.as_str())
    }

    /// Total number of fields, i.e. the size `NEW_OBJECT` must allocate.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
