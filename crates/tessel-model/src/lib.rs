//! The declaration and expression model consumed by the inference engine.
//!
//! Declarations ([`Element`]) and expressions ([`Expr`]) live in arenas and are addressed by
//! stable ids, so cyclic references between members never need shared ownership. The tree
//! itself is immutable once built; the only writes an inference pass performs go to the
//! write-back slots of [`Model`]: resolved inferred-type placeholders, resolved links and
//! implicit receivers.

mod element;
mod expr;
mod jdk;
mod model;

use std::fmt;

pub use element::{
    Annotation, AnnotationValue, AnnotationValueKind, Constructor, DeclaredType, Element,
    ElementKind, Field, FieldDecl, Local, Operation, OperationDecl, Parameter, TypeElement,
    Visibility,
};
pub use expr::{
    Assignment, ConstructorCall, Expr, ExprKind, FeatureCall, FeatureRef, Switch, SwitchCase,
};
pub use model::Model;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        ElementId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arena<T> {
    data: Vec<T>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, value: T) -> u32 {
        let idx = u32::try_from(self.data.len())
            .unwrap_or_else(|_| panic!("arena overflow: {} entries", self.data.len()));
        self.data.push(value);
        idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.data.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.data.get_mut(idx)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (i as u32, v))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { data: Vec::new() }
    }
}

impl<T> std::ops::Index<ExprId> for Arena<T> {
    type Output = T;

    fn index(&self, index: ExprId) -> &Self::Output {
        &self.data[index.idx()]
    }
}

impl<T> std::ops::Index<ElementId> for Arena<T> {
    type Output = T;

    fn index(&self, index: ElementId) -> &Self::Output {
        &self.data[index.idx()]
    }
}
