//! The resolved-type environment: a parent-linked chain of scopes.
//!
//! Every nested computation pushes a child scope. Queries consult the nearest scope first and
//! walk up on a miss. A child's bindings only become visible to its parent through an explicit
//! merge; a child that is never merged is simply dropped.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tessel_core::{Name, Span};
use tessel_model::{ElementId, ExprId};
use tessel_types::{common_super_type, conformance, ConformanceHints, TypeEnv, TypeId, TypeRef};

/// One accepted actual type of an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeData {
    pub ty: TypeRef,
    pub expected: Option<TypeRef>,
    pub hints: ConformanceHints,
    /// The expression whose computation accepted the type; differs from the keyed expression
    /// when the value was relayed (the last statement of a block, the branch of an `if`).
    pub origin: ExprId,
}

/// The committed resolution of a symbolic reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Link {
    Resolved(LinkRecord),
    Unresolved { name: Name, span: Span },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRecord {
    pub element: ElementId,
    pub implicit_receiver: Option<ElementId>,
    pub receiver_type: Option<TypeRef>,
}

impl Link {
    #[must_use]
    pub fn element(&self) -> Option<ElementId> {
        match self {
            Link::Resolved(record) => Some(record.element),
            Link::Unresolved { .. } => None,
        }
    }
}

#[derive(Default)]
struct LayerData {
    expr_types: HashMap<ExprId, Vec<TypeData>>,
    expected: HashMap<ExprId, TypeRef>,
    returns: HashMap<ExprId, Vec<TypeData>>,
    element_types: HashMap<ElementId, TypeRef>,
    links: HashMap<ExprId, Link>,
    // Scope-local: never merged.
    reassigned: HashMap<ElementId, Option<TypeRef>>,
    declared_type_params: Vec<TypeId>,
}

struct Layer {
    parent: Option<ResolvedTypes>,
    data: RefCell<LayerData>,
    dirty: Cell<bool>,
}

/// A handle to one scope of the environment. Clones share the scope.
#[derive(Clone)]
pub struct ResolvedTypes(Rc<Layer>);

impl fmt::Debug for ResolvedTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.data.borrow();
        f.debug_struct("ResolvedTypes")
            .field("depth", &self.depth())
            .field("exprs", &data.expr_types.len())
            .field("elements", &data.element_types.len())
            .field("links", &data.links.len())
            .finish()
    }
}

impl Default for ResolvedTypes {
    fn default() -> Self {
        Self::root()
    }
}

impl ResolvedTypes {
    pub fn root() -> Self {
        Self(Rc::new(Layer {
            parent: None,
            data: RefCell::default(),
            dirty: Cell::new(false),
        }))
    }

    /// A new child scope chained to `self`.
    #[must_use]
    pub fn push(&self) -> Self {
        Self(Rc::new(Layer {
            parent: Some(self.clone()),
            data: RefCell::default(),
            dirty: Cell::new(false),
        }))
    }

    #[must_use]
    pub fn parent(&self) -> Option<&ResolvedTypes> {
        self.0.parent.as_ref()
    }

    fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    fn ancestors(&self) -> impl Iterator<Item = &ResolvedTypes> {
        std::iter::successors(Some(self), |scope| scope.parent())
    }

    pub fn ptr_eq(&self, other: &ResolvedTypes) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn write(&self) -> std::cell::RefMut<'_, LayerData> {
        self.0.dirty.set(true);
        self.0.data.borrow_mut()
    }

    // --- expressions --------------------------------------------------------------------------

    /// Appends an accepted type. The first write in a scope starts from the inherited list, so
    /// the local list always supersedes the parent's.
    pub fn add_type_data(&self, expr: ExprId, data: TypeData) {
        let inherited = if self.0.data.borrow().expr_types.contains_key(&expr) {
            None
        } else {
            Some(self.parent().and_then(|p| p.type_data(expr)).unwrap_or_default())
        };
        let mut local = self.write();
        let entries = local
            .expr_types
            .entry(expr)
            .or_insert_with(|| inherited.unwrap_or_default());
        entries.push(data);
    }

    #[must_use]
    pub fn type_data(&self, expr: ExprId) -> Option<Vec<TypeData>> {
        self.ancestors()
            .find_map(|scope| scope.0.data.borrow().expr_types.get(&expr).cloned())
    }

    /// The join of every value-carrying type accepted for `expr`; `void` when only statements
    /// without a value were accepted.
    pub fn actual_type(&self, env: &dyn TypeEnv, expr: ExprId) -> Option<TypeRef> {
        let data = self.type_data(expr)?;
        Some(join(env, &data))
    }

    pub fn set_expected(&self, expr: ExprId, expected: TypeRef) {
        self.write().expected.insert(expr, expected);
    }

    #[must_use]
    pub fn expected_type(&self, expr: ExprId) -> Option<TypeRef> {
        self.ancestors()
            .find_map(|scope| scope.0.data.borrow().expected.get(&expr).cloned())
    }

    pub fn add_return(&self, root: ExprId, data: TypeData) {
        let inherited = if self.0.data.borrow().returns.contains_key(&root) {
            None
        } else {
            Some(
                self.parent()
                    .and_then(|p| p.return_data(root))
                    .unwrap_or_default(),
            )
        };
        self.write()
            .returns
            .entry(root)
            .or_insert_with(|| inherited.unwrap_or_default())
            .push(data);
    }

    #[must_use]
    pub fn return_data(&self, root: ExprId) -> Option<Vec<TypeData>> {
        self.ancestors()
            .find_map(|scope| scope.0.data.borrow().returns.get(&root).cloned())
    }

    /// The type returned from the body rooted at `root`: the expected return type when every
    /// returned value conforms to it, the join of the returned values otherwise.
    pub fn return_type(&self, env: &dyn TypeEnv, root: ExprId, expected: Option<&TypeRef>) -> Option<TypeRef> {
        let data = self.return_data(root)?;
        if let Some(expected) = expected {
            let all_conform = data
                .iter()
                .filter(|d| !d.hints.contains(ConformanceHints::NO_VALUE))
                .all(|d| expected.is_void(env) || conformance(env, expected, &d.ty).is_success());
            if all_conform {
                return Some(expected.clone());
            }
        }
        Some(join(env, &data))
    }

    // --- elements -----------------------------------------------------------------------------

    pub fn set_element_type(&self, element: ElementId, ty: TypeRef) {
        self.write().element_types.insert(element, ty);
    }

    /// Overrides the type of `element` in this scope only. `None` hides every binding made by
    /// enclosing scopes.
    pub fn reassign(&self, element: ElementId, ty: Option<TypeRef>) {
        self.write().reassigned.insert(element, ty);
    }

    #[must_use]
    pub fn element_type(&self, element: ElementId) -> Option<TypeRef> {
        for scope in self.ancestors() {
            let data = scope.0.data.borrow();
            if let Some(reassigned) = data.reassigned.get(&element) {
                return reassigned.clone();
            }
            if let Some(ty) = data.element_types.get(&element) {
                return Some(ty.clone());
            }
        }
        None
    }

    pub fn declare_type_params(&self, params: &[TypeId]) {
        self.write().declared_type_params.extend_from_slice(params);
    }

    /// Whether a type parameter is declared by this scope or an enclosing one.
    #[must_use]
    pub fn is_declared_type_param(&self, param: TypeId) -> bool {
        self.ancestors()
            .any(|scope| scope.0.data.borrow().declared_type_params.contains(&param))
    }

    // --- links --------------------------------------------------------------------------------

    pub fn set_link(&self, expr: ExprId, link: Link) {
        self.write().links.insert(expr, link);
    }

    #[must_use]
    pub fn link(&self, expr: ExprId) -> Option<Link> {
        self.ancestors()
            .find_map(|scope| scope.0.data.borrow().links.get(&expr).cloned())
    }

    /// Links recorded in this scope, ordered by expression.
    #[must_use]
    pub fn local_links(&self) -> Vec<(ExprId, Link)> {
        let mut links: Vec<_> = self
            .0
            .data
            .borrow()
            .links
            .iter()
            .map(|(expr, link)| (*expr, link.clone()))
            .collect();
        links.sort_by_key(|(expr, _)| *expr);
        links
    }

    /// Accepted types recorded in this scope, ordered by expression.
    #[must_use]
    pub fn local_type_data(&self) -> Vec<(ExprId, Vec<TypeData>)> {
        let mut data: Vec<_> = self
            .0
            .data
            .borrow()
            .expr_types
            .iter()
            .map(|(expr, data)| (*expr, data.clone()))
            .collect();
        data.sort_by_key(|(expr, _)| *expr);
        data
    }

    // --- merging ------------------------------------------------------------------------------

    /// Copies every mergeable binding of this scope into its parent. A no-op for the root.
    pub fn merge_into_parent(&self) {
        if let Some(parent) = self.parent() {
            self.merge_into(parent);
        }
    }

    /// Copies every mergeable binding of this scope into `target`, replacing `target`'s
    /// bindings for the same keys. Reassignments and declared type parameters stay local.
    ///
    /// Merging again without an intervening write is a no-op.
    pub fn merge_into(&self, target: &ResolvedTypes) {
        if !self.0.dirty.get() || self.ptr_eq(target) {
            return;
        }
        {
            let source = self.0.data.borrow();
            let mut dest = target.write();
            for (expr, data) in &source.expr_types {
                dest.expr_types.insert(*expr, data.clone());
            }
            for (expr, ty) in &source.expected {
                dest.expected.insert(*expr, ty.clone());
            }
            for (root, data) in &source.returns {
                dest.returns.insert(*root, data.clone());
            }
            for (element, ty) in &source.element_types {
                dest.element_types.insert(*element, ty.clone());
            }
            for (expr, link) in &source.links {
                dest.links.insert(*expr, link.clone());
            }
        }
        self.0.dirty.set(false);
    }
}

fn join(env: &dyn TypeEnv, data: &[TypeData]) -> TypeRef {
    let void = TypeRef::simple(env.well_known().void);
    let values: Vec<TypeRef> = data
        .iter()
        .filter(|d| !d.hints.contains(ConformanceHints::NO_VALUE) && !d.ty.is_void(env))
        .map(|d| d.ty.clone())
        .collect();
    match values.as_slice() {
        [] => void,
        [only] => only.clone(),
        _ => common_super_type(env, &values).unwrap_or_else(|| values[0].clone()),
    }
}
