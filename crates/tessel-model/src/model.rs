use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use tessel_core::{Name, Span};
use tessel_types::{all_super_types, TypeDef, TypeEnv, TypeId, TypeRef, TypeStore, WellKnownTypes};

use crate::element::{
    Constructor, DeclaredType, Element, ElementKind, Field, FieldDecl, Local, Operation,
    OperationDecl, Parameter, TypeElement, Visibility,
};
use crate::expr::{Assignment, ConstructorCall, Expr, ExprKind, FeatureCall, FeatureRef};
use crate::{Arena, ElementId, ExprId};

/// Declarations, expressions and the write-back slots filled by an inference pass.
///
/// Building the model needs `&mut self`; everything an inference pass writes goes through the
/// interior-mutable slots, so a pass only ever borrows the model immutably.
#[derive(Debug)]
pub struct Model {
    types: TypeStore,
    elements: Arena<Element>,
    exprs: Arena<Expr>,
    type_elements: HashMap<TypeId, ElementId>,

    links: RefCell<HashMap<ExprId, ElementId>>,
    implicit_receivers: RefCell<HashMap<ExprId, ElementId>>,
    resolved_types: RefCell<HashMap<ElementId, TypeRef>>,
}

impl Model {
    pub fn new(types: TypeStore) -> Self {
        Self {
            types,
            elements: Arena::default(),
            exprs: Arena::default(),
            type_elements: HashMap::new(),
            links: RefCell::default(),
            implicit_receivers: RefCell::default(),
            resolved_types: RefCell::default(),
        }
    }

    /// A model whose JDK types carry the members the engine's tests and callers rely on.
    pub fn with_minimal_jdk() -> Self {
        let mut model = Self::new(TypeStore::with_minimal_jdk());
        crate::jdk::populate(&mut model);
        model
    }

    #[must_use]
    pub fn types(&self) -> &TypeStore {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeStore {
        &mut self.types
    }

    #[must_use]
    pub fn well_known(&self) -> &WellKnownTypes {
        self.types.well_known()
    }

    // --- declarations -------------------------------------------------------------------------

    /// Registers `def` in the type store and declares a type element for it.
    pub fn add_type(&mut self, def: TypeDef) -> ElementId {
        let id = self.types.add_type(def);
        self.declare_type(id)
    }

    /// Declares the type element of an already registered type. Declaring twice returns the
    /// existing element.
    pub fn declare_type(&mut self, id: TypeId) -> ElementId {
        if let Some(existing) = self.type_elements.get(&id) {
            return *existing;
        }
        let def = self
            .types
            .type_def(id)
            .unwrap_or_else(|| panic!("declaring unknown type {id:?}"))
            .clone();

        let this_type = TypeRef::class(
            id,
            def.type_params.iter().copied().map(TypeRef::simple).collect(),
        );
        let this_local = self.add_local("this", Some(this_type), false);
        let super_local = def
            .super_class
            .clone()
            .map(|sup| self.add_local("super", Some(sup), false));

        let element = ElementId::from_raw(self.elements.alloc(Element {
            name: Name::new(def.name.as_str()),
            span: Span::default(),
            kind: ElementKind::Type(TypeElement {
                id,
                members: Vec::new(),
                visibility: Visibility::Public,
                annotations: Vec::new(),
                this_local,
                super_local,
            }),
        }));
        self.type_elements.insert(id, element);
        element
    }

    pub fn add_field(&mut self, declaring: ElementId, decl: FieldDecl) -> ElementId {
        let field = self.alloc_element(
            decl.name,
            ElementKind::Field(Field {
                declaring,
                ty: decl.ty,
                initializer: decl.initializer,
                is_static: decl.is_static,
                visibility: decl.visibility,
                annotations: decl.annotations,
            }),
        );
        self.push_member(declaring, field);
        field
    }

    pub fn add_operation(&mut self, declaring: ElementId, decl: OperationDecl) -> ElementId {
        let params = decl
            .params
            .into_iter()
            .map(|(name, ty)| self.add_parameter(name, Some(ty)))
            .collect();
        let op = self.alloc_element(
            decl.name,
            ElementKind::Operation(Operation {
                declaring,
                type_params: decl.type_params,
                params,
                return_type: decl.return_type,
                body: decl.body,
                is_static: decl.is_static,
                visibility: decl.visibility,
                annotations: decl.annotations,
            }),
        );
        self.push_member(declaring, op);
        op
    }

    pub fn add_constructor(
        &mut self,
        declaring: ElementId,
        params: Vec<(Name, TypeRef)>,
        visibility: Visibility,
    ) -> ElementId {
        let params = params
            .into_iter()
            .map(|(name, ty)| self.add_parameter(name, Some(ty)))
            .collect();
        let name = self.element(declaring).name.clone();
        let ctor = self.alloc_element(
            name,
            ElementKind::Constructor(Constructor {
                declaring,
                params,
                body: None,
                visibility,
                annotations: Vec::new(),
            }),
        );
        self.push_member(declaring, ctor);
        ctor
    }

    pub fn set_constructor_body(&mut self, ctor: ElementId, body: ExprId) {
        if let Some(Element {
            kind: ElementKind::Constructor(c),
            ..
        }) = self.elements.get_mut(ctor.idx())
        {
            c.body = Some(body);
        }
    }

    pub fn add_local(&mut self, name: impl Into<Name>, ty: Option<TypeRef>, writeable: bool) -> ElementId {
        self.alloc_element(name.into(), ElementKind::Local(Local { ty, writeable }))
    }

    pub fn add_parameter(&mut self, name: impl Into<Name>, ty: Option<TypeRef>) -> ElementId {
        self.alloc_element(name.into(), ElementKind::Parameter(Parameter { ty }))
    }

    fn alloc_element(&mut self, name: Name, kind: ElementKind) -> ElementId {
        ElementId::from_raw(self.elements.alloc(Element {
            name,
            span: Span::default(),
            kind,
        }))
    }

    fn push_member(&mut self, declaring: ElementId, member: ElementId) {
        match self.elements.get_mut(declaring.idx()) {
            Some(Element {
                kind: ElementKind::Type(ty),
                ..
            }) => ty.members.push(member),
            _ => panic!("{declaring:?} is not a type element"),
        }
    }

    // --- expressions --------------------------------------------------------------------------

    pub fn alloc_expr(&mut self, kind: ExprKind) -> ExprId {
        self.alloc_expr_at(kind, Span::default())
    }

    pub fn alloc_expr_at(&mut self, kind: ExprKind, span: Span) -> ExprId {
        ExprId::from_raw(self.exprs.alloc(Expr { kind, span }))
    }

    pub fn null(&mut self) -> ExprId {
        self.alloc_expr(ExprKind::Null)
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.alloc_expr(ExprKind::Boolean(value))
    }

    pub fn number(&mut self, text: &str) -> ExprId {
        self.alloc_expr(ExprKind::Number(text.to_string()))
    }

    pub fn string(&mut self, text: &str) -> ExprId {
        self.alloc_expr(ExprKind::String(text.to_string()))
    }

    pub fn type_literal(&mut self, ty: TypeRef) -> ExprId {
        self.alloc_expr(ExprKind::TypeLiteral(ty))
    }

    /// A pending feature call: `receiver.name(args)` or `name(args)`.
    pub fn call(&mut self, receiver: Option<ExprId>, name: &str, args: Vec<ExprId>) -> ExprId {
        self.alloc_expr(ExprKind::FeatureCall(FeatureCall {
            receiver,
            name: Name::from(name),
            args,
            type_args: Vec::new(),
            feature: FeatureRef::Pending,
        }))
    }

    /// A feature call already linked when the tree was built.
    pub fn linked_call(
        &mut self,
        receiver: Option<ExprId>,
        feature: ElementId,
        args: Vec<ExprId>,
    ) -> ExprId {
        let name = self.element(feature).name.clone();
        self.alloc_expr(ExprKind::FeatureCall(FeatureCall {
            receiver,
            name,
            args,
            type_args: Vec::new(),
            feature: FeatureRef::Resolved(feature),
        }))
    }

    pub fn assign(&mut self, receiver: Option<ExprId>, name: &str, value: ExprId) -> ExprId {
        self.alloc_expr(ExprKind::Assignment(Assignment {
            receiver,
            name: Name::from(name),
            value,
            feature: FeatureRef::Pending,
        }))
    }

    pub fn new_instance(&mut self, ty: TypeRef, args: Vec<ExprId>) -> ExprId {
        self.alloc_expr(ExprKind::ConstructorCall(ConstructorCall {
            ty,
            args,
            constructor: FeatureRef::Pending,
        }))
    }

    pub fn block(&mut self, exprs: Vec<ExprId>) -> ExprId {
        self.alloc_expr(ExprKind::Block(exprs))
    }

    pub fn declare(&mut self, local: ElementId, initializer: Option<ExprId>) -> ExprId {
        self.alloc_expr(ExprKind::VariableDeclaration { local, initializer })
    }

    pub fn if_(&mut self, condition: ExprId, then: ExprId, otherwise: Option<ExprId>) -> ExprId {
        self.alloc_expr(ExprKind::If {
            condition,
            then,
            otherwise,
        })
    }

    pub fn closure(&mut self, params: Vec<ElementId>, body: ExprId) -> ExprId {
        self.alloc_expr(ExprKind::Closure { params, body })
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> ExprId {
        self.alloc_expr(ExprKind::Return(value))
    }

    // --- queries ------------------------------------------------------------------------------

    #[must_use]
    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id]
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    #[must_use]
    pub fn elements(&self) -> &Arena<Element> {
        &self.elements
    }

    #[must_use]
    pub fn exprs(&self) -> &Arena<Expr> {
        &self.exprs
    }

    #[must_use]
    pub fn type_element(&self, id: TypeId) -> Option<ElementId> {
        self.type_elements.get(&id).copied()
    }

    #[must_use]
    pub fn as_type_element(&self, id: ElementId) -> Option<&TypeElement> {
        match &self.element(id).kind {
            ElementKind::Type(ty) => Some(ty),
            _ => None,
        }
    }

    #[must_use]
    pub fn members(&self, type_element: ElementId) -> &[ElementId] {
        self.as_type_element(type_element)
            .map(|ty| ty.members.as_slice())
            .unwrap_or(&[])
    }

    /// The declared type a member belongs to.
    #[must_use]
    pub fn declaring_type(&self, member: ElementId) -> Option<TypeId> {
        let declaring = self.element(member).declaring()?;
        self.as_type_element(declaring).map(|ty| ty.id)
    }

    /// The declared type of a field, operation return, parameter or local. Inferred
    /// placeholders report the written-back type once an inference pass resolved them.
    #[must_use]
    pub fn declared_type(&self, id: ElementId) -> Option<TypeRef> {
        match &self.element(id).kind {
            ElementKind::Field(Field { ty, .. })
            | ElementKind::Operation(Operation {
                return_type: ty, ..
            }) => match ty {
                DeclaredType::Explicit(ty) => Some(ty.clone()),
                DeclaredType::Inferred => self.resolved_type(id),
            },
            ElementKind::Parameter(Parameter { ty }) | ElementKind::Local(Local { ty, .. }) => {
                ty.clone()
            }
            ElementKind::Constructor(_) | ElementKind::Type(_) => None,
        }
    }

    /// Parameter types of an operation or constructor, in declaration order.
    #[must_use]
    pub fn param_types(&self, id: ElementId) -> Vec<TypeRef> {
        let object = TypeRef::simple(self.well_known().object);
        self.element(id)
            .params()
            .iter()
            .map(|p| self.declared_type(*p).unwrap_or_else(|| object.clone()))
            .collect()
    }

    /// The single abstract operation of a functional interface.
    #[must_use]
    pub fn single_abstract_method(&self, iface: TypeId) -> Option<ElementId> {
        let def = self.types.type_def(iface)?;
        if !def.is_interface() {
            return None;
        }

        let mut hierarchy = vec![TypeRef::simple(iface)];
        hierarchy.extend(all_super_types(&self.types, &TypeRef::simple(iface)));

        let mut seen = HashSet::new();
        let mut found = None;
        for ty in hierarchy {
            let Some(id) = ty.type_id() else { continue };
            if !self.types.type_def(id).is_some_and(TypeDef::is_interface) {
                continue;
            }
            let Some(element) = self.type_element(id) else {
                continue;
            };
            for member in self.members(element) {
                let ElementKind::Operation(op) = &self.element(*member).kind else {
                    continue;
                };
                if op.is_static || op.body.is_some() {
                    continue;
                }
                let key = (self.element(*member).name.clone(), op.params.len());
                if !seen.insert(key) {
                    continue;
                }
                if found.is_some() {
                    return None;
                }
                found = Some(*member);
            }
        }
        found
    }

    // --- write-back slots ---------------------------------------------------------------------

    #[must_use]
    pub fn link(&self, expr: ExprId) -> Option<ElementId> {
        self.links.borrow().get(&expr).copied()
    }

    pub fn set_link(&self, expr: ExprId, element: ElementId) {
        self.links.borrow_mut().insert(expr, element);
    }

    #[must_use]
    pub fn implicit_receiver(&self, expr: ExprId) -> Option<ElementId> {
        self.implicit_receivers.borrow().get(&expr).copied()
    }

    pub fn set_implicit_receiver(&self, expr: ExprId, receiver: ElementId) {
        self.implicit_receivers.borrow_mut().insert(expr, receiver);
    }

    /// The type written back into an inferred-type placeholder.
    #[must_use]
    pub fn resolved_type(&self, element: ElementId) -> Option<TypeRef> {
        self.resolved_types.borrow().get(&element).cloned()
    }

    pub fn set_resolved_type(&self, element: ElementId, ty: TypeRef) {
        self.resolved_types.borrow_mut().insert(element, ty);
    }
}

impl TypeEnv for Model {
    fn type_def(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.type_def(id)
    }

    fn lookup(&self, name: &str) -> Option<TypeId> {
        self.types.lookup(name)
    }

    fn well_known(&self) -> &WellKnownTypes {
        self.types.well_known()
    }
}
