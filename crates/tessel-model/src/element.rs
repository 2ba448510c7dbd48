use tessel_core::{Name, Span};
use tessel_types::{TypeId, TypeRef};

use crate::{ElementId, ExprId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    Public,
    Protected,
    Package,
    Private,
}

/// The type written on a field or an operation's return position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclaredType {
    Explicit(TypeRef),
    /// Inferred-type placeholder: computed on first use and written back into the model.
    Inferred,
}

impl DeclaredType {
    #[must_use]
    pub fn explicit(&self) -> Option<&TypeRef> {
        match self {
            DeclaredType::Explicit(ty) => Some(ty),
            DeclaredType::Inferred => None,
        }
    }

    pub fn is_inferred(&self) -> bool {
        matches!(self, DeclaredType::Inferred)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub annotation_type: TypeId,
    pub values: Vec<AnnotationValue>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationValue {
    /// Name of the annotation operation the value is assigned to (`value` when implicit).
    pub name: Name,
    pub value: AnnotationValueKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationValueKind {
    Expr(ExprId),
    Nested(Annotation),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub name: Name,
    pub span: Span,
    pub kind: ElementKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    Type(TypeElement),
    Field(Field),
    Operation(Operation),
    Constructor(Constructor),
    Parameter(Parameter),
    Local(Local),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeElement {
    pub id: TypeId,
    /// Fields, operations, constructors and nested types, in declaration order.
    pub members: Vec<ElementId>,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
    /// The implicit `this` local.
    pub this_local: ElementId,
    /// The implicit `super` local; present when the type extends a class.
    pub super_local: Option<ElementId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub declaring: ElementId,
    pub ty: DeclaredType,
    pub initializer: Option<ExprId>,
    pub is_static: bool,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub declaring: ElementId,
    pub type_params: Vec<TypeId>,
    pub params: Vec<ElementId>,
    pub return_type: DeclaredType,
    /// `None` for abstract operations.
    pub body: Option<ExprId>,
    pub is_static: bool,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constructor {
    pub declaring: ElementId,
    pub params: Vec<ElementId>,
    pub body: Option<ExprId>,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    /// Closure parameters may omit their type.
    pub ty: Option<TypeRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Local {
    pub ty: Option<TypeRef>,
    pub writeable: bool,
}

impl Element {
    pub fn is_static(&self) -> bool {
        match &self.kind {
            ElementKind::Field(f) => f.is_static,
            ElementKind::Operation(op) => op.is_static,
            _ => false,
        }
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        match &self.kind {
            ElementKind::Type(t) => t.visibility,
            ElementKind::Field(f) => f.visibility,
            ElementKind::Operation(op) => op.visibility,
            ElementKind::Constructor(c) => c.visibility,
            ElementKind::Parameter(_) | ElementKind::Local(_) => Visibility::Public,
        }
    }

    /// The type element a member belongs to.
    #[must_use]
    pub fn declaring(&self) -> Option<ElementId> {
        match &self.kind {
            ElementKind::Field(f) => Some(f.declaring),
            ElementKind::Operation(op) => Some(op.declaring),
            ElementKind::Constructor(c) => Some(c.declaring),
            _ => None,
        }
    }

    #[must_use]
    pub fn params(&self) -> &[ElementId] {
        match &self.kind {
            ElementKind::Operation(op) => &op.params,
            ElementKind::Constructor(c) => &c.params,
            _ => &[],
        }
    }

    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        match &self.kind {
            ElementKind::Type(t) => &t.annotations,
            ElementKind::Field(f) => &f.annotations,
            ElementKind::Operation(op) => &op.annotations,
            ElementKind::Constructor(c) => &c.annotations,
            ElementKind::Parameter(_) | ElementKind::Local(_) => &[],
        }
    }
}

/// Builder input for [`crate::Model::add_field`].
#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: DeclaredType,
    pub initializer: Option<ExprId>,
    pub is_static: bool,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
}

impl FieldDecl {
    pub fn new(name: impl Into<Name>, ty: DeclaredType) -> Self {
        Self {
            name: name.into(),
            ty,
            initializer: None,
            is_static: false,
            visibility: Visibility::Public,
            annotations: Vec::new(),
        }
    }

    pub fn initializer(mut self, expr: ExprId) -> Self {
        self.initializer = Some(expr);
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Builder input for [`crate::Model::add_operation`].
#[derive(Clone, Debug)]
pub struct OperationDecl {
    pub name: Name,
    pub type_params: Vec<TypeId>,
    pub params: Vec<(Name, TypeRef)>,
    pub return_type: DeclaredType,
    pub body: Option<ExprId>,
    pub is_static: bool,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
}

impl OperationDecl {
    pub fn new(name: impl Into<Name>, return_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            params: Vec::new(),
            return_type,
            body: None,
            is_static: false,
            visibility: Visibility::Public,
            annotations: Vec::new(),
        }
    }

    pub fn type_param(mut self, tp: TypeId) -> Self {
        self.type_params.push(tp);
        self
    }

    pub fn param(mut self, name: impl Into<Name>, ty: TypeRef) -> Self {
        self.params.push((name.into(), ty));
        self
    }

    pub fn body(mut self, body: ExprId) -> Self {
        self.body = Some(body);
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}
