use tessel_core::{Name, Span};
use tessel_types::TypeRef;

use crate::{ElementId, ExprId};

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// The symbolic reference slot of a feature, assignment or constructor call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureRef {
    /// Deferred placeholder: resolved by the inference pass.
    Pending,
    /// Linked when the tree was built.
    Resolved(ElementId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureCall {
    pub receiver: Option<ExprId>,
    pub name: Name,
    pub args: Vec<ExprId>,
    /// Explicit operation type arguments (`foo.<String>bar()`).
    pub type_args: Vec<TypeRef>,
    pub feature: FeatureRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub receiver: Option<ExprId>,
    pub name: Name,
    pub value: ExprId,
    pub feature: FeatureRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstructorCall {
    /// The instantiated type; generic types without arguments are inferred (`new ArrayList`).
    pub ty: TypeRef,
    pub args: Vec<ExprId>,
    pub constructor: FeatureRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Switch {
    /// Declared switch variable (`switch x : expr`).
    pub local: Option<ElementId>,
    pub discriminant: ExprId,
    pub cases: Vec<SwitchCase>,
    pub default: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub type_guard: Option<TypeRef>,
    pub case: Option<ExprId>,
    pub then: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Null,
    Boolean(bool),
    /// Source text of a number literal (`42`, `0x1F`, `3.5bd`, `7l`).
    Number(String),
    String(String),
    TypeLiteral(TypeRef),
    FeatureCall(FeatureCall),
    Assignment(Assignment),
    ConstructorCall(ConstructorCall),
    Block(Vec<ExprId>),
    VariableDeclaration {
        local: ElementId,
        initializer: Option<ExprId>,
    },
    If {
        condition: ExprId,
        then: ExprId,
        otherwise: Option<ExprId>,
    },
    Switch(Switch),
    While {
        condition: ExprId,
        body: ExprId,
    },
    DoWhile {
        body: ExprId,
        condition: ExprId,
    },
    For {
        param: ElementId,
        iterable: ExprId,
        body: ExprId,
    },
    Closure {
        params: Vec<ElementId>,
        body: ExprId,
    },
    Cast {
        target: TypeRef,
        expr: ExprId,
    },
    InstanceOf {
        expr: ExprId,
        ty: TypeRef,
    },
    Return(Option<ExprId>),
    Throw(ExprId),
}

impl ExprKind {
    /// Direct sub-expressions in evaluation order.
    #[must_use]
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Null
            | ExprKind::Boolean(_)
            | ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::TypeLiteral(_) => Vec::new(),
            ExprKind::FeatureCall(call) => call.receiver.iter().chain(&call.args).copied().collect(),
            ExprKind::Assignment(assign) => assign
                .receiver
                .iter()
                .copied()
                .chain(Some(assign.value))
                .collect(),
            ExprKind::ConstructorCall(call) => call.args.clone(),
            ExprKind::Block(exprs) => exprs.clone(),
            ExprKind::VariableDeclaration { initializer, .. } => initializer.iter().copied().collect(),
            ExprKind::If {
                condition,
                then,
                otherwise,
            } => [*condition, *then].into_iter().chain(*otherwise).collect(),
            ExprKind::Switch(switch) => {
                let mut out = vec![switch.discriminant];
                for case in &switch.cases {
                    out.extend(case.case);
                    out.push(case.then);
                }
                out.extend(switch.default);
                out
            }
            ExprKind::While { condition, body } => vec![*condition, *body],
            ExprKind::DoWhile { body, condition } => vec![*body, *condition],
            ExprKind::For { iterable, body, .. } => vec![*iterable, *body],
            ExprKind::Closure { body, .. } => vec![*body],
            ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => vec![*expr],
            ExprKind::Return(value) => value.iter().copied().collect(),
            ExprKind::Throw(expr) => vec![*expr],
        }
    }
}
