use tessel_types::TypeRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExpectationKind {
    /// The value is not used.
    None,
    /// The value is used; `expected` names the target type if one is known.
    Plain,
    /// A value is required, of any type (discriminants, receivers, untyped initializers).
    NonVoid,
    /// The value leaves the enclosing body as its result.
    Return,
}

/// The target type pushed top-down into an expression before its actual type is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Expectation {
    pub(crate) expected: Option<TypeRef>,
    pub(crate) kind: ExpectationKind,
}

impl Expectation {
    pub(crate) fn none() -> Self {
        Self {
            expected: None,
            kind: ExpectationKind::None,
        }
    }

    pub(crate) fn of(expected: TypeRef) -> Self {
        Self {
            expected: Some(expected),
            kind: ExpectationKind::Plain,
        }
    }

    pub(crate) fn non_void() -> Self {
        Self {
            expected: None,
            kind: ExpectationKind::NonVoid,
        }
    }

    pub(crate) fn returning(expected: Option<TypeRef>) -> Self {
        Self {
            expected,
            kind: ExpectationKind::Return,
        }
    }

    pub(crate) fn is_return(&self) -> bool {
        self.kind == ExpectationKind::Return
    }
}
