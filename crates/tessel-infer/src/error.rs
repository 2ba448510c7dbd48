use tessel_core::Name;
use tessel_model::{ElementId, ExprId};

/// Internal consistency failures. Each one aborts the current resolution pass.
///
/// User-facing conditions (unresolvable references, incompatible types) are never reported
/// through this type; they are recorded in the resolved-type environment and drained into the
/// [`crate::DiagnosticSink`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferError {
    #[error("no resolved-type scope was prepared for member {0:?}")]
    MissingPreparedScope(ElementId),
    #[error("candidate lookup returned no candidates for `{name}` at {expr:?}")]
    EmptyCandidates { name: Name, expr: ExprId },
    #[error("operation {0:?} has no declaring type")]
    MissingDeclaringType(ElementId),
    #[error("element {0:?} is not a declared type")]
    NotAType(ElementId),
}
