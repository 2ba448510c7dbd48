//! Demand-driven, bidirectional type inference and member resolution.
//!
//! A [`TypeResolver`] runs one resolution pass over a declared type of a [`Model`]: every
//! member is prepared, then computed in declaration order, with inferred members computed on
//! first use. Expected types flow top-down into expressions, actual types flow bottom-up, and
//! every feature call, assignment and constructor call is linked to a declaration.
//!
//! A pass leaves two durable results in the model: the resolved types of inferred-type
//! placeholders and the resolved links (plus implicit receivers) of symbolic references. The
//! returned [`Resolution`] answers type queries for the rest of the pass' data.
//!
//! ```text
//! TypeResolver::resolve_type
//!   └─ InferCtx::prepare_type   scopes, `this`/`super`, parameters
//!   └─ InferCtx::compute_type   members in order, demand on inferred types
//!        └─ TypeComputationState::compute_types  one child scope per expression
//!             └─ linking        candidates, applicability, ranking, apply
//!   └─ InferCtx::commit         links into the model, diagnostics into the sink
//! ```

mod computer;
mod env;
mod error;
mod expectation;
mod linking;
mod literals;
mod lookup;
mod orchestrator;
mod overrides;
mod session;
mod state;

use std::cell::RefCell;

use tessel_config::InferenceConfig;
use tessel_core::Diagnostic;
use tessel_model::{ElementId, ExprId, ExprKind, Model};
use tessel_types::{ConformanceHints, TypeRef};

pub use env::{Link, LinkRecord, ResolvedTypes, TypeData};
pub use error::InferError;
pub use linking::{CandidateKind, LinkingCandidate};
pub use literals::LiteralRepresentation;
pub use lookup::{
    Bucket, CandidateLookup, LookupSite, ModelLookup, NamedCandidate, ReferenceKind, TypeOracle,
};
pub use overrides::{
    all_operations, find_overridden_operation, overridden_return_type, OverriddenOperation,
};
pub use session::FeatureScopeSession;

use crate::expectation::Expectation;
use crate::orchestrator::InferCtx;
use crate::state::TypeComputationState;

/// Receives the user-facing problems of a pass: unresolvable references and values that do
/// not conform to their expected type.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

impl DiagnosticSink for RefCell<Vec<Diagnostic>> {
    fn report(&self, diagnostic: Diagnostic) {
        self.borrow_mut().push(diagnostic);
    }
}

/// Discards every diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDiagnostics;

impl DiagnosticSink for NoDiagnostics {
    fn report(&self, _diagnostic: Diagnostic) {}
}

pub struct TypeResolver<'m> {
    model: &'m Model,
    config: InferenceConfig,
    lookup: Box<dyn CandidateLookup + 'm>,
}

impl<'m> TypeResolver<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self::with_config(model, InferenceConfig::default())
    }

    pub fn with_config(model: &'m Model, config: InferenceConfig) -> Self {
        let lookup = Box::new(ModelLookup::new(&config));
        Self {
            model,
            config,
            lookup,
        }
    }

    /// Replaces the default [`ModelLookup`].
    #[must_use]
    pub fn with_lookup(mut self, lookup: impl CandidateLookup + 'm) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    #[must_use]
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Resolves every member of the declared type `root`, including nested types.
    pub fn resolve_type(
        &self,
        root: ElementId,
        sink: &dyn DiagnosticSink,
    ) -> Result<Resolution<'_>, InferError> {
        let _span = tracing::debug_span!(
            target: "tessel.infer",
            "resolve_type",
            root = %self.model.element(root).name
        )
        .entered();

        let ctx = InferCtx::new(self.model, self.lookup.as_ref(), &self.config);
        ctx.prepare_type(root, &ctx.root, &FeatureScopeSession::new())?;
        ctx.compute_type(root)?;
        ctx.commit(sink);
        Ok(Resolution { ctx })
    }

    /// Resolves a free-standing expression. With a `context` type, the expression sees that
    /// type's members through `this`, and inferred members are computed as they are used.
    pub fn resolve_expression(
        &self,
        expr: ExprId,
        context: Option<ElementId>,
        expected: Option<TypeRef>,
        sink: &dyn DiagnosticSink,
    ) -> Result<Resolution<'_>, InferError> {
        let _span =
            tracing::debug_span!(target: "tessel.infer", "resolve_expression", expr = ?expr)
                .entered();

        let ctx = InferCtx::new(self.model, self.lookup.as_ref(), &self.config);
        let (scope, session) = match context {
            Some(context) => {
                ctx.prepare_type(context, &ctx.root, &FeatureScopeSession::new())?;
                ctx.type_scope(context)
                    .ok_or(InferError::MissingPreparedScope(context))?
            }
            None => (ctx.root.clone(), FeatureScopeSession::new()),
        };
        {
            let expectation = match expected {
                Some(ty) => Expectation::of(ty),
                None => Expectation::non_void(),
            };
            let expr_scope = scope.push();
            let state = TypeComputationState::new(&ctx, expr_scope.clone(), session, expectation);
            state.compute_types(expr)?;
            expr_scope.merge_into_parent();
            orchestrator::merge_to_root(&scope);
        }
        ctx.commit(sink);
        Ok(Resolution { ctx })
    }
}

/// The environment of a finished pass.
pub struct Resolution<'a> {
    ctx: InferCtx<'a>,
}

impl Resolution<'_> {
    /// The join of every type accepted for `expr`.
    #[must_use]
    pub fn actual_type(&self, expr: ExprId) -> Option<TypeRef> {
        self.ctx.root.actual_type(self.ctx.model, expr)
    }

    #[must_use]
    pub fn expected_type(&self, expr: ExprId) -> Option<TypeRef> {
        self.ctx.root.expected_type(expr)
    }

    /// Every accepted type of `expr`, including the ones relayed from nested expressions.
    #[must_use]
    pub fn type_data(&self, expr: ExprId) -> Vec<TypeData> {
        self.ctx.root.type_data(expr).unwrap_or_default()
    }

    /// The join of the values returned from the body rooted at `body`.
    #[must_use]
    pub fn return_type(&self, body: ExprId) -> Option<TypeRef> {
        self.ctx.root.return_type(self.ctx.model, body, None)
    }

    /// The computed type of a member, local or parameter.
    #[must_use]
    pub fn element_type(&self, element: ElementId) -> Option<TypeRef> {
        self.ctx
            .root
            .element_type(element)
            .or_else(|| self.ctx.model.declared_type(element))
    }

    /// The conformance hints of the types `expr` itself accepted.
    #[must_use]
    pub fn conformance_hints(&self, expr: ExprId) -> ConformanceHints {
        self.type_data(expr)
            .iter()
            .filter(|d| d.origin == expr)
            .fold(ConformanceHints::empty(), |acc, d| acc | d.hints)
    }

    #[must_use]
    pub fn link(&self, expr: ExprId) -> Option<Link> {
        self.ctx.root.link(expr)
    }

    /// The ranked candidates of a feature call, assignment or constructor call, recomputed in
    /// the scope the reference was linked in. Nothing is committed.
    pub fn linking_candidates(&self, expr: ExprId) -> Result<Vec<LinkingCandidate>, InferError> {
        let Some(site) = self.ctx.recorded_site(expr) else {
            return Ok(Vec::new());
        };
        let state =
            TypeComputationState::new(&self.ctx, site.types, site.session, site.expectation);
        linking::candidates(&state, expr)
    }

    /// How a number literal is materialized under its computed type.
    #[must_use]
    pub fn literal_representation(&self, expr: ExprId) -> Option<LiteralRepresentation> {
        let ExprKind::Number(text) = &self.ctx.model.expr(expr).kind else {
            return None;
        };
        let ty = self.actual_type(expr)?;
        Some(literals::representation(self.ctx.model, text, &ty))
    }

    /// Bindings of the root scope.
    #[must_use]
    pub fn types(&self) -> &ResolvedTypes {
        &self.ctx.root
    }
}
