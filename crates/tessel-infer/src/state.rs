//! The context handed down while computing one expression.

use std::rc::Rc;

use tessel_model::{ElementId, ElementKind, ExprId};
use tessel_types::{conformance, type_params_in, ConformanceHints, TypeEnv, TypeRef};

use crate::computer;
use crate::env::{ResolvedTypes, TypeData};
use crate::expectation::{Expectation, ExpectationKind};
use crate::orchestrator::InferCtx;
use crate::{FeatureScopeSession, InferError};

/// The body whose returned values are collected: an operation body or a closure body.
#[derive(Debug)]
pub(crate) struct ReturnTarget {
    pub(crate) root: ExprId,
    pub(crate) expected: Option<TypeRef>,
}

/// What a nested computation produced for one expression.
#[derive(Clone, Debug)]
pub(crate) struct ComputedTypes {
    pub(crate) actual: TypeRef,
}

/// The scope, visible locals and expectation of the expression being computed.
///
/// States are cheap to clone; deriving a new expectation or forking the environment never
/// touches the state it was derived from.
#[derive(Clone)]
pub(crate) struct TypeComputationState<'a> {
    pub(crate) ctx: &'a InferCtx<'a>,
    pub(crate) types: ResolvedTypes,
    pub(crate) session: FeatureScopeSession,
    pub(crate) expectation: Expectation,
    returns: Option<Rc<ReturnTarget>>,
    /// The expression whose computation this state belongs to.
    owner: Option<ExprId>,
    /// Enclosing expressions that take over the owner's accepted types (a block takes the
    /// type of its last statement, an `if` the types of its branches).
    relay_chain: Rc<Vec<ExprId>>,
    relay: bool,
}

impl<'a> TypeComputationState<'a> {
    pub(crate) fn new(
        ctx: &'a InferCtx<'a>,
        types: ResolvedTypes,
        session: FeatureScopeSession,
        expectation: Expectation,
    ) -> Self {
        Self {
            ctx,
            types,
            session,
            expectation,
            returns: None,
            owner: None,
            relay_chain: Rc::new(Vec::new()),
            relay: false,
        }
    }

    /// A state for the body rooted at `root`; the body's value and every `return` inside it
    /// are collected as returned values.
    pub(crate) fn for_body(
        ctx: &'a InferCtx<'a>,
        types: ResolvedTypes,
        session: FeatureScopeSession,
        root: ExprId,
        expected: Option<TypeRef>,
    ) -> Self {
        Self {
            returns: Some(Rc::new(ReturnTarget {
                root,
                expected: expected.clone(),
            })),
            ..Self::new(ctx, types, session, Expectation::returning(expected))
        }
    }

    /// A closure body nested in this state.
    pub(crate) fn for_closure_body(&self, root: ExprId, expected: Option<TypeRef>) -> Self {
        Self {
            returns: Some(Rc::new(ReturnTarget {
                root,
                expected: expected.clone(),
            })),
            expectation: Expectation::returning(expected),
            relay: false,
            ..self.clone()
        }
    }

    fn derive(&self, expectation: Expectation) -> Self {
        Self {
            expectation,
            relay: false,
            ..self.clone()
        }
    }

    pub(crate) fn with_expectation(&self, expected: TypeRef) -> Self {
        self.derive(Expectation::of(expected))
    }

    pub(crate) fn without_expectation(&self) -> Self {
        self.derive(Expectation::none())
    }

    pub(crate) fn with_non_void_expectation(&self) -> Self {
        self.derive(Expectation::non_void())
    }

    /// The expectation of a `return` value: the declared or inherited return type of the
    /// enclosing body.
    pub(crate) fn with_return_expectation(&self) -> Self {
        let expected = self.returns.as_ref().and_then(|r| r.expected.clone());
        self.derive(Expectation::returning(expected))
    }

    /// The same computation over another environment scope.
    pub(crate) fn with_types(&self, types: ResolvedTypes) -> Self {
        Self {
            types,
            ..self.clone()
        }
    }

    /// Computes `expr` in a child scope and merges the result into this state's scope.
    pub(crate) fn compute_types(&self, expr: ExprId) -> Result<ComputedTypes, InferError> {
        let scope = self.types.push();
        if let Some(expected) = &self.expectation.expected {
            scope.set_expected(expr, expected.clone());
        }

        let relay_chain = match (self.relay, self.owner) {
            (true, Some(owner)) => {
                let mut chain = (*self.relay_chain).clone();
                chain.push(owner);
                Rc::new(chain)
            }
            (true, None) => self.relay_chain.clone(),
            (false, _) => Rc::new(Vec::new()),
        };
        let nested = Self {
            types: scope.clone(),
            owner: Some(expr),
            relay_chain,
            relay: true,
            ..self.clone()
        };
        computer::compute(&nested, expr)?;
        scope.merge_into_parent();

        let actual = self
            .types
            .actual_type(self.ctx.model, expr)
            .unwrap_or(TypeRef::Any);
        Ok(ComputedTypes { actual })
    }

    /// Records `actual` as a type of the expression being computed, checked against the
    /// current expectation.
    pub(crate) fn accept_actual_type(&self, actual: TypeRef, extra: ConformanceHints) {
        let env: &dyn TypeEnv = self.ctx.model;
        let expected = self.expectation.expected.clone();
        let mut hints = extra;
        if extra.contains(ConformanceHints::NO_VALUE) {
            hints |= ConformanceHints::SUCCESS;
        } else {
            match &expected {
                Some(expected) if expected.is_void(env) => {
                    hints |= ConformanceHints::CHECKED | ConformanceHints::SUCCESS;
                }
                // Variables of a callee still being inferred: the call site checks the
                // argument once they are bound.
                Some(expected) if self.mentions_unbound_type_params(expected) => {
                    hints |= ConformanceHints::UNCHECKED | ConformanceHints::SUCCESS;
                }
                Some(expected) => {
                    hints |= ConformanceHints::CHECKED | conformance(env, expected, &actual);
                }
                None if self.expectation.kind == ExpectationKind::NonVoid && actual.is_void(env) => {
                    hints |= ConformanceHints::CHECKED | ConformanceHints::INCOMPATIBLE;
                }
                None => {
                    hints |= ConformanceHints::EXPECTATION_INDEPENDENT | ConformanceHints::SUCCESS;
                }
            }
        }
        self.record(actual, expected, hints);
    }

    fn mentions_unbound_type_params(&self, ty: &TypeRef) -> bool {
        type_params_in(self.ctx.model, ty)
            .iter()
            .any(|tp| !self.types.is_declared_type_param(*tp))
    }

    /// Records `actual` without checking it; used for references that could not be resolved.
    pub(crate) fn accept_unchecked(&self, actual: TypeRef) {
        let hints = ConformanceHints::UNCHECKED | ConformanceHints::SUCCESS;
        self.record(actual, self.expectation.expected.clone(), hints);
    }

    fn record(&self, actual: TypeRef, expected: Option<TypeRef>, hints: ConformanceHints) {
        let Some(owner) = self.owner else {
            return;
        };
        let data = TypeData {
            ty: actual,
            expected,
            hints,
            origin: owner,
        };
        if self.expectation.is_return() && !hints.contains(ConformanceHints::NO_VALUE) {
            if let Some(target) = &self.returns {
                self.types.add_return(target.root, data.clone());
            }
        }
        for relayed in self.relay_chain.iter() {
            self.types.add_type_data(*relayed, data.clone());
        }
        self.types.add_type_data(owner, data);
    }

    /// Records a value-less `return` for the enclosing body.
    pub(crate) fn add_void_return(&self) {
        let (Some(owner), Some(target)) = (self.owner, &self.returns) else {
            return;
        };
        let void = TypeRef::simple(self.ctx.model.well_known().void);
        self.types.add_return(
            target.root,
            TypeData {
                ty: void,
                expected: target.expected.clone(),
                hints: ConformanceHints::CHECKED | ConformanceHints::SUCCESS,
                origin: owner,
            },
        );
    }

    /// Makes `local` visible to the statements that follow in this state.
    pub(crate) fn add_local_to_current_scope(&mut self, local: ElementId) {
        let name = self.ctx.model.element(local).name.clone();
        self.session = self.session.add_local(name, local);
    }

    /// Binds the type of a local or parameter and makes it visible.
    pub(crate) fn assign_type(&mut self, local: ElementId, ty: TypeRef) {
        self.types.set_element_type(local, ty);
        self.add_local_to_current_scope(local);
    }

    /// The type of `element` as seen from this state: scoped bindings first, then the
    /// declaration, then the on-demand computation of an inferred member.
    pub(crate) fn element_type(&self, element: ElementId) -> Result<Option<TypeRef>, InferError> {
        if let Some(ty) = self.types.element_type(element) {
            return Ok(Some(ty));
        }
        let model = self.ctx.model;
        if let Some(ty) = model.declared_type(element) {
            return Ok(Some(ty));
        }
        match &model.element(element).kind {
            ElementKind::Field(_) | ElementKind::Operation(_) => self.ctx.demand(element),
            ElementKind::Constructor(_) => Ok(model.declaring_type(element).map(|id| {
                let params = model
                    .type_def(id)
                    .map(|def| def.type_params.iter().copied().map(TypeRef::simple).collect())
                    .unwrap_or_default();
                TypeRef::class(id, params)
            })),
            ElementKind::Type(ty) => Ok(Some(TypeRef::simple(ty.id))),
            ElementKind::Parameter(_) | ElementKind::Local(_) => Ok(None),
        }
    }
}
