//! Drives one resolution pass over a root declaration.
//!
//! Every member first gets a prepared scope (type parameters, `this`, `super`, parameters).
//! Members are then computed in declaration order, except that reading the type of a member
//! with an inferred type computes that member right away. A member that is demanded while it
//! is being computed is part of a cycle; the inner demand yields no type. Reading an inferred
//! member of a type outside the root prepares that type into the same pass.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tessel_config::InferenceConfig;
use tessel_core::{Diagnostic, Name};
use tessel_model::{Annotation, AnnotationValueKind, ElementId, ElementKind, ExprId, Model};
use tessel_types::{substitute, ConformanceHints, TypeEnv, TypeId, TypeRef};

use crate::env::{Link, ResolvedTypes};
use crate::expectation::Expectation;
use crate::lookup::CandidateLookup;
use crate::overrides::find_overridden_operation;
use crate::state::TypeComputationState;
use crate::{DiagnosticSink, FeatureScopeSession, InferError};

struct PreparedMember {
    element: ElementId,
    types: ResolvedTypes,
    session: FeatureScopeSession,
}

#[derive(Clone)]
enum MemberState {
    Prepared(Rc<PreparedMember>),
    InProgress,
    Done,
}

/// The scope a linkable expression was computed in, kept for candidate inspection.
#[derive(Clone)]
pub(crate) struct RecordedSite {
    pub(crate) types: ResolvedTypes,
    pub(crate) session: FeatureScopeSession,
    pub(crate) expectation: Expectation,
}

pub(crate) struct InferCtx<'a> {
    pub(crate) model: &'a Model,
    pub(crate) lookup: &'a dyn CandidateLookup,
    pub(crate) config: &'a InferenceConfig,
    pub(crate) root: ResolvedTypes,
    members: RefCell<HashMap<ElementId, MemberState>>,
    type_scopes: RefCell<HashMap<ElementId, (ResolvedTypes, FeatureScopeSession)>>,
    sites: RefCell<HashMap<ExprId, RecordedSite>>,
}

impl<'a> InferCtx<'a> {
    pub(crate) fn new(
        model: &'a Model,
        lookup: &'a dyn CandidateLookup,
        config: &'a InferenceConfig,
    ) -> Self {
        Self {
            model,
            lookup,
            config,
            root: ResolvedTypes::root(),
            members: RefCell::default(),
            type_scopes: RefCell::default(),
            sites: RefCell::default(),
        }
    }

    // --- preparation --------------------------------------------------------------------------

    /// Prepares the scopes of `type_element`, its members and its nested types.
    pub(crate) fn prepare_type(
        &self,
        type_element: ElementId,
        parent: &ResolvedTypes,
        session: &FeatureScopeSession,
    ) -> Result<(), InferError> {
        let model = self.model;
        let te = model
            .as_type_element(type_element)
            .ok_or(InferError::NotAType(type_element))?;
        let def = model.type_def(te.id).ok_or(InferError::NotAType(type_element))?;

        let scope = parent.push();
        scope.declare_type_params(&def.type_params);
        let this_type = TypeRef::class(
            te.id,
            def.type_params.iter().copied().map(TypeRef::simple).collect(),
        );
        scope.reassign(type_element, Some(this_type.clone()));
        scope.set_element_type(te.this_local, this_type);
        let mut session = session
            .with_context_type(te.id)
            .add_local(Name::from("this"), te.this_local);
        if let (Some(super_local), Some(super_class)) = (te.super_local, def.super_class.clone()) {
            if let Some(super_element) = super_class.type_id().and_then(|id| model.type_element(id)) {
                scope.reassign(super_element, Some(super_class.clone()));
            }
            scope.set_element_type(super_local, super_class);
            session = session.add_local(Name::from("super"), super_local);
        }
        self.type_scopes
            .borrow_mut()
            .insert(type_element, (scope.clone(), session.clone()));

        for member in &te.members {
            match &model.element(*member).kind {
                ElementKind::Type(_) => self.prepare_type(*member, &scope, &session)?,
                ElementKind::Field(field) => {
                    self.prepare_member(*member, &scope, session.with_static_context(field.is_static), &[]);
                }
                ElementKind::Operation(op) => {
                    let member_session = session.with_static_context(op.is_static);
                    self.prepare_member(*member, &scope, member_session, &op.type_params);
                }
                ElementKind::Constructor(_) => {
                    self.prepare_member(*member, &scope, session.with_static_context(false), &[]);
                }
                ElementKind::Parameter(_) | ElementKind::Local(_) => {}
            }
        }
        Ok(())
    }

    fn prepare_member(
        &self,
        member: ElementId,
        type_scope: &ResolvedTypes,
        mut session: FeatureScopeSession,
        type_params: &[TypeId],
    ) {
        let model = self.model;
        let scope = type_scope.push();
        scope.declare_type_params(type_params);
        for param in model.element(member).params() {
            if let Some(ty) = model.declared_type(*param) {
                scope.set_element_type(*param, ty);
            }
            session = session.add_local(model.element(*param).name.clone(), *param);
        }
        self.members.borrow_mut().insert(
            member,
            MemberState::Prepared(Rc::new(PreparedMember {
                element: member,
                types: scope,
                session,
            })),
        );
    }

    /// The prepared scope and session of a declared type.
    pub(crate) fn type_scope(
        &self,
        type_element: ElementId,
    ) -> Option<(ResolvedTypes, FeatureScopeSession)> {
        self.type_scopes.borrow().get(&type_element).cloned()
    }

    // --- computation --------------------------------------------------------------------------

    /// Computes every member of `type_element` that was not demanded earlier.
    pub(crate) fn compute_type(&self, type_element: ElementId) -> Result<(), InferError> {
        let model = self.model;
        let te = model
            .as_type_element(type_element)
            .ok_or(InferError::NotAType(type_element))?;
        let _span = tracing::debug_span!(
            target: "tessel.infer",
            "compute_type",
            ty = %model.element(type_element).name
        )
        .entered();

        for member in &te.members {
            match &model.element(*member).kind {
                ElementKind::Type(_) => self.compute_type(*member)?,
                ElementKind::Field(_) | ElementKind::Operation(_) | ElementKind::Constructor(_) => {
                    self.compute_member(*member)?;
                }
                ElementKind::Parameter(_) | ElementKind::Local(_) => {}
            }
        }

        if let Some((scope, session)) = self.type_scope(type_element) {
            for annotation in &te.annotations {
                self.compute_annotation(&scope, &session, annotation)?;
            }
            merge_to_root(&scope);
        }
        Ok(())
    }

    fn compute_member(&self, member: ElementId) -> Result<(), InferError> {
        let state = self.members.borrow().get(&member).cloned();
        match state {
            Some(MemberState::Prepared(prepared)) => {
                self.run(&prepared)?;
                Ok(())
            }
            Some(MemberState::InProgress | MemberState::Done) => Ok(()),
            None => Err(InferError::MissingPreparedScope(member)),
        }
    }

    /// The type of an inferred member, computing it now if needed. `None` inside a cycle.
    pub(crate) fn demand(&self, member: ElementId) -> Result<Option<TypeRef>, InferError> {
        if let Some(ty) = self.model.resolved_type(member) {
            return Ok(Some(ty));
        }
        let state = self.members.borrow().get(&member).cloned();
        match state {
            Some(MemberState::Prepared(prepared)) => self.run(&prepared),
            Some(MemberState::InProgress) => {
                tracing::debug!(target: "tessel.infer", member = ?member, "demand cycle");
                Ok(None)
            }
            Some(MemberState::Done) => Ok(self
                .root
                .element_type(member)
                .or_else(|| self.model.declared_type(member))),
            None => self.demand_unprepared(member),
        }
    }

    /// Joins the type declaring `member` to this pass and computes `member`. The type's other
    /// members stay prepared until something reads them.
    fn demand_unprepared(&self, member: ElementId) -> Result<Option<TypeRef>, InferError> {
        let Some(declaring) = self.model.element(member).declaring() else {
            return Ok(None);
        };
        if self.type_scope(declaring).is_some() {
            return Err(InferError::MissingPreparedScope(member));
        }
        tracing::debug!(
            target: "tessel.infer",
            member = ?member,
            ty = %self.model.element(declaring).name,
            "preparing declaring type on demand"
        );
        self.prepare_type(declaring, &self.root, &FeatureScopeSession::new())?;
        self.demand(member)
    }

    fn run(&self, prepared: &PreparedMember) -> Result<Option<TypeRef>, InferError> {
        let model = self.model;
        let member = prepared.element;
        let element = model.element(member);
        let _span = tracing::debug_span!(
            target: "tessel.infer",
            "compute_member",
            member = ?member,
            name = %element.name
        )
        .entered();
        self.members.borrow_mut().insert(member, MemberState::InProgress);

        let ty = match &element.kind {
            ElementKind::Field(field) => {
                let explicit = field.ty.explicit().cloned();
                let expectation = match &explicit {
                    Some(ty) => Expectation::of(ty.clone()),
                    None => Expectation::non_void(),
                };
                let state = TypeComputationState::new(
                    self,
                    prepared.types.clone(),
                    prepared.session.clone(),
                    expectation,
                );
                let actual = match field.initializer {
                    Some(initializer) => Some(state.compute_types(initializer)?.actual),
                    None => None,
                };
                match explicit {
                    Some(ty) => Some(ty),
                    None => {
                        let ty = inferred(model, actual);
                        model.set_resolved_type(member, ty.clone());
                        Some(ty)
                    }
                }
            }
            ElementKind::Operation(op) => {
                let explicit = op.return_type.explicit().cloned();
                let expected = match &explicit {
                    Some(ty) => Some(ty.clone()),
                    None => self.overridden_return_type(member)?,
                };
                let returned = match op.body {
                    Some(body) => {
                        let state = TypeComputationState::for_body(
                            self,
                            prepared.types.clone(),
                            prepared.session.clone(),
                            body,
                            expected.clone(),
                        );
                        state.compute_types(body)?;
                        prepared.types.return_type(model, body, expected.as_ref())
                    }
                    None => expected,
                };
                match explicit {
                    Some(ty) => Some(ty),
                    None => {
                        let ty = inferred(model, returned);
                        model.set_resolved_type(member, ty.clone());
                        Some(ty)
                    }
                }
            }
            ElementKind::Constructor(ctor) => {
                if let Some(body) = ctor.body {
                    let state = TypeComputationState::new(
                        self,
                        prepared.types.clone(),
                        prepared.session.clone(),
                        Expectation::none(),
                    );
                    state.compute_types(body)?;
                }
                None
            }
            ElementKind::Type(_) | ElementKind::Parameter(_) | ElementKind::Local(_) => None,
        };

        for annotation in element.annotations() {
            self.compute_annotation(&prepared.types, &prepared.session, annotation)?;
        }
        if let Some(ty) = &ty {
            prepared.types.set_element_type(member, ty.clone());
        }
        merge_to_root(&prepared.types);
        self.members.borrow_mut().insert(member, MemberState::Done);
        tracing::trace!(target: "tessel.infer", member = ?member, ty = ?ty, "member computed");
        Ok(ty)
    }

    /// The return type inherited from an overridden operation, demanding it when the
    /// overridden operation's own return type is inferred.
    fn overridden_return_type(&self, op: ElementId) -> Result<Option<TypeRef>, InferError> {
        let Some(overridden) = find_overridden_operation(self.model, op)? else {
            return Ok(None);
        };
        let ty = match self.model.declared_type(overridden.operation) {
            Some(ty) => Some(ty),
            None => self.demand(overridden.operation)?,
        };
        Ok(ty.map(|ty| substitute(&ty, &overridden.mapping)))
    }

    /// Annotation values are typed against the return type of the annotation operation they
    /// are assigned to.
    fn compute_annotation(
        &self,
        parent: &ResolvedTypes,
        session: &FeatureScopeSession,
        annotation: &Annotation,
    ) -> Result<(), InferError> {
        let model = self.model;
        let scope = parent.push();
        let operations = model
            .type_element(annotation.annotation_type)
            .map(|te| model.members(te))
            .unwrap_or(&[]);

        for value in &annotation.values {
            match &value.value {
                AnnotationValueKind::Expr(expr) => {
                    let expected = operations
                        .iter()
                        .find(|op| model.element(**op).name == value.name)
                        .and_then(|op| model.declared_type(*op));
                    let expectation = match expected {
                        // A single value may stand for a one-element array.
                        Some(TypeRef::Array(component)) => Expectation::of(*component),
                        Some(ty) => Expectation::of(ty),
                        None => Expectation::non_void(),
                    };
                    TypeComputationState::new(self, scope.clone(), session.clone(), expectation)
                        .compute_types(*expr)?;
                }
                AnnotationValueKind::Nested(nested) => {
                    self.compute_annotation(&scope, session, nested)?;
                }
            }
        }
        scope.merge_into_parent();
        Ok(())
    }

    // --- inspection ---------------------------------------------------------------------------

    pub(crate) fn record_site(&self, expr: ExprId, state: &TypeComputationState<'_>) {
        self.sites.borrow_mut().insert(
            expr,
            RecordedSite {
                types: state.types.clone(),
                session: state.session.clone(),
                expectation: state.expectation.clone(),
            },
        );
    }

    pub(crate) fn recorded_site(&self, expr: ExprId) -> Option<RecordedSite> {
        self.sites.borrow().get(&expr).cloned()
    }

    // --- commit -------------------------------------------------------------------------------

    /// Writes resolved links into the model and drains user-facing problems into `sink`.
    pub(crate) fn commit(&self, sink: &dyn DiagnosticSink) {
        let model = self.model;
        let mut unresolved = 0usize;
        for (expr, link) in self.root.local_links() {
            match link {
                Link::Resolved(record) => {
                    model.set_link(expr, record.element);
                    if let Some(receiver) = record.implicit_receiver {
                        model.set_implicit_receiver(expr, receiver);
                    }
                }
                Link::Unresolved { name, span } => {
                    unresolved += 1;
                    if self.config.diagnostics {
                        sink.report(Diagnostic::error(
                            "unresolved-reference",
                            format!("`{name}` cannot be resolved"),
                            Some(span),
                        ));
                    }
                }
            }
        }

        if self.config.diagnostics {
            for (expr, data) in self.root.local_type_data() {
                let Some(bad) = data
                    .iter()
                    .find(|d| d.origin == expr && d.hints.contains(ConformanceHints::INCOMPATIBLE))
                else {
                    continue;
                };
                let message = match &bad.expected {
                    Some(expected) => format!(
                        "type mismatch: cannot convert from {} to {}",
                        bad.ty.display(model),
                        expected.display(model)
                    ),
                    None => format!("{} has no value", bad.ty.display(model)),
                };
                sink.report(Diagnostic::error(
                    "incompatible-types",
                    message,
                    Some(model.expr(expr).span),
                ));
            }
        }
        tracing::debug!(target: "tessel.infer", unresolved, "resolution committed");
    }
}

/// The written-back type of an inferred placeholder.
fn inferred(env: &dyn TypeEnv, actual: Option<TypeRef>) -> TypeRef {
    match actual {
        Some(ty) if !matches!(ty.resolved(), TypeRef::Any) => ty,
        _ => TypeRef::simple(env.well_known().object),
    }
}

pub(crate) fn merge_to_root(scope: &ResolvedTypes) {
    let mut current = scope.clone();
    while let Some(parent) = current.parent().cloned() {
        current.merge_into(&parent);
        current = parent;
    }
}
