//! Demand-driven linking of feature calls, assignments and constructor calls.
//!
//! Every candidate the lookup offers is evaluated in a private child of the demand scope: its
//! type arguments are bound, its arguments are computed against its parameter types, and the
//! conformance of each argument is scored. Only the winning candidate's scope is merged back;
//! losers are dropped with everything they computed.

use tessel_core::{Name, Span};
use tessel_model::{ElementId, ElementKind, ExprId, ExprKind, FeatureRef, Model, Visibility};
use tessel_types::{
    conformance, declaring_type_mapping, erase_undeclared, erasure, infer_type_args,
    instantiate_as_supertype, is_conformant, is_subtype_of, substitute, type_params_in,
    ConformanceHints, Substitution, TypeEnv, TypeId, TypeRef,
};

use crate::env::{Link, LinkRecord, ResolvedTypes};
use crate::lookup::{Bucket, LookupSite, NamedCandidate, ReferenceKind, TypeOracle};
use crate::state::TypeComputationState;
use crate::{FeatureScopeSession, InferError};

/// How the candidates of a reference were obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    /// The reference was linked before the pass, or by an earlier computation.
    AlreadyResolved,
    /// Exactly one applicable candidate.
    Unique,
    /// Several applicable candidates; the first one won.
    Competing,
    /// Nothing applicable.
    Unresolvable,
}

/// One candidate of a reference, as reported by [`crate::Resolution::linking_candidates`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkingCandidate {
    pub kind: CandidateKind,
    /// `None` for the placeholder describing a name nothing matched.
    pub element: Option<ElementId>,
    pub name: Name,
    pub span: Span,
    /// The type the reference would have if this candidate were linked.
    pub feature_type: Option<TypeRef>,
    pub implicit_receiver: Option<ElementId>,
    pub applicable: bool,
    pub selected: bool,
}

/// A linkable expression, flattened.
struct Site {
    expr: ExprId,
    kind: ReferenceKind,
    name: Name,
    receiver: Option<ExprId>,
    args: Vec<ExprId>,
    /// The assigned value of an assignment.
    value: Option<ExprId>,
    type_args: Vec<TypeRef>,
    feature: FeatureRef,
    constructed: Option<TypeRef>,
    span: Span,
}

impl Site {
    fn of(model: &Model, expr: ExprId) -> Option<Site> {
        let node = model.expr(expr);
        let site = match &node.kind {
            ExprKind::FeatureCall(call) => Site {
                expr,
                kind: ReferenceKind::Feature,
                name: call.name.clone(),
                receiver: call.receiver,
                args: call.args.clone(),
                value: None,
                type_args: call.type_args.clone(),
                feature: call.feature,
                constructed: None,
                span: node.span,
            },
            ExprKind::Assignment(assign) => Site {
                expr,
                kind: ReferenceKind::Assignment,
                name: assign.name.clone(),
                receiver: assign.receiver,
                args: Vec::new(),
                value: Some(assign.value),
                type_args: Vec::new(),
                feature: assign.feature,
                constructed: None,
                span: node.span,
            },
            ExprKind::ConstructorCall(call) => Site {
                expr,
                kind: ReferenceKind::Constructor,
                name: call
                    .ty
                    .type_id()
                    .and_then(|id| model.type_def(id))
                    .map_or_else(|| Name::from("<unknown>"), |def| Name::new(def.simple_name())),
                receiver: None,
                args: call.args.clone(),
                value: None,
                type_args: Vec::new(),
                feature: call.constructor,
                constructed: Some(call.ty.clone()),
                span: node.span,
            },
            _ => return None,
        };
        Some(site)
    }

    fn has_type_literal_receiver(&self, model: &Model) -> bool {
        self.receiver
            .is_some_and(|r| matches!(model.expr(r).kind, ExprKind::TypeLiteral(_)))
    }
}

struct Evaluated {
    element: ElementId,
    bucket: Bucket,
    order: usize,
    scope: ResolvedTypes,
    applicable: bool,
    param_types: Vec<TypeRef>,
    feature_type: TypeRef,
    incompatible: usize,
    boxing: usize,
}

struct Ranked {
    kind: CandidateKind,
    /// Best first.
    candidates: Vec<Evaluated>,
    /// The lookup's placeholder for a name nothing matched.
    error: Option<(Name, Span)>,
}

impl Ranked {
    fn winner(&self) -> Option<&Evaluated> {
        self.candidates.first().filter(|c| c.applicable)
    }
}

/// Links `expr` and accepts the type of the linked feature.
pub(crate) fn compute_linked(
    state: &TypeComputationState<'_>,
    expr: ExprId,
) -> Result<(), InferError> {
    let model = state.ctx.model;
    let Some(site) = Site::of(model, expr) else {
        return Ok(());
    };
    state.ctx.record_site(expr, state);

    let demand_scope = state.types.push();
    let demand = state.with_types(demand_scope.clone());
    let ranked = rank(&demand, &site, true)?;
    let void = TypeRef::simple(model.well_known().void);

    match ranked.winner() {
        Some(winner) => {
            tracing::debug!(
                target: "tessel.infer",
                expr = ?expr,
                name = %site.name,
                element = ?winner.element,
                kind = ?ranked.kind,
                candidates = ranked.candidates.len(),
                "linked reference"
            );
            winner.scope.set_link(
                expr,
                Link::Resolved(LinkRecord {
                    element: winner.element,
                    implicit_receiver: winner.bucket.implicit_receiver,
                    receiver_type: winner.bucket.receiver_type.clone(),
                }),
            );
            winner.scope.merge_into_parent();
            demand_scope.merge_into_parent();
            let ty = match site.kind {
                ReferenceKind::Assignment => void,
                ReferenceKind::Feature | ReferenceKind::Constructor => winner.feature_type.clone(),
            };
            state.accept_actual_type(ty, ConformanceHints::empty());
        }
        None => {
            for arg in site.args.iter().chain(site.value.iter()) {
                demand.with_non_void_expectation().compute_types(*arg)?;
            }
            let (name, span) = ranked
                .error
                .clone()
                .unwrap_or_else(|| (site.name.clone(), site.span));
            tracing::debug!(
                target: "tessel.infer",
                expr = ?expr,
                name = %name,
                candidates = ranked.candidates.len(),
                "unresolvable reference"
            );
            demand_scope.set_link(expr, Link::Unresolved { name, span });
            demand_scope.merge_into_parent();
            match site.kind {
                ReferenceKind::Assignment => {
                    state.accept_actual_type(void, ConformanceHints::NO_VALUE);
                }
                ReferenceKind::Feature | ReferenceKind::Constructor => {
                    state.accept_unchecked(TypeRef::Any);
                }
            }
        }
    }
    Ok(())
}

/// Re-evaluates every candidate of `expr` without committing anything.
pub(crate) fn candidates(
    state: &TypeComputationState<'_>,
    expr: ExprId,
) -> Result<Vec<LinkingCandidate>, InferError> {
    let model = state.ctx.model;
    let Some(site) = Site::of(model, expr) else {
        return Ok(Vec::new());
    };
    let demand = state.with_types(state.types.push());
    let ranked = rank(&demand, &site, false)?;
    let has_winner = ranked.winner().is_some();

    let mut out: Vec<LinkingCandidate> = ranked
        .candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| LinkingCandidate {
            kind: ranked.kind,
            element: Some(c.element),
            name: site.name.clone(),
            span: site.span,
            feature_type: c.applicable.then(|| c.feature_type.clone()),
            implicit_receiver: c.bucket.implicit_receiver,
            applicable: c.applicable,
            selected: idx == 0 && has_winner,
        })
        .collect();
    if let Some((name, span)) = ranked.error {
        out.push(LinkingCandidate {
            kind: CandidateKind::Unresolvable,
            element: None,
            name,
            span,
            feature_type: None,
            implicit_receiver: None,
            applicable: false,
            selected: false,
        });
    }
    Ok(out)
}

fn rank(
    demand: &TypeComputationState<'_>,
    site: &Site,
    consult_env: bool,
) -> Result<Ranked, InferError> {
    let model = demand.ctx.model;
    let receiver_type = match site.receiver {
        Some(receiver) => Some(
            demand
                .with_non_void_expectation()
                .compute_types(receiver)?
                .actual,
        ),
        None => None,
    };

    if let Some((element, implicit_receiver)) = preset_link(demand, site, consult_env) {
        let receiver_type = match (receiver_type, implicit_receiver) {
            (Some(ty), _) => Some(explicit_receiver_type(model, site, ty)),
            (None, Some(receiver)) => demand.element_type(receiver)?,
            (None, None) => site.constructed.clone(),
        };
        let bucket = Bucket {
            receiver_type,
            implicit_receiver,
            rank: 0,
            static_access: site.has_type_literal_receiver(model),
        };
        let evaluated = evaluate(demand, site, element, bucket, 0, false)?;
        return Ok(Ranked {
            kind: CandidateKind::AlreadyResolved,
            candidates: vec![evaluated],
            error: None,
        });
    }

    let lookup_site = LookupSite {
        expr: site.expr,
        kind: site.kind,
        name: site.name.clone(),
        receiver: site.receiver,
        receiver_type,
        constructed_type: site.constructed.clone(),
        arg_count: site.args.len(),
        span: site.span,
    };
    let oracle = DemandOracle { state: demand };
    let found = demand
        .ctx
        .lookup
        .candidates_for(model, &lookup_site, &demand.session, &oracle)?;
    if found.is_empty() {
        return Err(InferError::EmptyCandidates {
            name: site.name.clone(),
            expr: site.expr,
        });
    }

    let mut candidates = Vec::new();
    let mut error = None;
    for (order, candidate) in found.into_iter().enumerate() {
        match candidate {
            NamedCandidate::Element { element, bucket } => {
                candidates.push(evaluate(demand, site, element, bucket, order, true)?);
            }
            NamedCandidate::Error { name, span } => error = Some((name, span)),
        }
    }

    let kind = match candidates.iter().filter(|c| c.applicable).count() {
        0 => CandidateKind::Unresolvable,
        1 => CandidateKind::Unique,
        _ => CandidateKind::Competing,
    };
    order_candidates(model, &mut candidates);
    Ok(Ranked {
        kind,
        candidates,
        error,
    })
}

/// The element `site` is already bound to, with its implicit receiver.
fn preset_link(
    demand: &TypeComputationState<'_>,
    site: &Site,
    consult_env: bool,
) -> Option<(ElementId, Option<ElementId>)> {
    let model = demand.ctx.model;
    if consult_env {
        if let Some(Link::Resolved(record)) = demand.types.link(site.expr) {
            return Some((record.element, record.implicit_receiver));
        }
        if let Some(element) = model.link(site.expr) {
            return Some((element, model.implicit_receiver(site.expr)));
        }
    }
    let FeatureRef::Resolved(element) = site.feature else {
        return None;
    };
    let el = model.element(element);
    let implicit_receiver = match &el.kind {
        ElementKind::Field(_) | ElementKind::Operation(_)
            if site.receiver.is_none() && !el.is_static() =>
        {
            demand.session.local("this")
        }
        _ => None,
    };
    Some((element, implicit_receiver))
}

fn explicit_receiver_type(model: &Model, site: &Site, actual: TypeRef) -> TypeRef {
    if let Some(ExprKind::TypeLiteral(ty)) = site.receiver.map(|r| &model.expr(r).kind) {
        return ty.clone();
    }
    match actual.resolved() {
        TypeRef::Any => TypeRef::simple(model.well_known().object),
        _ => actual.boxed(model),
    }
}

/// Binds type arguments, computes arguments and scores one candidate in a private scope.
fn evaluate(
    demand: &TypeComputationState<'_>,
    site: &Site,
    element: ElementId,
    bucket: Bucket,
    order: usize,
    check_applicability: bool,
) -> Result<Evaluated, InferError> {
    let model = demand.ctx.model;
    let object = TypeRef::simple(model.well_known().object);
    let scope = demand.types.push();
    let candidate = demand.with_types(scope.clone());

    let mut evaluated = Evaluated {
        element,
        bucket,
        order,
        scope: scope.clone(),
        applicable: true,
        param_types: Vec::new(),
        feature_type: TypeRef::Any,
        incompatible: 0,
        boxing: 0,
    };
    if check_applicability && !is_applicable(demand, site, element, &evaluated.bucket) {
        evaluated.applicable = false;
        return Ok(evaluated);
    }

    let el = model.element(element);
    let declaring = model.declaring_type(element);
    let mut mapping = Substitution::new();
    let mut vars: Vec<TypeId> = Vec::new();
    match &el.kind {
        ElementKind::Constructor(_) => {
            if let Some(declaring) = declaring {
                let params = type_params_of(model, declaring);
                let args = site
                    .constructed
                    .as_ref()
                    .map(|t| t.args().to_vec())
                    .unwrap_or_default();
                if !params.is_empty() && args.len() == params.len() {
                    mapping.extend(params.iter().copied().zip(args));
                } else {
                    // `new ArrayList` infers the class type arguments like operation ones.
                    vars.extend(params);
                }
            }
        }
        _ => {
            if let (Some(receiver), Some(declaring)) = (&evaluated.bucket.receiver_type, declaring) {
                mapping = declaring_type_mapping(model, receiver, declaring);
            }
            if let ElementKind::Operation(op) = &el.kind {
                vars.extend(op.type_params.iter().copied());
            }
        }
    }

    let mut bindings = Substitution::new();
    for (var, arg) in vars.iter().zip(&site.type_args) {
        bindings.insert(*var, arg.clone());
    }

    let formals: Vec<TypeRef> = model
        .param_types(element)
        .iter()
        .map(|p| substitute(p, &mapping))
        .collect();
    let raw_feature = match &el.kind {
        ElementKind::Constructor(_) => match declaring {
            Some(declaring) => {
                let params = type_params_of(model, declaring)
                    .into_iter()
                    .map(TypeRef::simple)
                    .collect();
                substitute(&TypeRef::class(declaring, params), &mapping)
            }
            None => object.clone(),
        },
        ElementKind::Local(_) | ElementKind::Parameter(_) => candidate
            .element_type(element)?
            .unwrap_or_else(|| object.clone()),
        ElementKind::Field(_) | ElementKind::Operation(_) => substitute(
            &candidate
                .element_type(element)?
                .unwrap_or_else(|| object.clone()),
            &mapping,
        ),
        ElementKind::Type(ty) => TypeRef::simple(ty.id),
    };

    let is_setter =
        site.kind == ReferenceKind::Assignment && matches!(el.kind, ElementKind::Operation(_));
    let args: Vec<ExprId> = if is_setter {
        site.value.into_iter().collect()
    } else {
        site.args.clone()
    };
    let mentions_vars = |ty: &TypeRef| {
        type_params_in(model, ty)
            .iter()
            .any(|tp| vars.contains(tp))
    };

    // Closures are typed last: their parameter types come from bindings the other
    // arguments and the expectation establish.
    let mut arg_types = vec![TypeRef::Any; args.len()];
    for (idx, arg) in args.iter().enumerate() {
        if is_closure(model, *arg) {
            continue;
        }
        let arg_state = match formals.get(idx) {
            Some(formal) if !mentions_vars(formal) => candidate.with_expectation(formal.clone()),
            _ => candidate.with_non_void_expectation(),
        };
        let actual = arg_state.compute_types(*arg)?.actual;
        if let Some(formal) = formals.get(idx) {
            infer_type_args(model, formal, &actual, &vars, &mut bindings);
        }
        arg_types[idx] = actual;
    }
    if site.kind != ReferenceKind::Assignment && !vars.is_empty() {
        if let Some(expected) = &demand.expectation.expected {
            bind_from_expectation(model, &raw_feature, expected, &vars, &mut bindings);
        }
    }
    for (idx, arg) in args.iter().enumerate() {
        if !is_closure(model, *arg) {
            continue;
        }
        let arg_state = match formals.get(idx) {
            Some(formal) => candidate.with_expectation(substitute(formal, &bindings)),
            None => candidate.with_non_void_expectation(),
        };
        let actual = arg_state.compute_types(*arg)?.actual;
        if let Some(formal) = formals.get(idx) {
            infer_type_args(model, formal, &actual, &vars, &mut bindings);
        }
        arg_types[idx] = actual;
    }

    for var in &vars {
        if !bindings.contains_key(var) {
            bindings.insert(*var, erasure(model, &TypeRef::simple(*var)));
        }
    }
    let declared = |tp: TypeId| scope.is_declared_type_param(tp);
    let mut param_types: Vec<TypeRef> = formals
        .iter()
        .map(|f| erase_undeclared(model, &substitute(f, &bindings), &declared))
        .collect();
    let feature_type = erase_undeclared(model, &substitute(&raw_feature, &bindings), &declared);

    if site.kind == ReferenceKind::Assignment && !is_setter {
        if let Some(value) = site.value {
            let actual = candidate
                .with_expectation(feature_type.clone())
                .compute_types(value)?
                .actual;
            param_types = vec![feature_type.clone()];
            arg_types = vec![actual];
        }
    }

    for (formal, actual) in param_types.iter().zip(&arg_types) {
        let hints = conformance(model, formal, actual);
        if !hints.is_success() {
            evaluated.incompatible += 1;
        }
        if hints.contains(ConformanceHints::BOXING) || hints.contains(ConformanceHints::UNBOXING) {
            evaluated.boxing += 1;
        }
    }
    evaluated.param_types = param_types;
    evaluated.feature_type = feature_type;
    Ok(evaluated)
}

fn type_params_of(model: &Model, id: TypeId) -> Vec<TypeId> {
    model
        .type_def(id)
        .map(|def| def.type_params.clone())
        .unwrap_or_default()
}

fn is_closure(model: &Model, expr: ExprId) -> bool {
    matches!(model.expr(expr).kind, ExprKind::Closure { .. })
}

/// Binds type variables of `formal` from the type the call site expects.
fn bind_from_expectation(
    env: &dyn TypeEnv,
    formal: &TypeRef,
    expected: &TypeRef,
    vars: &[TypeId],
    bindings: &mut Substitution,
) {
    if formal.type_id().is_some_and(|id| vars.contains(&id)) {
        infer_type_args(env, formal, expected, vars, bindings);
        return;
    }
    let Some(target) = expected.boxed(env).type_id() else {
        return;
    };
    if let Some(view) = instantiate_as_supertype(env, formal, target) {
        infer_type_args(env, &view, &expected.boxed(env), vars, bindings);
    }
}

fn is_applicable(
    demand: &TypeComputationState<'_>,
    site: &Site,
    element: ElementId,
    bucket: &Bucket,
) -> bool {
    let model = demand.ctx.model;
    let el = model.element(element);
    let arity_matches = match &el.kind {
        ElementKind::Operation(op) => match site.kind {
            ReferenceKind::Assignment => op.params.len() == 1,
            ReferenceKind::Feature => op.params.len() == site.args.len(),
            ReferenceKind::Constructor => false,
        },
        ElementKind::Constructor(c) => {
            site.kind == ReferenceKind::Constructor && c.params.len() == site.args.len()
        }
        ElementKind::Field(_) => site.kind != ReferenceKind::Constructor && site.args.is_empty(),
        ElementKind::Local(local) => match site.kind {
            ReferenceKind::Feature => site.args.is_empty(),
            ReferenceKind::Assignment => local.writeable,
            ReferenceKind::Constructor => false,
        },
        ElementKind::Parameter(_) => site.kind == ReferenceKind::Feature && site.args.is_empty(),
        ElementKind::Type(_) => false,
    };
    if !arity_matches {
        return false;
    }

    if bucket.static_access && el.declaring().is_some() && !el.is_static() {
        return false;
    }
    let this_local = demand.session.local("this");
    if demand.session.is_static_context()
        && site.receiver.is_none()
        && bucket.implicit_receiver.is_some()
        && bucket.implicit_receiver == this_local
    {
        return false;
    }
    is_visible(model, &demand.session, element)
}

fn is_visible(model: &Model, session: &FeatureScopeSession, element: ElementId) -> bool {
    let Some(declaring) = model.declaring_type(element) else {
        return true;
    };
    let context = session.context_type();
    match model.element(element).visibility() {
        Visibility::Public => true,
        Visibility::Private => context == Some(declaring),
        Visibility::Package => context.is_some_and(|ctx| same_package(model, ctx, declaring)),
        Visibility::Protected => context.is_some_and(|ctx| {
            same_package(model, ctx, declaring) || is_subtype_of(model, ctx, declaring)
        }),
    }
}

fn same_package(model: &Model, a: TypeId, b: TypeId) -> bool {
    let package = |id: TypeId| {
        model
            .type_def(id)
            .map(|def| {
                def.name
                    .rsplit_once('.')
                    .map_or(String::new(), |(pkg, _)| pkg.to_owned())
            })
            .unwrap_or_default()
    };
    package(a) == package(b)
}

/// Puts the winner first, then the remaining candidates from best to worst.
///
/// The winner is the applicable candidate with the fewest incompatible arguments, then the
/// fewest boxing conversions, then the most specific parameter types, then the lowest lookup
/// rank, then discovery order.
fn order_candidates(model: &Model, candidates: &mut Vec<Evaluated>) {
    candidates.sort_by_key(|c| (!c.applicable, c.incompatible, c.boxing, c.bucket.rank, c.order));

    let best_key = match candidates.first() {
        Some(first) if first.applicable => (first.incompatible, first.boxing),
        _ => return,
    };
    let tied: Vec<usize> = candidates
        .iter()
        .enumerate()
        .take_while(|(_, c)| c.applicable && (c.incompatible, c.boxing) == best_key)
        .map(|(idx, _)| idx)
        .collect();
    let winner = tied
        .iter()
        .copied()
        .find(|&idx| {
            !tied
                .iter()
                .any(|&other| other != idx && more_specific(model, &candidates[other], &candidates[idx]))
        })
        .unwrap_or(0);
    if winner != 0 {
        let chosen = candidates.remove(winner);
        candidates.insert(0, chosen);
    }
}

/// Whether every parameter of `a` is accepted by the corresponding parameter of `b`, and not
/// the other way round.
fn more_specific(model: &Model, a: &Evaluated, b: &Evaluated) -> bool {
    if a.param_types.is_empty() || a.param_types.len() != b.param_types.len() {
        return false;
    }
    let accepts = |wide: &[TypeRef], narrow: &[TypeRef]| {
        wide.iter()
            .zip(narrow)
            .all(|(w, n)| is_conformant(model, w, n))
    };
    accepts(&b.param_types, &a.param_types) && !accepts(&a.param_types, &b.param_types)
}

/// Gives the lookup access to the demand scope of the reference being linked.
struct DemandOracle<'s, 'a> {
    state: &'s TypeComputationState<'a>,
}

impl TypeOracle for DemandOracle<'_, '_> {
    fn actual_type(&self, expr: ExprId) -> Result<Option<TypeRef>, InferError> {
        if let Some(ty) = self.state.types.actual_type(self.state.ctx.model, expr) {
            return Ok(Some(ty));
        }
        let computed = self
            .state
            .with_non_void_expectation()
            .compute_types(expr)?;
        Ok(Some(computed.actual))
    }

    fn element_type(&self, element: ElementId) -> Result<Option<TypeRef>, InferError> {
        self.state.element_type(element)
    }

    fn linked_element(&self, expr: ExprId) -> Option<ElementId> {
        self.state.types.link(expr).and_then(|link| link.element())
    }
}
