//! Per-expression typing rules.

use tessel_model::{ElementId, ElementKind, ExprId, ExprKind, Switch};
use tessel_types::{
    declaring_type_mapping, erase_undeclared, instantiate_as_supertype, substitute,
    type_params_in, ConformanceHints, TypeEnv, TypeId, TypeRef,
};

use crate::state::TypeComputationState;
use crate::{linking, literals, InferError};

pub(crate) fn compute(state: &TypeComputationState<'_>, expr: ExprId) -> Result<(), InferError> {
    let model = state.ctx.model;
    let wk = model.well_known();
    match &model.expr(expr).kind {
        ExprKind::Null => state.accept_actual_type(TypeRef::Any, ConformanceHints::empty()),
        ExprKind::Boolean(_) => {
            state.accept_actual_type(TypeRef::simple(wk.prim_boolean), ConformanceHints::empty());
        }
        ExprKind::Number(text) => {
            let ty = literals::literal_type(model, text, state.expectation.expected.as_ref());
            state.accept_actual_type(ty, ConformanceHints::empty());
        }
        ExprKind::String(text) => {
            let wants_char = state
                .expectation
                .expected
                .as_ref()
                .is_some_and(|t| t.is_type(wk.prim_char) || t.is_type(wk.character));
            let ty = if wants_char && text.chars().count() == 1 {
                TypeRef::simple(wk.prim_char)
            } else {
                TypeRef::simple(wk.string)
            };
            state.accept_actual_type(ty, ConformanceHints::empty());
        }
        ExprKind::TypeLiteral(ty) => {
            let class = TypeRef::class(wk.class, vec![ty.boxed(model)]);
            state.accept_actual_type(class, ConformanceHints::empty());
        }
        ExprKind::FeatureCall(_) | ExprKind::Assignment(_) | ExprKind::ConstructorCall(_) => {
            linking::compute_linked(state, expr)?;
        }
        ExprKind::Block(exprs) => compute_block(state, exprs)?,
        ExprKind::VariableDeclaration { local, initializer } => {
            compute_variable_declaration(state, *local, *initializer)?;
        }
        ExprKind::If {
            condition,
            then,
            otherwise,
        } => {
            state
                .with_expectation(TypeRef::simple(wk.prim_boolean))
                .compute_types(*condition)?;
            let then = state.compute_types(*then)?;
            match otherwise {
                Some(otherwise) => {
                    state.compute_types(*otherwise)?;
                }
                None if then.actual.is_void(model) => {
                    state.accept_actual_type(then.actual, ConformanceHints::NO_VALUE);
                }
                None => state.accept_actual_type(TypeRef::Any, ConformanceHints::empty()),
            }
        }
        ExprKind::Switch(switch) => compute_switch(state, switch)?,
        ExprKind::While { condition, body } | ExprKind::DoWhile { body, condition } => {
            state
                .with_expectation(TypeRef::simple(wk.prim_boolean))
                .compute_types(*condition)?;
            state.without_expectation().compute_types(*body)?;
            state.accept_actual_type(TypeRef::simple(wk.void), ConformanceHints::empty());
        }
        ExprKind::For {
            param,
            iterable,
            body,
        } => {
            let iterable = state.with_non_void_expectation().compute_types(*iterable)?;
            let element = model
                .declared_type(*param)
                .unwrap_or_else(|| iterated_type(model, &iterable.actual));
            let mut body_state = state.without_expectation();
            body_state.assign_type(*param, element);
            body_state.compute_types(*body)?;
            state.accept_actual_type(TypeRef::simple(wk.void), ConformanceHints::empty());
        }
        ExprKind::Closure { params, body } => compute_closure(state, params, *body)?,
        ExprKind::Cast { target, expr } => {
            state.with_non_void_expectation().compute_types(*expr)?;
            state.accept_actual_type(target.clone(), ConformanceHints::empty());
        }
        ExprKind::InstanceOf { expr, .. } => {
            state.with_non_void_expectation().compute_types(*expr)?;
            state.accept_actual_type(TypeRef::simple(wk.prim_boolean), ConformanceHints::empty());
        }
        ExprKind::Return(value) => {
            match value {
                Some(value) => {
                    state.with_return_expectation().compute_types(*value)?;
                }
                None => state.add_void_return(),
            }
            state.accept_actual_type(TypeRef::simple(wk.void), ConformanceHints::NO_VALUE);
        }
        ExprKind::Throw(value) => {
            state.with_non_void_expectation().compute_types(*value)?;
            state.accept_actual_type(TypeRef::simple(wk.void), ConformanceHints::NO_VALUE);
        }
    }
    Ok(())
}

fn compute_block(state: &TypeComputationState<'_>, exprs: &[ExprId]) -> Result<(), InferError> {
    let Some((last, statements)) = exprs.split_last() else {
        let void = TypeRef::simple(state.ctx.model.well_known().void);
        state.accept_actual_type(void, ConformanceHints::empty());
        return Ok(());
    };

    let mut block = state.with_types(state.types.push());
    for statement in statements {
        block.without_expectation().compute_types(*statement)?;
        if let ExprKind::VariableDeclaration { local, .. } = &state.ctx.model.expr(*statement).kind {
            block.add_local_to_current_scope(*local);
        }
    }
    block.compute_types(*last)?;
    block.types.merge_into_parent();
    Ok(())
}

fn compute_variable_declaration(
    state: &TypeComputationState<'_>,
    local: ElementId,
    initializer: Option<ExprId>,
) -> Result<(), InferError> {
    let model = state.ctx.model;
    let wk = model.well_known();
    let declared = model.declared_type(local);

    let ty = match initializer {
        Some(initializer) => {
            let init_state = match &declared {
                Some(ty) => state.with_expectation(ty.clone()),
                None => state.with_non_void_expectation(),
            };
            let computed = init_state.compute_types(initializer)?;
            declared.unwrap_or_else(|| match computed.actual.resolved() {
                TypeRef::Any => TypeRef::simple(wk.object),
                _ => computed.actual,
            })
        }
        None => declared.unwrap_or_else(|| TypeRef::simple(wk.object)),
    };
    state.types.set_element_type(local, ty);
    state.accept_actual_type(TypeRef::simple(wk.void), ConformanceHints::NO_VALUE);
    Ok(())
}

fn compute_switch(state: &TypeComputationState<'_>, switch: &Switch) -> Result<(), InferError> {
    let model = state.ctx.model;
    let discriminant = state
        .with_non_void_expectation()
        .compute_types(switch.discriminant)?
        .actual;

    let mut switch_state = state.with_types(state.types.push());
    if let Some(local) = switch.local {
        switch_state.assign_type(local, discriminant.clone());
    }
    // Type guards refine the switch variable, or the local the discriminant reads.
    let refined = switch.local.or_else(|| {
        switch_state
            .types
            .link(switch.discriminant)
            .and_then(|link| link.element())
            .filter(|el| {
                matches!(
                    model.element(*el).kind,
                    ElementKind::Local(_) | ElementKind::Parameter(_)
                )
            })
    });

    for case in &switch.cases {
        let case_scope = switch_state.types.push();
        let case_state = switch_state.with_types(case_scope.clone());
        if let (Some(guard), Some(element)) = (&case.type_guard, refined) {
            case_scope.reassign(element, Some(guard.clone()));
        }
        if let Some(condition) = case.case {
            let expected = if case.type_guard.is_some() {
                TypeRef::simple(model.well_known().prim_boolean)
            } else {
                discriminant.clone()
            };
            case_state.with_expectation(expected).compute_types(condition)?;
        }
        case_state.compute_types(case.then)?;
        case_scope.merge_into_parent();
    }

    match switch.default {
        Some(default) => {
            switch_state.compute_types(default)?;
        }
        None => switch_state.accept_actual_type(TypeRef::Any, ConformanceHints::empty()),
    }
    switch_state.types.merge_into_parent();
    Ok(())
}

/// The element type of a `for` loop over `iterable`.
fn iterated_type(env: &dyn TypeEnv, iterable: &TypeRef) -> TypeRef {
    let object = TypeRef::simple(env.well_known().object);
    if let TypeRef::Array(component) = iterable.resolved() {
        return (**component).clone();
    }
    let Some(view) = instantiate_as_supertype(env, iterable, env.well_known().iterable) else {
        return object;
    };
    match view.args().first().map(TypeRef::resolved) {
        Some(TypeRef::Wildcard { upper, .. }) => upper.first().cloned().unwrap_or(object),
        Some(arg) => arg.clone(),
        None => object,
    }
}

/// The functional interface a closure is checked against.
struct SamTarget {
    expected: TypeRef,
    declaring: TypeId,
    operation: ElementId,
}

fn compute_closure(
    state: &TypeComputationState<'_>,
    params: &[ElementId],
    body: ExprId,
) -> Result<(), InferError> {
    let model = state.ctx.model;
    let object = TypeRef::simple(model.well_known().object);

    let expected = state.expectation.expected.as_ref().map(|t| t.resolved().clone());
    let mut sam = None;
    let (expected_params, expected_ret) = match &expected {
        Some(TypeRef::Function { params, ret }) => (params.clone(), Some((**ret).clone())),
        Some(ty) => match ty.type_id().and_then(|id| model.single_abstract_method(id)) {
            Some(operation) => {
                let declaring = model
                    .declaring_type(operation)
                    .ok_or(InferError::MissingDeclaringType(operation))?;
                let mapping = declaring_type_mapping(model, ty, declaring);
                let params = model
                    .param_types(operation)
                    .iter()
                    .map(|p| wildcard_bound(substitute(p, &mapping), &object))
                    .collect();
                let ret = model
                    .declared_type(operation)
                    .map(|r| wildcard_bound(substitute(&r, &mapping), &object));
                sam = Some(SamTarget {
                    expected: ty.clone(),
                    declaring,
                    operation,
                });
                (params, ret)
            }
            None => (Vec::new(), None),
        },
        None => (Vec::new(), None),
    };

    let declared = |tp: TypeId| state.types.is_declared_type_param(tp);
    let param_types: Vec<TypeRef> = params
        .iter()
        .enumerate()
        .map(|(idx, param)| {
            model
                .declared_type(*param)
                .or_else(|| {
                    expected_params
                        .get(idx)
                        .map(|t| erase_undeclared(model, t, &declared))
                })
                .unwrap_or_else(|| object.clone())
        })
        .collect();

    // A return type still mentioning the callee's unbound variables is no expectation.
    let ret_expectation = expected_ret.filter(|ret| {
        type_params_in(model, ret)
            .iter()
            .all(|tp| state.types.is_declared_type_param(*tp))
    });

    let mut body_state = state.for_closure_body(body, ret_expectation.clone());
    for (param, ty) in params.iter().zip(&param_types) {
        body_state.assign_type(*param, ty.clone());
    }
    body_state.compute_types(body)?;
    let ret = state
        .types
        .return_type(model, body, ret_expectation.as_ref())
        .unwrap_or_else(|| TypeRef::simple(model.well_known().void));

    let actual = match sam {
        Some(target) => instantiate_sam(state, &target, &param_types, &ret),
        None => TypeRef::function(param_types, ret),
    };
    state.accept_actual_type(actual, ConformanceHints::empty());
    Ok(())
}

fn wildcard_bound(ty: TypeRef, object: &TypeRef) -> TypeRef {
    match ty.resolved() {
        TypeRef::Wildcard {
            lower: Some(lower), ..
        } => (**lower).clone(),
        TypeRef::Wildcard { upper, .. } => upper.first().cloned().unwrap_or_else(|| object.clone()),
        _ => ty,
    }
}

/// The expected functional interface with its open type arguments replaced by what the
/// closure actually takes and returns.
fn instantiate_sam(
    state: &TypeComputationState<'_>,
    target: &SamTarget,
    param_types: &[TypeRef],
    ret: &TypeRef,
) -> TypeRef {
    let model = state.ctx.model;
    if target.expected.type_id() != Some(target.declaring) {
        return target.expected.clone();
    }
    let Some(def) = model.type_def(target.declaring) else {
        return target.expected.clone();
    };
    let mut args = target.expected.args().to_vec();
    if args.len() != def.type_params.len() {
        return target.expected.clone();
    }

    let is_open = |arg: &TypeRef| {
        matches!(arg.resolved(), TypeRef::Wildcard { .. })
            || type_params_in(model, arg)
                .iter()
                .any(|tp| !state.types.is_declared_type_param(*tp))
    };
    let position = |formal: &TypeRef| {
        formal
            .type_id()
            .filter(|_| formal.args().is_empty())
            .and_then(|id| def.type_params.iter().position(|tp| *tp == id))
    };

    let formals = model.param_types(target.operation);
    for (formal, actual) in formals.iter().zip(param_types) {
        if let Some(idx) = position(formal) {
            if is_open(&args[idx]) {
                args[idx] = actual.boxed(model);
            }
        }
    }
    if let Some(idx) = model
        .declared_type(target.operation)
        .as_ref()
        .and_then(position)
    {
        if is_open(&args[idx]) && !ret.is_void(model) {
            args[idx] = match ret.resolved() {
                TypeRef::Any => TypeRef::simple(model.well_known().object),
                _ => ret.boxed(model),
            };
        }
    }
    TypeRef::class(target.declaring, args)
}
