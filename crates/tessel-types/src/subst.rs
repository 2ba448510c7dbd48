use std::collections::HashMap;

use crate::{instantiate_as_supertype, TypeEnv, TypeId, TypeKind, TypeRef};

/// Type parameter bindings.
pub type Substitution = HashMap<TypeId, TypeRef>;

/// Replace every bound type parameter of `ty`.
pub fn substitute(ty: &TypeRef, subst: &Substitution) -> TypeRef {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty {
        TypeRef::Parameterized { ty: id, args } => {
            if args.is_empty() {
                if let Some(bound) = subst.get(id) {
                    return bound.clone();
                }
            }
            TypeRef::Parameterized {
                ty: *id,
                args: args.iter().map(|a| substitute(a, subst)).collect(),
            }
        }
        TypeRef::Array(component) => TypeRef::array(substitute(component, subst)),
        TypeRef::Wildcard { upper, lower } => TypeRef::Wildcard {
            upper: upper.iter().map(|u| substitute(u, subst)).collect(),
            lower: lower.as_ref().map(|l| Box::new(substitute(l, subst))),
        },
        TypeRef::Any => TypeRef::Any,
        TypeRef::Multi(parts) => TypeRef::Multi(parts.iter().map(|p| substitute(p, subst)).collect()),
        TypeRef::Delegate(inner) => TypeRef::Delegate(Box::new(substitute(inner, subst))),
        TypeRef::Function { params, ret } => TypeRef::Function {
            params: params.iter().map(|p| substitute(p, subst)).collect(),
            ret: Box::new(substitute(ret, subst)),
        },
    }
}

/// Maps the type parameters of `declaring` to the arguments `receiver` supplies once it is
/// viewed as `declaring`.
///
/// Wildcard arguments contribute their bound; raw or missing arguments map to the erasure of
/// the parameter.
pub fn declaring_type_mapping(env: &dyn TypeEnv, receiver: &TypeRef, declaring: TypeId) -> Substitution {
    let Some(def) = env.type_def(declaring) else {
        return Substitution::new();
    };
    if def.type_params.is_empty() {
        return Substitution::new();
    }

    let view = instantiate_as_supertype(env, receiver, declaring);
    let args = view.as_ref().map(TypeRef::args).unwrap_or(&[]);

    def.type_params
        .iter()
        .enumerate()
        .map(|(idx, tp)| {
            let bound = match args.get(idx).map(TypeRef::resolved) {
                Some(TypeRef::Wildcard { lower: Some(lower), .. }) => (**lower).clone(),
                Some(TypeRef::Wildcard { upper, .. }) => match upper.first() {
                    Some(upper) => upper.clone(),
                    None => erasure(env, &TypeRef::simple(*tp)),
                },
                Some(arg) => arg.clone(),
                None => erasure(env, &TypeRef::simple(*tp)),
            };
            (*tp, bound)
        })
        .collect()
}

/// JLS 4.6 erasure: type parameters become their first bound, arguments are dropped.
pub fn erasure(env: &dyn TypeEnv, ty: &TypeRef) -> TypeRef {
    fn inner(env: &dyn TypeEnv, ty: &TypeRef, depth: usize) -> TypeRef {
        let object = TypeRef::simple(env.well_known().object);
        if depth > 16 {
            return object;
        }
        match ty.resolved() {
            TypeRef::Parameterized { ty: id, .. } => match env.type_def(*id) {
                Some(def) if def.kind == TypeKind::TypeParameter => match def.upper_bounds.first() {
                    Some(bound) => inner(env, bound, depth + 1),
                    None => object,
                },
                _ => TypeRef::simple(*id),
            },
            TypeRef::Array(component) => TypeRef::array(inner(env, component, depth + 1)),
            TypeRef::Wildcard { upper, .. } => match upper.first() {
                Some(bound) => inner(env, bound, depth + 1),
                None => object,
            },
            TypeRef::Any => TypeRef::Any,
            TypeRef::Multi(parts) => match parts.first() {
                Some(first) => inner(env, first, depth + 1),
                None => object,
            },
            TypeRef::Function { params, ret } => TypeRef::Function {
                params: params.iter().map(|p| inner(env, p, depth + 1)).collect(),
                ret: Box::new(inner(env, ret, depth + 1)),
            },
            TypeRef::Delegate(aliased) => inner(env, aliased, depth + 1),
        }
    }
    inner(env, ty, 0)
}

/// Type parameters referenced anywhere in `ty`, in first-occurrence order.
pub fn type_params_in(env: &dyn TypeEnv, ty: &TypeRef) -> Vec<TypeId> {
    fn walk(env: &dyn TypeEnv, ty: &TypeRef, out: &mut Vec<TypeId>) {
        match ty {
            TypeRef::Parameterized { ty: id, args } => {
                let is_param = env
                    .type_def(*id)
                    .is_some_and(|d| d.kind == TypeKind::TypeParameter);
                if is_param && !out.contains(id) {
                    out.push(*id);
                }
                args.iter().for_each(|a| walk(env, a, out));
            }
            TypeRef::Array(component) | TypeRef::Delegate(component) => walk(env, component, out),
            TypeRef::Wildcard { upper, lower } => {
                upper.iter().for_each(|u| walk(env, u, out));
                if let Some(lower) = lower {
                    walk(env, lower, out);
                }
            }
            TypeRef::Multi(parts) => parts.iter().for_each(|p| walk(env, p, out)),
            TypeRef::Function { params, ret } => {
                params.iter().for_each(|p| walk(env, p, out));
                walk(env, ret, out);
            }
            TypeRef::Any => {}
        }
    }

    let mut out = Vec::new();
    walk(env, ty, &mut out);
    out
}

/// Erase every type parameter of `ty` for which `declared` returns false.
pub fn erase_undeclared(env: &dyn TypeEnv, ty: &TypeRef, declared: &dyn Fn(TypeId) -> bool) -> TypeRef {
    let subst: Substitution = type_params_in(env, ty)
        .into_iter()
        .filter(|tp| !declared(*tp))
        .map(|tp| (tp, erasure(env, &TypeRef::simple(tp))))
        .collect();
    substitute(ty, &subst)
}

/// Structural unification of a declared `formal` type against an `actual` argument type,
/// binding the type parameters listed in `vars`. The first binding of a variable wins.
pub fn infer_type_args(
    env: &dyn TypeEnv,
    formal: &TypeRef,
    actual: &TypeRef,
    vars: &[TypeId],
    out: &mut Substitution,
) {
    let actual = actual.resolved();
    if matches!(actual, TypeRef::Any) {
        return;
    }
    match formal.resolved() {
        TypeRef::Parameterized { ty, args } if args.is_empty() && vars.contains(ty) => {
            if let TypeRef::Wildcard { .. } = actual {
                return;
            }
            out.entry(*ty).or_insert_with(|| actual.boxed(env));
        }
        TypeRef::Parameterized { ty, args } => {
            if args.is_empty() {
                return;
            }
            let Some(view) = instantiate_as_supertype(env, &actual.boxed(env), *ty) else {
                return;
            };
            for (formal_arg, actual_arg) in args.iter().zip(view.args()) {
                infer_type_args(env, formal_arg, actual_arg, vars, out);
            }
        }
        TypeRef::Array(component) => {
            if let TypeRef::Array(actual_component) = actual {
                infer_type_args(env, component, actual_component, vars, out);
            }
        }
        TypeRef::Wildcard { upper, lower } => {
            let actual = match actual {
                TypeRef::Wildcard {
                    lower: Some(lower), ..
                } => lower.as_ref(),
                TypeRef::Wildcard { upper, .. } => match upper.first() {
                    Some(bound) => bound,
                    None => return,
                },
                other => other,
            };
            for bound in upper {
                infer_type_args(env, bound, actual, vars, out);
            }
            if let Some(lower) = lower {
                infer_type_args(env, lower, actual, vars, out);
            }
        }
        TypeRef::Function { params, ret } => {
            if let TypeRef::Function {
                params: actual_params,
                ret: actual_ret,
            } = actual
            {
                for (formal_param, actual_param) in params.iter().zip(actual_params) {
                    infer_type_args(env, formal_param, actual_param, vars, out);
                }
                infer_type_args(env, ret, actual_ret, vars, out);
            }
        }
        TypeRef::Multi(_) | TypeRef::Any | TypeRef::Delegate(_) => {}
    }
}
