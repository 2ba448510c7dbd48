use std::collections::{HashMap, HashSet, VecDeque};

use crate::{erasure, substitute, TypeEnv, TypeId, TypeKind, TypeRef};

/// Direct supertypes of `ty`, with the type arguments of `ty` substituted into them.
///
/// Interfaces without declared supertypes report `Object`; raw references report erased
/// supertypes.
pub fn direct_super_types(env: &dyn TypeEnv, ty: &TypeRef) -> Vec<TypeRef> {
    let wk = env.well_known();
    match ty.resolved() {
        TypeRef::Parameterized { ty: id, args } => {
            let Some(def) = env.type_def(*id) else {
                return Vec::new();
            };
            match def.kind {
                TypeKind::TypeParameter => {
                    if def.upper_bounds.is_empty() {
                        vec![TypeRef::simple(wk.object)]
                    } else {
                        def.upper_bounds.clone()
                    }
                }
                TypeKind::Primitive(_) | TypeKind::Void => Vec::new(),
                TypeKind::Class | TypeKind::Interface | TypeKind::Annotation => {
                    let raw = args.is_empty() && !def.type_params.is_empty();
                    let subst: HashMap<TypeId, TypeRef> = def
                        .type_params
                        .iter()
                        .copied()
                        .zip(args.iter().cloned())
                        .collect();
                    let view = |sup: &TypeRef| {
                        if raw {
                            erasure(env, sup)
                        } else {
                            substitute(sup, &subst)
                        }
                    };

                    let mut out = Vec::with_capacity(def.interfaces.len() + 1);
                    if let Some(sc) = &def.super_class {
                        out.push(view(sc));
                    }
                    out.extend(def.interfaces.iter().map(view));
                    // Every interface implicitly has `Object` as a supertype (JLS 4.10.2).
                    if def.super_class.is_none() && *id != wk.object {
                        out.push(TypeRef::simple(wk.object));
                    }
                    out
                }
            }
        }
        TypeRef::Array(_) => vec![TypeRef::simple(wk.object)],
        TypeRef::Wildcard { upper, .. } if !upper.is_empty() => upper.clone(),
        TypeRef::Wildcard { .. } => vec![TypeRef::simple(wk.object)],
        TypeRef::Multi(parts) => parts.clone(),
        TypeRef::Any | TypeRef::Function { .. } | TypeRef::Delegate(_) => Vec::new(),
    }
}

/// Every transitive supertype of `ty` in breadth-first order, excluding `ty` itself.
///
/// Each declared type is reported once, with the first instantiation discovered.
pub fn all_super_types(env: &dyn TypeEnv, ty: &TypeRef) -> Vec<TypeRef> {
    let mut out = Vec::new();
    let mut seen: HashSet<TypeId> = HashSet::new();
    if let Some(id) = ty.type_id() {
        seen.insert(id);
    }

    let mut queue: VecDeque<TypeRef> = direct_super_types(env, ty).into();
    while let Some(current) = queue.pop_front() {
        let Some(id) = current.type_id() else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        queue.extend(direct_super_types(env, &current));
        out.push(current);
    }
    out
}

/// Return `ty` viewed as `target` by walking the supertype graph and applying type argument
/// substitution along the way.
///
/// Example: `ArrayList<String>` instantiated as `Iterable` returns `Iterable<String>`.
pub fn instantiate_as_supertype(env: &dyn TypeEnv, ty: &TypeRef, target: TypeId) -> Option<TypeRef> {
    let wk = env.well_known();
    match ty.resolved() {
        TypeRef::Array(_) => {
            return (target == wk.object).then(|| TypeRef::simple(target));
        }
        TypeRef::Multi(parts) => {
            // Deterministic: the first component that can be viewed as `target` wins.
            return parts
                .iter()
                .find_map(|part| instantiate_as_supertype(env, part, target));
        }
        TypeRef::Any | TypeRef::Function { .. } => return None,
        _ => {}
    }

    let start = ty.resolved().clone();
    if start.type_id() == Some(target) {
        return Some(start);
    }

    let mut seen: HashSet<TypeId> = HashSet::new();
    let mut queue: VecDeque<TypeRef> = VecDeque::new();
    queue.push_back(start);
    while let Some(current) = queue.pop_front() {
        if let Some(id) = current.type_id() {
            if !seen.insert(id) {
                continue;
            }
            if id == target {
                return Some(current);
            }
        }
        queue.extend(direct_super_types(env, &current));
    }
    None
}

/// Declared-type subtyping, ignoring type arguments.
pub fn is_subtype_of(env: &dyn TypeEnv, sub: TypeId, sup: TypeId) -> bool {
    instantiate_as_supertype(env, &TypeRef::simple(sub), sup).is_some()
}
