//! Override detection for operations with an inferred return type.

use tessel_model::{ElementId, ElementKind, Model, Visibility};
use tessel_types::{
    all_super_types, declaring_type_mapping, identifier, substitute, Substitution, TypeEnv, TypeRef,
};

use crate::InferError;

/// An operation of a supertype that `op` overrides, with the mapping from the supertype's
/// type parameters to the overriding type's view of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverriddenOperation {
    pub operation: ElementId,
    pub mapping: Substitution,
}

/// The nearest supertype operation `op` overrides: same name, same arity, and the same
/// parameter types once viewed from `op`'s declaring type.
pub fn find_overridden_operation(
    model: &Model,
    op: ElementId,
) -> Result<Option<OverriddenOperation>, InferError> {
    let el = model.element(op);
    let ElementKind::Operation(operation) = &el.kind else {
        return Ok(None);
    };
    if operation.is_static || operation.visibility == Visibility::Private {
        return Ok(None);
    }
    let declaring = model
        .declaring_type(op)
        .ok_or(InferError::MissingDeclaringType(op))?;
    let params = model
        .type_def(declaring)
        .map(|def| def.type_params.iter().copied().map(TypeRef::simple).collect())
        .unwrap_or_default();
    let self_type = TypeRef::class(declaring, params);
    let own: Vec<String> = model
        .param_types(op)
        .iter()
        .map(|p| identifier(model, p))
        .collect();

    for sup in all_super_types(model, &self_type) {
        let Some(id) = sup.type_id() else {
            continue;
        };
        let Some(type_element) = model.type_element(id) else {
            continue;
        };
        for member in model.members(type_element) {
            let candidate_el = model.element(*member);
            let ElementKind::Operation(candidate) = &candidate_el.kind else {
                continue;
            };
            if candidate_el.name != el.name
                || candidate.is_static
                || candidate.visibility == Visibility::Private
                || candidate.params.len() != operation.params.len()
                || candidate.type_params.len() != operation.type_params.len()
            {
                continue;
            }

            let mut mapping = declaring_type_mapping(model, &self_type, id);
            mapping.extend(
                candidate
                    .type_params
                    .iter()
                    .copied()
                    .zip(operation.type_params.iter().copied().map(TypeRef::simple)),
            );
            let theirs: Vec<String> = model
                .param_types(*member)
                .iter()
                .map(|p| identifier(model, &substitute(p, &mapping)))
                .collect();
            if theirs == own {
                return Ok(Some(OverriddenOperation {
                    operation: *member,
                    mapping,
                }));
            }
        }
    }
    Ok(None)
}

/// The declared return type of the operation `op` overrides, viewed from `op`'s declaring
/// type. Inferred return types count once a pass has resolved them.
pub fn overridden_return_type(model: &Model, op: ElementId) -> Result<Option<TypeRef>, InferError> {
    let Some(overridden) = find_overridden_operation(model, op)? else {
        return Ok(None);
    };
    Ok(model
        .declared_type(overridden.operation)
        .map(|ty| substitute(&ty, &overridden.mapping)))
}

/// Operations callable on `ty`, nearest declaration first. An operation overridden closer to
/// `ty` is listed once; private operations of supertypes are skipped.
pub fn all_operations(model: &Model, ty: &TypeRef) -> Vec<ElementId> {
    let mut hierarchy = vec![ty.clone()];
    hierarchy.extend(all_super_types(model, ty));

    let mut seen: Vec<(String, Vec<String>)> = Vec::new();
    let mut out = Vec::new();
    for (depth, view) in hierarchy.iter().enumerate() {
        let Some(id) = view.type_id() else {
            continue;
        };
        let Some(type_element) = model.type_element(id) else {
            continue;
        };
        let mapping = declaring_type_mapping(model, ty, id);
        for member in model.members(type_element) {
            let el = model.element(*member);
            let ElementKind::Operation(op) = &el.kind else {
                continue;
            };
            if depth > 0 && op.visibility == Visibility::Private {
                continue;
            }
            if !op.is_static {
                let signature = (
                    el.name.to_string(),
                    model
                        .param_types(*member)
                        .iter()
                        .map(|p| identifier(model, &substitute(p, &mapping)))
                        .collect(),
                );
                if seen.contains(&signature) {
                    continue;
                }
                seen.push(signature);
            }
            out.push(*member);
        }
    }
    out
}
